//! Content addressing for harvested artifacts
//!
//! An artifact's key is derived purely from its title and canonical URL:
//! `sanitize_title(title) + "_" + short_hash(url)`. The browsing frontend
//! recomputes the same key client-side to fetch artifacts directly, so the
//! sanitize rules and digest choice here form a wire contract. Any change
//! must be validated against the vector table in the tests below.

use md5::{Digest, Md5};

/// Maximum length of the sanitized title half of an address
const MAX_TITLE_LEN: usize = 200;

/// Characters stripped from titles (illegal in filenames on at least one
/// supported platform)
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitizes a title into a filesystem- and URL-safe string
///
/// # Sanitization Steps
///
/// 1. Strip characters illegal in filenames (`< > : " / \ | ? *`)
/// 2. Trim leading/trailing whitespace
/// 3. Collapse whitespace runs to a single underscore
/// 4. Truncate to 200 characters (respecting char boundaries)
/// 5. An empty result becomes `"unnamed"`
///
/// No Unicode normalization is applied: the consumer hashes the bytes it was
/// given, and so do we.
///
/// # Example
///
/// ```
/// use anime_harvest::address::sanitize_title;
///
/// assert_eq!(sanitize_title("One Piece"), "One_Piece");
/// assert_eq!(sanitize_title("  Re:Zero  \t Season 2 "), "ReZero_Season_2");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let stripped: String = title
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .collect();

    let mut safe = String::with_capacity(stripped.len());
    for word in stripped.split_whitespace() {
        if !safe.is_empty() {
            safe.push('_');
        }
        safe.push_str(word);
    }

    let safe = truncate_chars(&safe, MAX_TITLE_LEN);

    if safe.is_empty() {
        "unnamed".to_string()
    } else {
        safe
    }
}

/// Computes the short hash of a canonical URL
///
/// Returns the first 8 lowercase hex characters of the MD5 digest of the
/// URL's UTF-8 bytes. MD5 is used as an identifier, not for integrity; it is
/// the 128-bit digest the frontend already recomputes, and 8 hex chars give
/// 32 bits of address space (adequate below ~10^5 targets, a real collision
/// risk beyond that).
///
/// The URL is digested exactly as given: no trailing-slash stripping, no
/// case folding, no percent-decoding.
pub fn short_hash(url: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..8].to_string()
}

/// Computes the content address for a (title, canonical URL) pair
///
/// This is a pure function: never stored as separate state, always
/// recomputable. Two targets sharing a hash prefix still get distinct
/// addresses as long as their sanitized titles differ; a full collision of
/// both halves is last-writer-wins.
///
/// # Example
///
/// ```
/// use anime_harvest::address::content_address;
///
/// let addr = content_address("One Piece", "https://example.test/anime/one-piece/");
/// assert!(addr.starts_with("One_Piece_"));
/// ```
pub fn content_address(title: &str, url: &str) -> String {
    format!("{}_{}", sanitize_title(title), short_hash(url))
}

/// Truncates a string to at most `max` chars without splitting a char
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
