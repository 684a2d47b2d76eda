//! Site-specific HTML field extraction
//!
//! The crawl core only needs `fetch(url) -> html` plus an extraction
//! strategy turning that HTML into structured fields. The strategy is
//! pluggable per catalog category behind the [`Extractor`] trait; the
//! bundled [`SiteExtractor`] handles the WordPress-theme layout the target
//! catalog uses, with fallback pattern chains so minor markup changes
//! degrade to partial extraction instead of failing a target.

use crate::model::{EpisodeLink, ExtractedDetails, Target};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extraction strategy for one catalog category
///
/// Implementations must be pure over their inputs: no network access, no
/// shared mutable state. Missing optional fields degrade to defaults.
pub trait Extractor: Send + Sync {
    /// Extracts catalog entries (title + canonical URL) from a list page
    fn catalog_entries(&self, html: &str, base_url: &Url) -> Vec<Target>;

    /// Detects the maximum page number from a list page's pagination block
    fn max_page_number(&self, html: &str) -> u32;

    /// Extracts metadata and the episode list from an anime page
    fn details(&self, html: &str, base_url: &Url) -> ExtractedDetails;

    /// Extracts video source URLs from an episode page
    fn video_sources(&self, html: &str, base_url: &Url) -> Vec<String>;
}

/// URL path segments that mark navigation links, not anime entries
const SKIP_SEGMENTS: &[&str] = &["/genre/", "/tag/", "/type/", "/status/", "/list-mode"];

/// Extractor for the target catalog's markup
#[derive(Debug, Default)]
pub struct SiteExtractor;

impl SiteExtractor {
    pub fn new() -> Self {
        Self
    }

    /// List-mode pages put every anime in plain `<li><a>` rows
    fn catalog_from_list_mode(&self, document: &Html, base_url: &Url) -> Vec<Target> {
        let mut entries = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let li_anchor = Selector::parse("li a[href]").expect("static selector");
        for link in document.select(&li_anchor) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(absolute) = base_url.join(href) else {
                continue;
            };

            // Only actual anime entries: /anime/<slug>, not navigation links.
            let path = absolute.path().to_lowercase();
            let Some(slug) = path.strip_prefix("/anime/") else {
                continue;
            };
            if slug.trim_end_matches('/').is_empty() {
                continue;
            }
            if SKIP_SEGMENTS.iter().any(|s| path.contains(s)) {
                continue;
            }

            let title = element_text(&link);
            if title.chars().count() <= 1 {
                continue;
            }
            if seen.insert(absolute.to_string()) {
                entries.push(Target::new(title, absolute.to_string()));
            }
        }

        entries
    }

    /// Card-style pages wrap each anime in `<article class="bs">`
    fn catalog_from_cards(&self, document: &Html, base_url: &Url) -> Vec<Target> {
        let mut entries = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let card_link = Selector::parse("article.bs div.bsx a[href]").expect("static selector");
        for link in document.select(&card_link) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let title = link
                .value()
                .attr("title")
                .map(str::to_string)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| element_text(&link));
            if title.is_empty() {
                continue;
            }
            if let Ok(absolute) = base_url.join(href) {
                if seen.insert(absolute.to_string()) {
                    entries.push(Target::new(title, absolute.to_string()));
                }
            }
        }

        entries
    }

    fn extract_description(&self, document: &Html) -> Option<String> {
        for selector in [".entry-content", "[itemprop=\"description\"]", ".synopsis"] {
            let sel = Selector::parse(selector).expect("static selector");
            if let Some(elem) = document.select(&sel).next() {
                let text = element_text(&elem);
                if !text.is_empty() {
                    // Keep summaries bounded; some themes dump the whole page here.
                    return Some(text.chars().take(500).collect());
                }
            }
        }
        None
    }

    fn extract_genres(&self, document: &Html) -> Vec<String> {
        let sel = Selector::parse("a[href*=\"/genre/\"]").expect("static selector");
        let mut genres = Vec::new();
        for link in document.select(&sel) {
            let genre = element_text(&link);
            if !genre.is_empty() && !genres.contains(&genre) {
                genres.push(genre);
            }
        }
        genres
    }

    fn extract_status(&self, document: &Html) -> Option<String> {
        let sel = Selector::parse("span").expect("static selector");
        for span in document.select(&sel) {
            let text = element_text(&span);
            if let Some(rest) = text.strip_prefix("Status:") {
                let status = rest.trim();
                if !status.is_empty() {
                    return Some(status.to_string());
                }
            }
        }
        None
    }

    fn extract_rating(&self, document: &Html) -> Option<String> {
        let sel = Selector::parse("div.rating div.numscore").expect("static selector");
        document
            .select(&sel)
            .next()
            .map(|e| element_text(&e))
            .filter(|s| !s.is_empty())
    }

    /// Episode pattern 1: the theme's `<div class="eplister">` block
    fn episodes_from_eplister(&self, document: &Html, base_url: &Url) -> Vec<EpisodeLink> {
        let mut episodes = Vec::new();

        let link_sel = Selector::parse("div.eplister a[href]").expect("static selector");
        let num_sel =
            Selector::parse("div[class*=\"num\"], span[class*=\"num\"]").expect("static selector");
        let title_sel = Selector::parse("div[class*=\"title\"], span[class*=\"title\"]")
            .expect("static selector");

        for link in document.select(&link_sel) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(absolute) = base_url.join(href) else {
                continue;
            };

            let number = link
                .select(&num_sel)
                .next()
                .map(|e| element_text(&e))
                .filter(|s| !s.is_empty())
                .or_else(|| ordinal_from_url(href))
                .unwrap_or_else(|| (episodes.len() + 1).to_string());

            let title = link
                .select(&title_sel)
                .next()
                .map(|e| element_text(&e))
                .filter(|s| !s.is_empty());

            episodes.push(EpisodeLink {
                episode_number: number,
                episode_url: absolute.to_string(),
                episode_title: title,
            });
        }

        episodes
    }

    /// Episode pattern 2: episode links anywhere in lists or the page body
    fn episodes_from_links(&self, document: &Html, base_url: &Url) -> Vec<EpisodeLink> {
        let mut episodes = Vec::new();
        let mut seen = std::collections::HashSet::new();

        let sel = Selector::parse("a[href*=\"episode\"]").expect("static selector");
        for link in document.select(&sel) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !seen.insert(href.to_string()) {
                continue;
            }
            let Ok(absolute) = base_url.join(href) else {
                continue;
            };

            let number = ordinal_from_url(href)
                .unwrap_or_else(|| (episodes.len() + 1).to_string());
            let text = element_text(&link);

            episodes.push(EpisodeLink {
                episode_number: number,
                episode_url: absolute.to_string(),
                episode_title: (!text.is_empty()).then_some(text),
            });
        }

        episodes
    }
}

impl Extractor for SiteExtractor {
    fn catalog_entries(&self, html: &str, base_url: &Url) -> Vec<Target> {
        let document = Html::parse_document(html);

        let entries = self.catalog_from_list_mode(&document, base_url);
        if !entries.is_empty() {
            return entries;
        }
        self.catalog_from_cards(&document, base_url)
    }

    fn max_page_number(&self, html: &str) -> u32 {
        let document = Html::parse_document(html);
        let mut max_page = 1;

        let pagination = Selector::parse("div.pagination").expect("static selector");
        let Some(block) = document.select(&pagination).next() else {
            return max_page;
        };

        let link_sel = Selector::parse("a.page-numbers").expect("static selector");
        for link in block.select(&link_sel) {
            let text = element_text(&link);
            if let Ok(n) = text.parse::<u32>() {
                max_page = max_page.max(n);
            }
            if let Some(n) = link.value().attr("href").and_then(page_from_href) {
                max_page = max_page.max(n);
            }
        }

        let current_sel = Selector::parse("span.current").expect("static selector");
        if let Some(current) = block.select(&current_sel).next() {
            if let Ok(n) = element_text(&current).parse::<u32>() {
                max_page = max_page.max(n);
            }
        }

        max_page
    }

    fn details(&self, html: &str, base_url: &Url) -> ExtractedDetails {
        let document = Html::parse_document(html);

        let mut episodes = self.episodes_from_eplister(&document, base_url);
        if episodes.is_empty() {
            episodes = self.episodes_from_links(&document, base_url);
        }

        // The title stays with the Target: the catalog's title is the one
        // the content address was computed from.
        ExtractedDetails {
            description: self.extract_description(&document),
            genres: self.extract_genres(&document),
            status: self.extract_status(&document),
            rating: self.extract_rating(&document),
            episodes,
        }
    }

    fn video_sources(&self, html: &str, base_url: &Url) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut urls = Vec::new();
        let mut seen = std::collections::HashSet::new();

        // Pattern 1: iframes, including lazy-loaded ones
        let iframe_sel = Selector::parse("iframe").expect("static selector");
        for iframe in document.select(&iframe_sel) {
            let src = iframe
                .value()
                .attr("src")
                .or_else(|| iframe.value().attr("data-src"))
                .or_else(|| iframe.value().attr("data-lazy-src"));
            if let Some(src) = src {
                if let Ok(absolute) = base_url.join(src) {
                    let url = absolute.to_string();
                    if url.starts_with("http") && seen.insert(url.clone()) {
                        urls.push(url);
                    }
                }
            }
        }

        // Pattern 2: embed URLs buried in inline scripts
        let script_sel = Selector::parse("script").expect("static selector");
        for script in document.select(&script_sel) {
            let text: String = script.text().collect();
            for url in embed_urls_in_text(&text) {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }

        // Pattern 3: any element with a data-src URL
        let data_src_sel = Selector::parse("[data-src]").expect("static selector");
        for elem in document.select(&data_src_sel) {
            if let Some(src) = elem.value().attr("data-src") {
                if src.starts_with("http") && seen.insert(src.to_string()) {
                    urls.push(src.to_string());
                }
            }
        }

        urls
    }
}

/// Collapsed whitespace text content of an element
fn element_text(elem: &ElementRef) -> String {
    elem.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pulls an episode ordinal out of a URL like `.../one-piece-episode-12/`
fn ordinal_from_url(url: &str) -> Option<String> {
    let lower = url.to_lowercase();
    let idx = lower.find("episode").map(|i| i + "episode".len()).or_else(|| {
        lower.find("ep-").map(|i| i + "ep-".len())
    })?;

    let digits: String = lower[idx..]
        .chars()
        .skip_while(|c| matches!(c, '-' | '_' | ' '))
        .take_while(|c| c.is_ascii_digit())
        .collect();

    (!digits.is_empty()).then_some(digits)
}

/// Extracts the page number from an href like `/anime/list-mode/page/7/`
fn page_from_href(href: &str) -> Option<u32> {
    let (_, rest) = href.split_once("/page/")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Finds embed-looking http(s) URLs inside free text (inline scripts)
fn embed_urls_in_text(text: &str) -> Vec<String> {
    const MARKERS: &[&str] = &["embed", "streaming", "player", "video"];
    let mut urls = Vec::new();

    let mut rest = text;
    while let Some(idx) = rest.find("http") {
        let candidate: String = rest[idx..]
            .chars()
            .take_while(|c| !c.is_whitespace() && !matches!(c, '"' | '\'' | '<' | '>' | '\\'))
            .collect();
        rest = &rest[idx + 4..];

        if !candidate.starts_with("http://") && !candidate.starts_with("https://") {
            continue;
        }
        let lower = candidate.to_lowercase();
        if MARKERS.iter().any(|m| lower.contains(m)) {
            urls.push(candidate);
        }
    }

    urls
}
