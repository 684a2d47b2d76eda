//! Data model for harvested anime
//!
//! Targets come from catalog enumeration; artifacts are what the worker pool
//! writes, one per target. Derived fields (`total_episodes`,
//! `available_episodes`, `has_videos`) are recomputed from the episode list
//! at assembly time, never maintained as independent counters.

use crate::address::content_address;
use serde::{Deserialize, Serialize};

/// One crawlable catalog entry: an anime title with its canonical URL
///
/// Immutable once enumerated. The canonical URL is the digest input for the
/// content address, so it is carried verbatim (no normalization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub title: String,
    pub url: String,
    /// Catalog section this target was enumerated from (selects the
    /// extraction strategy; currently always "anime")
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "anime".to_string()
}

impl Target {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            category: default_category(),
        }
    }

    /// The content address this target's artifact is stored under
    pub fn content_address(&self) -> String {
        content_address(&self.title, &self.url)
    }
}

/// One episode of an anime, with the video source URLs found on its page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Ordinal as it appeared on the site ("1", "12", sometimes "OVA")
    pub episode_number: String,
    pub episode_url: String,
    pub episode_title: Option<String>,
    /// Embed/iframe URLs harvested from the episode page
    #[serde(default)]
    pub video_sources: Vec<String>,
    /// Derived from `video_sources` at artifact assembly time
    pub has_videos: bool,
}

impl Episode {
    /// Numeric rank for deterministic ordering. Non-numeric ordinals rank 0
    /// (first); the sort is stable so ties keep discovery order.
    pub fn ordinal_rank(&self) -> u64 {
        self.episode_number.trim().parse::<u64>().unwrap_or(0)
    }
}

/// The persisted document for one anime, keyed by its content address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub content_address: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub rating: Option<String>,
    pub total_episodes: usize,
    pub available_episodes: usize,
    pub episodes: Vec<Episode>,
    pub scraped_at: String,
}

impl Artifact {
    /// Assembles an artifact from a target and its extracted episodes
    ///
    /// Episodes are sorted by numeric ordinal ascending (stable, non-numeric
    /// ordinals first) and the availability counts are recomputed from the
    /// collection, so downstream consumers can paginate deterministically.
    pub fn assemble(target: &Target, details: ExtractedDetails, mut episodes: Vec<Episode>) -> Self {
        episodes.sort_by_key(Episode::ordinal_rank);

        let total_episodes = episodes.len();
        let available_episodes = episodes.iter().filter(|e| e.has_videos).count();

        Self {
            content_address: target.content_address(),
            title: target.title.clone(),
            url: target.url.clone(),
            description: details.description,
            genres: details.genres,
            status: details.status,
            rating: details.rating,
            total_episodes,
            available_episodes,
            episodes,
            scraped_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Metadata fields extracted from an anime page (episodes travel separately)
///
/// All fields are optional: a structural mismatch on one of them degrades to
/// a default instead of failing the target.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDetails {
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub rating: Option<String>,
    /// Episode list as found on the page, discovery order
    pub episodes: Vec<EpisodeLink>,
}

/// An episode link discovered on an anime page, before its page is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeLink {
    pub episode_number: String,
    pub episode_url: String,
    pub episode_title: Option<String>,
}
