//! Aggregation pass: read-optimized projections over the artifact store
//!
//! A separate pass from crawling. It scans whatever artifacts exist at
//! invocation time (a partially-complete store from an interrupted crawl is
//! fine) and writes three regenerable documents next to the artifact
//! directory:
//! - `anime_index.json`: cheap listing with summary counts only
//! - `search_data.json`: flattened, case-normalized substring-search data
//! - `statistics.json`: corpus totals, averages, and extremal entries
//!
//! Projection entries carry the title, canonical URL, and content address of
//! each artifact: a consumer joins back to the full document purely by
//! recomputing or reading the address, with no lookup service in between.

use crate::config::Config;
use crate::model::Artifact;
use crate::store::ArtifactStore;
use crate::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One row of the lightweight index projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub title: String,
    pub url: String,
    pub content_address: String,
    pub total_episodes: usize,
    pub available_episodes: usize,
}

/// The `anime_index.json` projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeIndex {
    pub total_anime: usize,
    pub total_episodes: usize,
    pub anime_list: Vec<IndexEntry>,
}

/// One row of the search projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEntry {
    pub title: String,
    /// Case-normalized copy for substring matching
    pub title_lower: String,
    pub url: String,
    pub content_address: String,
    pub total_episodes: usize,
    pub available_episodes: usize,
}

/// The `search_data.json` projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchData {
    pub search: Vec<SearchEntry>,
}

/// The `statistics.json` projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total_anime: usize,
    pub total_episodes: usize,
    pub available_episodes: usize,
    pub total_video_sources: usize,
    pub avg_episodes_per_anime: f64,
    pub avg_sources_per_episode: f64,
    pub anime_with_most_episodes: Option<MostEpisodes>,
}

/// Extremal entry: the anime with the largest episode count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MostEpisodes {
    pub title: String,
    pub episodes: usize,
}

/// Builds the index projection, sorted case-insensitively by title
pub fn build_index(artifacts: &[Artifact]) -> AnimeIndex {
    let mut anime_list: Vec<IndexEntry> = artifacts
        .iter()
        .map(|a| IndexEntry {
            title: a.title.clone(),
            url: a.url.clone(),
            content_address: a.content_address.clone(),
            total_episodes: a.total_episodes,
            available_episodes: a.available_episodes,
        })
        .collect();
    anime_list.sort_by_key(|e| e.title.to_lowercase());

    AnimeIndex {
        total_anime: anime_list.len(),
        total_episodes: artifacts.iter().map(|a| a.total_episodes).sum(),
        anime_list,
    }
}

/// Builds the flattened search projection
pub fn build_search(artifacts: &[Artifact]) -> SearchData {
    let mut search: Vec<SearchEntry> = artifacts
        .iter()
        .map(|a| SearchEntry {
            title: a.title.clone(),
            title_lower: a.title.to_lowercase(),
            url: a.url.clone(),
            content_address: a.content_address.clone(),
            total_episodes: a.total_episodes,
            available_episodes: a.available_episodes,
        })
        .collect();
    search.sort_by(|a, b| a.title_lower.cmp(&b.title_lower));

    SearchData { search }
}

/// Builds corpus statistics
pub fn build_statistics(artifacts: &[Artifact]) -> Statistics {
    let total_anime = artifacts.len();
    let total_episodes: usize = artifacts.iter().map(|a| a.total_episodes).sum();
    let available_episodes: usize = artifacts.iter().map(|a| a.available_episodes).sum();
    let total_video_sources: usize = artifacts
        .iter()
        .flat_map(|a| a.episodes.iter())
        .map(|e| e.video_sources.len())
        .sum();

    let anime_with_most_episodes = artifacts
        .iter()
        .max_by_key(|a| a.total_episodes)
        .map(|a| MostEpisodes {
            title: a.title.clone(),
            episodes: a.total_episodes,
        });

    Statistics {
        total_anime,
        total_episodes,
        available_episodes,
        total_video_sources,
        avg_episodes_per_anime: round1(ratio(total_episodes, total_anime)),
        avg_sources_per_episode: round1(ratio(total_video_sources, total_episodes)),
        anime_with_most_episodes,
    }
}

/// Scans the artifact store and writes all three projections
///
/// Safe to re-run at any time: each projection is rebuilt from scratch over
/// the artifacts present right now, and each file is committed atomically.
pub fn run_aggregation(config: &Config) -> Result<Statistics> {
    let store = ArtifactStore::open(config.output.artifact_dir())?;
    let artifacts = store.scan()?;
    tracing::info!("Aggregating {} artifacts", artifacts.len());

    let index = build_index(&artifacts);
    let search = build_search(&artifacts);
    let stats = build_statistics(&artifacts);

    let out_dir = &config.output.data_dir;
    write_json(&out_dir.join("anime_index.json"), &index)?;
    write_json(&out_dir.join("search_data.json"), &search)?;
    write_json(&out_dir.join("statistics.json"), &stats)?;

    tracing::info!(
        "Projections written: {} anime, {} episodes, {} video sources",
        stats.total_anime,
        stats.total_episodes,
        stats.total_video_sources
    );

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &Statistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total anime: {}", stats.total_anime);
    println!("  Total episodes: {}", stats.total_episodes);
    println!("  Episodes with videos: {}", stats.available_episodes);
    println!("  Total video sources: {}", stats.total_video_sources);
    println!();

    println!("Averages:");
    println!("  Episodes per anime: {:.1}", stats.avg_episodes_per_anime);
    println!("  Sources per episode: {:.1}", stats.avg_sources_per_episode);
    println!();

    if let Some(most) = &stats.anime_with_most_episodes {
        println!("Most episodes: {} ({})", most.title, most.episodes);
    }
}

/// Atomic JSON write: temp file beside the target, then rename
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .map_err(|e| HarvestError::Store(format!("write {} failed: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path)
        .map_err(|e| HarvestError::Store(format!("commit {} failed: {}", path.display(), e)))?;
    Ok(())
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
