//! Crawler module: catalog enumeration and the harvest pipeline
//!
//! This module contains the crawl orchestration, including:
//! - HTTP fetching and the shared client
//! - Catalog enumeration (the target list)
//! - The pluggable extraction strategy
//! - The bounded worker pool and per-worker pacing

pub mod catalog;
pub mod extract;
pub mod fetcher;
pub mod pacer;
pub mod worker;

pub use catalog::enumerate_targets;
pub use extract::{Extractor, SiteExtractor};
pub use fetcher::{build_http_client, fetch_page};
pub use pacer::Pacer;
pub use worker::{run_pool, RunContext, RunReport};

use crate::config::Config;
use crate::progress::ProgressStore;
use crate::store::ArtifactStore;
use crate::Result;
use std::sync::Arc;

/// Options for one harvest run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Clear the checkpoint and reprocess everything
    pub fresh: bool,
    /// Enumerate only the first catalog page
    pub quick: bool,
    /// Process at most this many targets this invocation
    pub limit: Option<usize>,
}

/// Runs a complete harvest: enumerate, process, checkpoint
///
/// The returned report carries the attempted/succeeded/failed counters. An
/// interrupted run is safe to re-invoke: committed artifacts and checkpoint
/// entries stay valid, and the next run processes only what is missing.
pub async fn run_harvest(config: Config, options: RunOptions) -> Result<RunReport> {
    let config = Arc::new(config);

    std::fs::create_dir_all(&config.output.data_dir)?;

    let progress = if options.fresh {
        Arc::new(ProgressStore::open_fresh(config.output.checkpoint_path())?)
    } else {
        Arc::new(ProgressStore::open(config.output.checkpoint_path()))
    };
    let store = ArtifactStore::open(config.output.artifact_dir())?;
    let client = build_http_client(&config.http, config.crawler.request_timeout_secs)?;
    let extractor = Arc::new(SiteExtractor::new());

    let targets = enumerate_targets(&client, &config, extractor.as_ref(), options.quick).await?;

    let ctx = Arc::new(RunContext::new(
        Arc::clone(&config),
        client,
        extractor,
        progress,
        store,
    ));

    Ok(run_pool(ctx, targets, options.limit).await)
}
