//! Anime-Harvest main entry point
//!
//! This is the command-line interface for the anime-harvest crawl pipeline.

use anime_harvest::aggregate::{print_statistics, run_aggregation};
use anime_harvest::config::load_config_with_hash;
use anime_harvest::crawler::{run_harvest, RunOptions};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Anime-Harvest: a resumable anime catalog harvester
///
/// Anime-Harvest enumerates a site catalog, fetches each series page and its
/// episode pages with a bounded worker pool, stores one JSON artifact per
/// series under a content address, and builds index/search/statistics
/// projections over the artifact store.
#[derive(Parser, Debug)]
#[command(name = "anime-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable anime catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted harvest (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh harvest, clearing the progress checkpoint
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Enumerate only the first catalog page
    #[arg(long)]
    quick: bool,

    /// Process at most N targets this invocation
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with_all = ["stats", "aggregate_only"])]
    dry_run: bool,

    /// Show statistics over the existing artifact store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "aggregate_only"])]
    stats: bool,

    /// Rebuild the projections from existing artifacts and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    aggregate_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.aggregate_only {
        handle_aggregate(&config)?;
    } else {
        handle_harvest(config, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("anime_harvest=info,warn"),
            1 => EnvFilter::new("anime_harvest=debug,info"),
            2 => EnvFilter::new("anime_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the run shape
fn handle_dry_run(
    config: &anime_harvest::config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Anime-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Episode workers: {}", config.crawler.episode_workers);
    println!("  Per-worker delay: {}ms", config.crawler.delay_ms);
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nSite:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Catalog path: {}", config.site.catalog_path);
    println!("  Max catalog pages: {}", config.site.max_pages);

    println!("\nOutput:");
    println!("  Data directory: {}", config.output.data_dir.display());
    println!("  Artifacts: {}", config.output.artifact_dir().display());
    println!(
        "  Checkpoint: {}",
        config.output.checkpoint_path().display()
    );

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would harvest {} with {} workers",
        config.site.base_url, config.crawler.workers
    );

    Ok(())
}

/// Handles the --stats mode: statistics over the current artifact store
fn handle_stats(
    config: &anime_harvest::config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    use anime_harvest::aggregate::build_statistics;
    use anime_harvest::store::ArtifactStore;

    println!(
        "Artifact store: {}\n",
        config.output.artifact_dir().display()
    );

    let store = ArtifactStore::open(config.output.artifact_dir())?;
    let artifacts = store.scan()?;
    let stats = build_statistics(&artifacts);

    print_statistics(&stats);

    Ok(())
}

/// Handles the --aggregate-only mode: rebuilds projections and exits
fn handle_aggregate(
    config: &anime_harvest::config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Rebuilding Projections ===\n");
    println!(
        "Artifact store: {}",
        config.output.artifact_dir().display()
    );
    println!("Output: {}", config.output.data_dir.display());
    println!();

    let stats = run_aggregation(config)?;

    println!("✓ Projections written for {} anime", stats.total_anime);

    Ok(())
}

/// Handles the main harvest operation, then refreshes the projections
async fn handle_harvest(
    config: anime_harvest::config::Config,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    if cli.fresh {
        tracing::info!("Starting fresh harvest (clearing progress checkpoint)");
    } else {
        tracing::info!("Starting harvest (will resume if interrupted run exists)");
    }

    let options = RunOptions {
        fresh: cli.fresh,
        quick: cli.quick,
        limit: cli.limit,
    };

    let report = match run_harvest(config.clone(), options).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    println!("=== Harvest Complete ===");
    println!("  Attempted: {}", report.attempted);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Failed: {}", report.failed);
    println!("  Skipped (already complete): {}", report.skipped);
    println!("  Episodes found: {}", report.episodes_found);
    println!("  Video sources found: {}", report.video_sources_found);

    // Keep the projections in step with the store after every run.
    let stats = run_aggregation(&config)?;
    tracing::info!("Projections refreshed ({} anime)", stats.total_anime);

    Ok(())
}
