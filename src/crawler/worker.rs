//! Worker pool: bounded-parallel target processing
//!
//! A fixed pool of workers drains the target queue. Each target is owned
//! end-to-end by exactly one worker: fetch the anime page, extract metadata
//! and the episode list, fetch the episode pages in a bounded structured
//! scope, assemble the artifact, commit it, then checkpoint. A failure
//! anywhere leaves that one target incomplete for a future resumed run and
//! never touches sibling workers or already-committed progress.
//!
//! Write-then-commit ordering is load-bearing: the artifact hits disk before
//! the progress entry, so a crash can only lose work, never fabricate a
//! "complete" target with a missing artifact.

use crate::config::Config;
use crate::crawler::extract::Extractor;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::pacer::Pacer;
use crate::model::{Artifact, Episode, EpisodeLink, Target};
use crate::progress::ProgressStore;
use crate::store::ArtifactStore;
use crate::{HarvestError, Result};
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Everything a worker needs for one run
///
/// Run state lives here rather than in process-wide globals, so the pool is
/// independently testable and two runs can never couple through hidden
/// state.
pub struct RunContext {
    pub config: Arc<Config>,
    pub client: Client,
    pub extractor: Arc<dyn Extractor>,
    pub progress: Arc<ProgressStore>,
    pub store: ArtifactStore,
    stats: RunStats,
}

impl RunContext {
    pub fn new(
        config: Arc<Config>,
        client: Client,
        extractor: Arc<dyn Extractor>,
        progress: Arc<ProgressStore>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            config,
            client,
            extractor,
            progress,
            store,
            stats: RunStats::default(),
        }
    }
}

/// In-flight run counters (updated by workers, read at completion)
#[derive(Debug, Default)]
struct RunStats {
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    episodes_found: AtomicUsize,
    video_sources_found: AtomicUsize,
}

/// Aggregate counters surfaced when the pool drains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub episodes_found: usize,
    pub video_sources_found: usize,
}

/// Processes the target set with bounded parallelism
///
/// Targets already present in the progress store are skipped up front
/// (resume); an optional `limit` takes the first K of what remains so a
/// large corpus can be worked through across several invocations. The pool
/// drains the queue completely and then exits.
pub async fn run_pool(
    ctx: Arc<RunContext>,
    targets: Vec<Target>,
    limit: Option<usize>,
) -> RunReport {
    let total_enumerated = targets.len();

    let mut remaining: Vec<Target> = targets
        .into_iter()
        .filter(|t| !ctx.progress.contains(&t.url))
        .collect();
    let skipped = total_enumerated - remaining.len();

    if let Some(limit) = limit {
        remaining.truncate(limit);
    }

    let total = remaining.len();
    let workers = ctx.config.crawler.workers.min(total.max(1));
    tracing::info!(
        "Processing {} targets with {} workers ({} already complete)",
        total,
        workers,
        skipped
    );

    let queue = Arc::new(Mutex::new(remaining.into_iter().collect::<VecDeque<_>>()));
    let mut pool = JoinSet::new();

    for worker_id in 0..workers {
        let ctx = Arc::clone(&ctx);
        let queue = Arc::clone(&queue);
        pool.spawn(async move {
            worker_loop(worker_id, ctx, queue, total).await;
        });
    }

    // Drain the pool; worker tasks only end when the queue is empty.
    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Worker task aborted: {}", e);
        }
    }

    let report = RunReport {
        attempted: ctx.stats.attempted.load(Ordering::Relaxed),
        succeeded: ctx.stats.succeeded.load(Ordering::Relaxed),
        failed: ctx.stats.failed.load(Ordering::Relaxed),
        skipped,
        episodes_found: ctx.stats.episodes_found.load(Ordering::Relaxed),
        video_sources_found: ctx.stats.video_sources_found.load(Ordering::Relaxed),
    };

    tracing::info!(
        "Pool drained: {} attempted, {} succeeded, {} failed, {} skipped",
        report.attempted,
        report.succeeded,
        report.failed,
        report.skipped
    );

    report
}

/// One worker: pop targets until the queue is empty
async fn worker_loop(
    worker_id: usize,
    ctx: Arc<RunContext>,
    queue: Arc<Mutex<VecDeque<Target>>>,
    total: usize,
) {
    let pacer = Pacer::new(ctx.config.crawler.delay_ms);

    loop {
        let target = {
            let mut queue = queue.lock().expect("queue mutex poisoned");
            queue.pop_front()
        };
        let Some(target) = target else {
            tracing::debug!("Worker {} done, queue empty", worker_id);
            break;
        };

        ctx.stats.attempted.fetch_add(1, Ordering::Relaxed);
        let done = ctx.stats.attempted.load(Ordering::Relaxed);

        match process_target(&ctx, &pacer, &target).await {
            Ok(artifact) => {
                ctx.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                ctx.stats
                    .episodes_found
                    .fetch_add(artifact.total_episodes, Ordering::Relaxed);
                let sources: usize =
                    artifact.episodes.iter().map(|e| e.video_sources.len()).sum();
                ctx.stats
                    .video_sources_found
                    .fetch_add(sources, Ordering::Relaxed);

                tracing::info!(
                    "[{}/{}] ✓ {} ({} eps, {} with videos)",
                    done,
                    total,
                    target.title,
                    artifact.total_episodes,
                    artifact.available_episodes
                );
            }
            Err(e) => {
                // Contained to this target: it stays unmarked and a resumed
                // run will retry it.
                ctx.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("[{}/{}] ✗ {}: {}", done, total, target.title, e);
            }
        }
    }
}

/// Processes one target end-to-end and returns the committed artifact
async fn process_target(ctx: &RunContext, pacer: &Pacer, target: &Target) -> Result<Artifact> {
    let page_url = Url::parse(&target.url)?;

    let html = fetch_page(&ctx.client, &target.url).await?;
    pacer.pause().await;

    if html.trim().is_empty() {
        return Err(HarvestError::Extraction {
            url: target.url.clone(),
            message: "empty response body".to_string(),
        });
    }

    let details = ctx.extractor.details(&html, &page_url);
    let links = details.episodes.clone();

    let episodes = fetch_episodes(ctx, links).await;

    let artifact = Artifact::assemble(target, details, episodes);

    // Artifact first, checkpoint second (§ crash safety above).
    ctx.store.write(&artifact)?;
    ctx.progress.mark_complete(&target.url)?;

    Ok(artifact)
}

/// Fetches all episode pages of one anime in a bounded structured scope
///
/// Spawns one task per episode, gated by the episode-worker semaphore, and
/// joins them all before returning: no fire-and-forget tasks outlive the
/// target. A failed episode fetch degrades to an episode with no video
/// sources rather than failing the whole target.
async fn fetch_episodes(ctx: &RunContext, links: Vec<EpisodeLink>) -> Vec<Episode> {
    let semaphore = Arc::new(Semaphore::new(ctx.config.crawler.episode_workers));
    let mut scope = JoinSet::new();

    for link in links {
        let client = ctx.client.clone();
        let extractor = Arc::clone(&ctx.extractor);
        let semaphore = Arc::clone(&semaphore);
        let delay_ms = ctx.config.crawler.delay_ms;

        scope.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let pacer = Pacer::new(delay_ms);

            let video_sources = match fetch_page(&client, &link.episode_url).await {
                Ok(html) => match Url::parse(&link.episode_url) {
                    Ok(base) => extractor.video_sources(&html, &base),
                    Err(_) => Vec::new(),
                },
                Err(e) => {
                    tracing::debug!("Episode fetch failed for {}: {}", link.episode_url, e);
                    Vec::new()
                }
            };
            pacer.pause().await;

            Episode {
                episode_number: link.episode_number,
                episode_url: link.episode_url,
                episode_title: link.episode_title,
                has_videos: !video_sources.is_empty(),
                video_sources,
            }
        });
    }

    let mut episodes = Vec::new();
    while let Some(joined) = scope.join_next().await {
        match joined {
            Ok(episode) => episodes.push(episode),
            Err(e) => tracing::warn!("Episode task aborted: {}", e),
        }
    }
    episodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};
    use crate::crawler::extract::SiteExtractor;
    use crate::crawler::fetcher::build_http_client;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str, workers: usize) -> Config {
        Config {
            crawler: CrawlerConfig {
                workers,
                episode_workers: 3,
                delay_ms: 0,
                request_timeout_secs: 5,
            },
            site: SiteConfig {
                base_url: base_url.to_string(),
                catalog_path: "/anime/list-mode/".to_string(),
                max_pages: 100,
            },
            http: HttpConfig {
                user_agent: "TestAgent/1.0".to_string(),
            },
            output: OutputConfig {
                data_dir: "./unused".into(),
            },
        }
    }

    fn test_context(server_uri: &str, dir: &TempDir, workers: usize) -> Arc<RunContext> {
        let config = Arc::new(test_config(server_uri, workers));
        let client = build_http_client(&config.http, 5).unwrap();
        let progress = Arc::new(ProgressStore::open(dir.path().join("progress.json")));
        let store = ArtifactStore::open(dir.path().join("anime")).unwrap();
        Arc::new(RunContext::new(
            config,
            client,
            Arc::new(SiteExtractor::new()),
            progress,
            store,
        ))
    }

    fn anime_page(episode_paths: &[(&str, &str)]) -> String {
        let mut html = String::from(
            r#"<html><body><h1 class="entry-title">T</h1><div class="eplister">"#,
        );
        for (num, path) in episode_paths {
            html.push_str(&format!(
                r#"<a href="{path}"><div class="epl-num">{num}</div></a>"#
            ));
        }
        html.push_str("</div></body></html>");
        html
    }

    async fn mount_page(server: &MockServer, at: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_pool_processes_all_targets() {
        let server = MockServer::start().await;
        mount_page(&server, "/anime/a/", anime_page(&[("1", "/a-episode-1/")])).await;
        mount_page(
            &server,
            "/a-episode-1/",
            r#"<iframe src="https://cdn.example.test/embed/a1"></iframe>"#.to_string(),
        )
        .await;
        mount_page(&server, "/anime/b/", anime_page(&[])).await;

        let dir = TempDir::new().unwrap();
        let ctx = test_context(&server.uri(), &dir, 2);
        let targets = vec![
            Target::new("Alpha", format!("{}/anime/a/", server.uri())),
            Target::new("Beta", format!("{}/anime/b/", server.uri())),
        ];

        let report = run_pool(Arc::clone(&ctx), targets.clone(), None).await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(ctx.progress.len(), 2);

        let artifact = ctx.store.load(&targets[0].content_address()).unwrap();
        assert_eq!(artifact.total_episodes, 1);
        assert_eq!(artifact.available_episodes, 1);
        assert_eq!(
            artifact.episodes[0].video_sources,
            vec!["https://cdn.example.test/embed/a1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_target_left_incomplete() {
        let server = MockServer::start().await;
        mount_page(&server, "/anime/good/", anime_page(&[])).await;
        Mock::given(method("GET"))
            .and(path("/anime/bad/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let ctx = test_context(&server.uri(), &dir, 2);
        let good = Target::new("Good Show", format!("{}/anime/good/", server.uri()));
        let bad = Target::new("Bad Show", format!("{}/anime/bad/", server.uri()));

        let report = run_pool(Arc::clone(&ctx), vec![good.clone(), bad.clone()], None).await;

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert!(ctx.progress.contains(&good.url));
        assert!(!ctx.progress.contains(&bad.url));
        assert!(!ctx.store.exists(&bad.content_address()));
    }

    #[tokio::test]
    async fn test_resume_skips_completed_targets() {
        let server = MockServer::start().await;
        mount_page(&server, "/anime/new/", anime_page(&[])).await;

        let dir = TempDir::new().unwrap();
        let ctx = test_context(&server.uri(), &dir, 2);
        let done = Target::new("Done Show", format!("{}/anime/done/", server.uri()));
        let new = Target::new("New Show", format!("{}/anime/new/", server.uri()));

        // Simulate a previous run having completed `done`; no mock is
        // mounted for it, so any attempt to refetch would fail the test.
        ctx.progress.mark_complete(&done.url).unwrap();

        let report = run_pool(Arc::clone(&ctx), vec![done, new], None).await;

        assert_eq!(report.attempted, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_limit_takes_first_k_of_remaining() {
        let server = MockServer::start().await;
        mount_page(&server, "/anime/a/", anime_page(&[])).await;

        let dir = TempDir::new().unwrap();
        let ctx = test_context(&server.uri(), &dir, 2);
        let targets = vec![
            Target::new("Alpha", format!("{}/anime/a/", server.uri())),
            Target::new("Beta", format!("{}/anime/b/", server.uri())),
        ];

        let report = run_pool(Arc::clone(&ctx), targets, Some(1)).await;

        assert_eq!(report.attempted, 1);
        assert_eq!(report.succeeded, 1);
    }

    #[tokio::test]
    async fn test_failed_episode_degrades_to_no_sources() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/anime/a/",
            anime_page(&[("1", "/a-episode-1/"), ("2", "/a-episode-2/")]),
        )
        .await;
        mount_page(
            &server,
            "/a-episode-1/",
            r#"<iframe src="https://cdn.example.test/embed/a1"></iframe>"#.to_string(),
        )
        .await;
        // /a-episode-2/ has no mock: wiremock answers 404.

        let dir = TempDir::new().unwrap();
        let ctx = test_context(&server.uri(), &dir, 1);
        let target = Target::new("Alpha", format!("{}/anime/a/", server.uri()));

        let report = run_pool(Arc::clone(&ctx), vec![target.clone()], None).await;
        assert_eq!(report.succeeded, 1);

        let artifact = ctx.store.load(&target.content_address()).unwrap();
        assert_eq!(artifact.total_episodes, 2);
        assert_eq!(artifact.available_episodes, 1);
        assert!(!artifact.episodes[1].has_videos);
    }
}
