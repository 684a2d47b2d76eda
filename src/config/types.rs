use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Anime-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of parallel workers processing anime
    pub workers: usize,

    /// Number of parallel episode-page fetches within one anime
    #[serde(rename = "episode-workers", default = "default_episode_workers")]
    pub episode_workers: usize,

    /// Per-worker delay after each outbound request (milliseconds)
    ///
    /// Aggregate request rate is roughly workers / delay.
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_episode_workers() -> usize {
    5
}

fn default_delay_ms() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

/// Upstream site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the catalog site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path to the paginated catalog list page
    #[serde(rename = "catalog-path")]
    pub catalog_path: String,

    /// Safety cap on catalog pages walked per run
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_max_pages() -> u32 {
    5000
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User agent string sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

/// Output layout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Base data directory; artifacts go in `<data-dir>/anime/`,
    /// the checkpoint and projections at the top level
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl OutputConfig {
    /// Directory holding the per-anime artifacts
    pub fn artifact_dir(&self) -> PathBuf {
        self.data_dir.join("anime")
    }

    /// Path of the resume checkpoint
    pub fn checkpoint_path(&self) -> PathBuf {
        self.data_dir.join("progress.json")
    }
}
