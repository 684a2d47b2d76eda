//! Anime-Harvest: a resumable anime catalog harvester
//!
//! This crate crawls a paginated anime catalog, fetches every anime page and
//! its episode pages with a bounded worker pool, and persists one
//! content-addressed JSON artifact per anime. A later aggregation pass builds
//! index, search, and statistics projections for a browsing frontend that
//! recomputes content addresses client-side.

pub mod address;
pub mod aggregate;
pub mod config;
pub mod crawler;
pub mod model;
pub mod progress;
pub mod store;

use thiserror::Error;

/// Main error type for Anime-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Artifact store error: {0}")]
    Store(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Anime-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use address::{content_address, sanitize_title, short_hash};
pub use config::Config;
pub use model::{Artifact, Episode, Target};
pub use progress::ProgressStore;
pub use store::ArtifactStore;
