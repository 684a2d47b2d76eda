//! Configuration validation
//!
//! Catches obviously unusable configurations at load time instead of
//! mid-crawl.

use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.workers == 0 {
        return Err(ConfigError::Validation(
            "crawler.workers must be at least 1".to_string(),
        ));
    }

    if config.crawler.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "crawler.workers = {} is unreasonably high (max 64)",
            config.crawler.workers
        )));
    }

    if config.crawler.episode_workers == 0 {
        return Err(ConfigError::Validation(
            "crawler.episode-workers must be at least 1".to_string(),
        ));
    }

    if config.crawler.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.request-timeout-secs must be at least 1".to_string(),
        ));
    }

    let base = Url::parse(&config.site.base_url).map_err(|e| {
        ConfigError::Validation(format!(
            "site.base-url is not a valid URL ({}): {}",
            config.site.base_url, e
        ))
    })?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "site.base-url must be http or https, got {}",
            base.scheme()
        )));
    }

    if !config.site.catalog_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "site.catalog-path must start with '/', got {}",
            config.site.catalog_path
        )));
    }

    if config.site.max_pages == 0 {
        return Err(ConfigError::Validation(
            "site.max-pages must be at least 1".to_string(),
        ));
    }

    if config.output.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output.data-dir must not be empty".to_string(),
        ));
    }

    Ok(())
}
