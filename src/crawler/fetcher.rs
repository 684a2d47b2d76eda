//! HTTP fetcher
//!
//! Builds the shared HTTP client and performs page fetches with error
//! classification. Failures are never retried in-process: a transient
//! failure leaves its target incomplete and a future resumed run picks it
//! up again.

use crate::config::HttpConfig;
use crate::{HarvestError, Result};
use reqwest::Client;
use std::time::Duration;

/// Builds the HTTP client used by all workers
///
/// One client is shared across the pool; reqwest pools connections
/// internally, so parallel workers multiplex over it safely.
pub fn build_http_client(http: &HttpConfig, timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&http.user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}

/// Fetches a URL and returns its body as text
///
/// # Error Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | Timeout | `HarvestError::Timeout` |
/// | Non-2xx status | `HarvestError::HttpStatus` |
/// | Connection/TLS/body error | `HarvestError::Http` |
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            HarvestError::Timeout {
                url: url.to_string(),
            }
        } else {
            HarvestError::Http {
                url: url.to_string(),
                source: e,
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| {
        if e.is_timeout() {
            HarvestError::Timeout {
                url: url.to_string(),
            }
        } else {
            HarvestError::Http {
                url: url.to_string(),
                source: e,
            }
        }
    })
}
