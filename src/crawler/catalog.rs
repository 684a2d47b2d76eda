//! Catalog enumeration
//!
//! Produces the target list for a run: walks the paginated catalog list
//! page, detects the last page number from the pagination block, and dedupes
//! entries by canonical URL. A fetch failure or an empty page ends the walk
//! early rather than aborting the run; whatever was enumerated so far is
//! still processed.

use crate::config::Config;
use crate::crawler::extract::Extractor;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::pacer::Pacer;
use crate::model::Target;
use crate::Result;
use reqwest::Client;
use std::collections::HashSet;
use url::Url;

/// Enumerates all targets from the catalog
///
/// In quick mode only the first page is fetched; otherwise every detected
/// page is walked (capped by `site.max-pages`), pacing between page fetches.
pub async fn enumerate_targets(
    client: &Client,
    config: &Config,
    extractor: &dyn Extractor,
    quick: bool,
) -> Result<Vec<Target>> {
    let base = Url::parse(&config.site.base_url)?;
    let first_url = base.join(&config.site.catalog_path)?;
    let pacer = Pacer::new(config.crawler.delay_ms);

    tracing::info!("Enumerating catalog from {}", first_url);
    let html = fetch_page(client, first_url.as_str()).await?;

    let mut targets = Vec::new();
    let mut seen = HashSet::new();
    collect_new(&mut targets, &mut seen, extractor.catalog_entries(&html, &first_url));
    tracing::info!("Page 1: {} targets", targets.len());

    if quick {
        return Ok(targets);
    }

    let max_pages = extractor.max_page_number(&html).min(config.site.max_pages);
    tracing::info!("Detected {} catalog pages", max_pages);

    for page in 2..=max_pages {
        pacer.pause().await;

        let page_url = first_url.join(&format!("page/{}/", page))?;
        let html = match fetch_page(client, page_url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Catalog page {} fetch failed ({}), stopping walk", page, e);
                break;
            }
        };

        let entries = extractor.catalog_entries(&html, &page_url);
        if entries.is_empty() {
            tracing::info!("Catalog page {} is empty, stopping walk", page);
            break;
        }

        let added = collect_new(&mut targets, &mut seen, entries);
        tracing::info!("Page {}: +{} targets (total {})", page, added, targets.len());

        if added == 0 {
            // The site looped back to entries we already have.
            break;
        }
    }

    tracing::info!("Enumerated {} unique targets", targets.len());
    Ok(targets)
}

/// Appends entries whose URL has not been seen yet; returns how many were new
fn collect_new(
    targets: &mut Vec<Target>,
    seen: &mut HashSet<String>,
    entries: Vec<Target>,
) -> usize {
    let before = targets.len();
    for entry in entries {
        if seen.insert(entry.url.clone()) {
            targets.push(entry);
        }
    }
    targets.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};
    use crate::crawler::extract::SiteExtractor;
    use crate::crawler::fetcher::build_http_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> Config {
        Config {
            crawler: CrawlerConfig {
                workers: 2,
                episode_workers: 2,
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

    fn list_page(entries: &[(&str, &str)], pagination_max: Option<u32>) -> String {
        let mut html = String::from("<html><body><ul>");
        for (title, url) in entries {
            html.push_str(&format!(r#"<li><a href="{url}">{title}</a></li>"#));
        }
        html.push_str("</ul>");
        if let Some(max) = pagination_max {
            html.push_str(&format!(
                r#"<div class="pagination">
                    <a class="page-numbers" href="/anime/list-mode/page/{max}/">{max}</a>
                </div>"#
            ));
        }
        html.push_str("</body></html>");
        html
    }

    #[tokio::test]
    async fn test_enumerate_single_page() {
        let server = MockServer::start().await;
        let body = list_page(
            &[
                ("One Piece", "/anime/one-piece/"),
                ("Naruto", "/anime/naruto/"),
            ],
            None,
        );
        Mock::given(method("GET"))
            .and(path("/anime/list-mode/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let client = build_http_client(&config.http, 5).unwrap();
        let targets = enumerate_targets(&client, &config, &SiteExtractor::new(), false)
            .await
            .unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].title, "One Piece");
    }

    #[tokio::test]
    async fn test_enumerate_walks_pagination_and_dedupes() {
        let server = MockServer::start().await;
        let page1 = list_page(
            &[("Alpha", "/anime/a/"), ("Beta", "/anime/b/")],
            Some(2),
        );
        let page2 = list_page(
            &[("Beta", "/anime/b/"), ("Gamma", "/anime/c/")],
            Some(2),
        );
        Mock::given(method("GET"))
            .and(path("/anime/list-mode/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page1))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anime/list-mode/page/2/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page2))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let client = build_http_client(&config.http, 5).unwrap();
        let targets = enumerate_targets(&client, &config, &SiteExtractor::new(), false)
            .await
            .unwrap();

        let titles: Vec<&str> = targets.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn test_quick_mode_stops_after_first_page() {
        let server = MockServer::start().await;
        let page1 = list_page(&[("Alpha", "/anime/a/")], Some(5));
        Mock::given(method("GET"))
            .and(path("/anime/list-mode/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page1))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let client = build_http_client(&config.http, 5).unwrap();
        let targets = enumerate_targets(&client, &config, &SiteExtractor::new(), true)
            .await
            .unwrap();

        assert_eq!(targets.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_page_stops_walk_without_error() {
        let server = MockServer::start().await;
        let page1 = list_page(&[("Alpha", "/anime/a/")], Some(3));
        Mock::given(method("GET"))
            .and(path("/anime/list-mode/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page1))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anime/list-mode/page/2/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let client = build_http_client(&config.http, 5).unwrap();
        let targets = enumerate_targets(&client, &config, &SiteExtractor::new(), false)
            .await
            .unwrap();

        assert_eq!(targets.len(), 1);
    }
}
