//! RSS feed fetching.
//!
//! Pulls the newsletter feed over HTTP and hands the body to the streaming
//! parser in [`parser`]. Each `<item>` becomes a [`Post`].

mod parser;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use sietsemap_shared::{Post, Result, SietsemapError};

pub use parser::parse_feed;

/// Maximum number of redirects to follow when fetching the feed.
const MAX_REDIRECTS: usize = 5;

/// Maximum feed size we accept (20 MB).
const MAX_RESPONSE_SIZE: u64 = 20 * 1024 * 1024;

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("Sietsemap/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for feed fetching.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Timeout for the HTTP request in seconds.
    pub timeout_secs: u64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Fetch and parse the feed at `url`.
///
/// Any HTTP failure is fatal: without the feed there is nothing to build.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_feed(url: &Url, opts: &FeedOptions) -> Result<Vec<Post>> {
    let client = build_client(opts)?;
    let body = fetch_body(&client, url).await?;

    debug!(bytes = body.len(), "feed downloaded");

    let posts = parse_feed(&body)?;
    info!(posts = posts.len(), "feed parsed");

    Ok(posts)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_client(opts: &FeedOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| SietsemapError::Network(format!("failed to build HTTP client: {e}")))
}

async fn fetch_body(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| SietsemapError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SietsemapError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(SietsemapError::validation(format!(
                "{url}: feed too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| SietsemapError::Network(format!("{url}: failed to read body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_feed_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        let xml = std::fs::read_to_string("../../../fixtures/feed/substack.xml")
            .expect("read feed fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/feed"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "application/rss+xml")
                    .set_body_string(xml),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/feed", server.uri())).unwrap();
        let posts = fetch_feed(&url, &FeedOptions::default()).await.unwrap();

        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].title, "Three Bay Ridge Favorites");
    }

    #[tokio::test]
    async fn test_fetch_feed_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/feed"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/feed", server.uri())).unwrap();
        let err = fetch_feed(&url, &FeedOptions::default()).await.unwrap_err();

        assert!(matches!(err, SietsemapError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_feed_garbage_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/feed"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<rss><channel><item><title>x</nope>"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/feed", server.uri())).unwrap();
        let err = fetch_feed(&url, &FeedOptions::default()).await.unwrap_err();
        assert!(matches!(err, SietsemapError::Parse { .. }));
    }
}
