use std::time::Duration;

use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;

use crate::error::Result;

use super::entry::RawEntry;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("feed-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Raw entries of the feed at `url`, or `None` when the source is
    /// unavailable this run. Failures are logged, never returned.
    pub async fn fetch(&self, url: &str) -> Option<Vec<RawEntry>> {
        tracing::debug!("Retrieving feed at [{}]", url);
        match self.fetch_document(url).await {
            Ok(feed) => {
                let feed_type = feed.feed_type.clone();
                let entries: Vec<RawEntry> = feed
                    .entries
                    .into_iter()
                    .map(|entry| RawEntry::from_feed_entry(&feed_type, entry))
                    .collect();
                tracing::debug!("Fetched {} entries from [{}]", entries.len(), url);
                Some(entries)
            }
            Err(e) => {
                tracing::warn!("Cannot retrieve feed at [{}]: {}", url, e);
                None
            }
        }
    }

    /// Whether `url` currently serves a parseable RSS/Atom/JSON feed.
    pub async fn probe(&self, url: &str) -> bool {
        match self.fetch_document(url).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Feed probe failed for [{}]: {}", url, e);
                false
            }
        }
    }

    /// Downloads `url` as text, for documents that are not feeds (OPML lists).
    pub async fn download_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn fetch_document(&self, url: &str) -> Result<Feed> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        Ok(parser::parse(&bytes[..])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::fixtures::RSS_FEED;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn fetch_returns_entries_of_a_valid_feed() {
        let server = serve(200, RSS_FEED).await;
        let fetcher = FeedFetcher::new().unwrap();

        let entries = fetcher
            .fetch(&format!("{}/feed.xml", server.uri()))
            .await
            .expect("feed should be available");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].get("creator"), Some("Alice"));
        assert!(entries[0].get("description").unwrap().contains("Hello world"));
    }

    #[tokio::test]
    async fn http_error_makes_source_unavailable() {
        let server = serve(503, "busy").await;
        let fetcher = FeedFetcher::new().unwrap();
        assert!(fetcher
            .fetch(&format!("{}/feed.xml", server.uri()))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn unparseable_body_makes_source_unavailable() {
        let server = serve(200, "this is not xml at all").await;
        let fetcher = FeedFetcher::new().unwrap();
        let url = format!("{}/feed.xml", server.uri());
        assert!(fetcher.fetch(&url).await.is_none());
        assert!(!fetcher.probe(&url).await);
    }

    #[tokio::test]
    async fn probe_accepts_valid_feed() {
        let server = serve(200, RSS_FEED).await;
        let fetcher = FeedFetcher::new().unwrap();
        assert!(fetcher.probe(&format!("{}/feed.xml", server.uri())).await);
    }
}
