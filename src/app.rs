use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::AdminCommand;
use crate::db::HistoryStore;
use crate::delivery::Pipeline;
use crate::error::Result;
use crate::feed::{feed_urls_from_opml, FeedFetcher};
use crate::models::FeedSource;

/// Telegram rejects messages longer than this.
const MAX_MESSAGE_LEN: usize = 4096;

/// Where command replies go.
#[async_trait]
pub trait Replier: Send + Sync {
    async fn reply(&self, text: &str) -> Result<()>;
    async fn send_file(&self, path: &Path, caption: &str) -> Result<()>;
}

/// Shared state behind the administrative commands.
pub struct App {
    store: HistoryStore,
    fetcher: Arc<FeedFetcher>,
    pipeline: Arc<Pipeline>,
    admin_chat: Option<i64>,
}

impl App {
    pub fn new(
        store: HistoryStore,
        fetcher: Arc<FeedFetcher>,
        pipeline: Arc<Pipeline>,
        admin_chat: Option<i64>,
    ) -> Self {
        Self {
            store,
            fetcher,
            pipeline,
            admin_chat,
        }
    }

    /// Without a configured admin nobody is authorized.
    pub fn is_admin(&self, sender: Option<i64>) -> bool {
        matches!((self.admin_chat, sender), (Some(admin), Some(sender)) if admin == sender)
    }

    pub async fn handle_command(&self, command: AdminCommand, replier: &dyn Replier) -> Result<()> {
        match command {
            AdminCommand::ListFeeds => {
                let sources = self.store.list_sources().await?;
                if sources.is_empty() {
                    replier.reply("No URLs in the url table").await?;
                }
                let lines = sources.iter().map(|s| format!("{}: {}", s.id, s.url));
                for chunk in chunk_lines(lines, MAX_MESSAGE_LEN) {
                    replier.reply(&chunk).await?;
                }
            }

            AdminCommand::AddFeed(url) => {
                let reply = if self.add_feed(&url).await? {
                    "Added successfully!"
                } else {
                    "RSS feed cannot be validated (invalid syntax, unreachable or duplicated)"
                };
                replier.reply(reply).await?;
            }

            AdminCommand::AddCsv(urls) => {
                replier.reply("Processing, please be patient...").await?;
                let mut added = 0;
                for url in &urls {
                    if self.add_feed(url).await? {
                        added += 1;
                    }
                }
                replier
                    .reply(&format!("[{}] out of [{}] feeds were added to DB", added, urls.len()))
                    .await?;
            }

            AdminCommand::RemoveFeed(id) => {
                let reply = if self.store.remove_source(id).await? {
                    "Element was removed successfully!".to_string()
                } else {
                    format!("No feed with index [{}]", id)
                };
                replier.reply(&reply).await?;
            }

            AdminCommand::Force => {
                tracing::info!("Manual run requested");
                replier.reply("Forcing bot execution").await?;
                let report = self.pipeline.run().await?;
                let mut reply = format!("Run complete: {} delivered", report.delivered);
                if report.aborted {
                    reply.push_str(", aborted after too many errors");
                }
                replier.reply(&reply).await?;
            }

            AdminCommand::PruneOlderThan(days) => {
                let removed = self.store.prune(days).await?;
                replier
                    .reply(&format!("Deleting [{}] news older than [{}] days", removed, days))
                    .await?;
            }

            AdminCommand::Cleanup => {
                replier.reply("Performing cleanup, please be patient...").await?;
                let (invalid, duplicated) = self.cleanup().await?;
                replier
                    .reply(&format!(
                        "Removed [{}] invalid and [{}] duplicated RSS feeds",
                        invalid, duplicated
                    ))
                    .await?;
            }

            AdminCommand::Backup => {
                tracing::info!("Database backup requested");
                let caption = format!("SQLite backup at {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
                replier.send_file(self.store.path(), &caption).await?;
            }

            AdminCommand::ImportOpml(url) => {
                replier.reply("Starting OPML file import, please wait").await?;
                tracing::info!("Starting OPML import of [{}]", url);
                let imported = self.import_opml(&url).await?;
                replier.reply(&format!("Imported {} feeds", imported)).await?;
            }
        }

        Ok(())
    }

    /// Adds `url` unless it is already present or does not serve a feed.
    pub async fn add_feed(&self, url: &str) -> Result<bool> {
        if self.store.source_exists(url).await? {
            tracing::warn!("Duplicate URL [{}]", url);
            return Ok(false);
        }
        if !self.fetcher.probe(url).await {
            tracing::warn!("RSS feed [{}] cannot be validated", url);
            return Ok(false);
        }
        self.store.add_source(url).await?;
        tracing::info!("Added [{}] to feeds", url);
        Ok(true)
    }

    async fn import_opml(&self, url: &str) -> Result<usize> {
        let document = self.fetcher.download_text(url).await?;
        let mut imported = 0;
        for feed_url in feed_urls_from_opml(&document)? {
            if self.add_feed(&feed_url).await? {
                imported += 1;
            }
        }
        Ok(imported)
    }

    /// Removes duplicated sources, then sources that no longer serve a feed.
    /// Returns `(invalid, duplicated)`.
    async fn cleanup(&self) -> Result<(usize, usize)> {
        let sources = self.store.list_sources().await?;
        let duplicates: HashSet<i64> = duplicate_ids(&sources).into_iter().collect();

        for id in &duplicates {
            self.store.remove_source(*id).await?;
        }

        let mut invalid = 0;
        for source in sources.iter().filter(|s| !duplicates.contains(&s.id)) {
            if !self.fetcher.probe(&source.url).await {
                tracing::info!("Removing invalid [{}] from feeds", source.url);
                self.store.remove_source(source.id).await?;
                invalid += 1;
            }
        }

        Ok((invalid, duplicates.len()))
    }
}

/// Later rows whose URL matches an earlier one, ignoring scheme, `www.`,
/// a trailing slash and case.
pub fn duplicate_ids(sources: &[FeedSource]) -> Vec<i64> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|source| !seen.insert(url_identity(&source.url)))
        .map(|source| source.id)
        .collect()
}

fn url_identity(url: &str) -> String {
    let url = url.trim().to_lowercase();
    let url = url.split_once("://").map(|(_, rest)| rest).unwrap_or(&url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

/// Joins lines into messages no longer than `limit` bytes each.
pub fn chunk_lines(lines: impl IntoIterator<Item = String>, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in lines {
        if !current.is_empty() && current.len() + line.len() + 1 > limit {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(&line);
        current.push('\n');
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DEFAULT_FEEDS;
    use crate::delivery::{Language, LogSink, MessageFormatter, RunOptions};
    use crate::feed::fixtures::{OPML_TEMPLATE, RSS_FEED};
    use crate::services::NoopTranslator;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingReplier {
        replies: Mutex<Vec<String>>,
        files: Mutex<Vec<(PathBuf, String)>>,
    }

    impl RecordingReplier {
        fn replies(&self) -> Vec<String> {
            self.replies.lock().unwrap().clone()
        }

        fn last(&self) -> String {
            self.replies().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Replier for RecordingReplier {
        async fn reply(&self, text: &str) -> Result<()> {
            self.replies.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_file(&self, path: &Path, caption: &str) -> Result<()> {
            self.files
                .lock()
                .unwrap()
                .push((path.to_path_buf(), caption.to_string()));
            Ok(())
        }
    }

    async fn app_with_admin(admin: Option<i64>) -> (TempDir, HistoryStore, App) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("relay.db")).await.unwrap();
        let fetcher = Arc::new(FeedFetcher::new().unwrap());
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            fetcher.clone(),
            Arc::new(LogSink),
            Arc::new(NoopTranslator),
            MessageFormatter::new(Language::from_code("it"), Language::from_code("en")),
            RunOptions::default(),
        ));
        let app = App::new(store.clone(), fetcher, pipeline, admin);
        (dir, store, app)
    }

    async fn app() -> (TempDir, HistoryStore, App) {
        app_with_admin(Some(42)).await
    }

    async fn feed_server() -> MockServer {
        let server = MockServer::start().await;
        for feed in ["/feed.xml", "/other.xml"] {
            Mock::given(method("GET"))
                .and(path(feed))
                .respond_with(ResponseTemplate::new(200).set_body_string(RSS_FEED))
                .mount(&server)
                .await;
        }
        let opml = OPML_TEMPLATE.replace("{base}", &server.uri());
        Mock::given(method("GET"))
            .and(path("/list.opml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(opml))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn only_the_configured_admin_is_authorized() {
        let (_dir, _store, app) = app().await;
        assert!(app.is_admin(Some(42)));
        assert!(!app.is_admin(Some(43)));
        assert!(!app.is_admin(None));

        let (_dir, _store, no_admin) = app_with_admin(None).await;
        assert!(!no_admin.is_admin(Some(42)));
    }

    #[tokio::test]
    async fn list_feeds_shows_ids_and_urls() {
        let (_dir, _store, app) = app().await;
        let replier = RecordingReplier::default();
        app.handle_command(AdminCommand::ListFeeds, &replier).await.unwrap();

        let replies = replier.replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with(&format!("1: {}\n", DEFAULT_FEEDS[0])));
        assert_eq!(replies[0].lines().count(), DEFAULT_FEEDS.len());
    }

    #[tokio::test]
    async fn list_feeds_on_empty_table_says_so() {
        let (_dir, store, app) = app().await;
        for source in store.list_sources().await.unwrap() {
            store.remove_source(source.id).await.unwrap();
        }
        let replier = RecordingReplier::default();
        app.handle_command(AdminCommand::ListFeeds, &replier).await.unwrap();
        assert_eq!(replier.replies(), vec!["No URLs in the url table"]);
    }

    #[tokio::test]
    async fn add_feed_accepts_valid_feed_once() {
        let server = feed_server().await;
        let (_dir, store, app) = app().await;
        let url = format!("{}/feed.xml", server.uri());
        let replier = RecordingReplier::default();

        app.handle_command(AdminCommand::AddFeed(url.clone()), &replier).await.unwrap();
        assert_eq!(replier.last(), "Added successfully!");
        assert!(store.source_exists(&url).await.unwrap());

        app.handle_command(AdminCommand::AddFeed(url), &replier).await.unwrap();
        assert!(replier.last().starts_with("RSS feed cannot be validated"));
    }

    #[tokio::test]
    async fn add_feed_rejects_unreachable_feed() {
        let server = feed_server().await;
        let (_dir, store, app) = app().await;
        let url = format!("{}/missing.xml", server.uri());

        assert!(!app.add_feed(&url).await.unwrap());
        assert!(!store.source_exists(&url).await.unwrap());
    }

    #[tokio::test]
    async fn add_csv_reports_how_many_were_added() {
        let (_dir, _store, app) = app().await;
        let replier = RecordingReplier::default();
        let urls = vec![DEFAULT_FEEDS[0].to_string(), DEFAULT_FEEDS[1].to_string()];

        app.handle_command(AdminCommand::AddCsv(urls), &replier).await.unwrap();
        assert_eq!(
            replier.replies(),
            vec![
                "Processing, please be patient...",
                "[0] out of [2] feeds were added to DB"
            ]
        );
    }

    #[tokio::test]
    async fn remove_feed_by_id() {
        let (_dir, store, app) = app().await;
        let replier = RecordingReplier::default();

        app.handle_command(AdminCommand::RemoveFeed(1), &replier).await.unwrap();
        assert_eq!(replier.last(), "Element was removed successfully!");
        assert!(!store.source_exists(DEFAULT_FEEDS[0]).await.unwrap());

        app.handle_command(AdminCommand::RemoveFeed(1), &replier).await.unwrap();
        assert_eq!(replier.last(), "No feed with index [1]");
    }

    #[tokio::test]
    async fn prune_reports_removed_count() {
        let (_dir, store, app) = app().await;
        let old = chrono::Utc::now().naive_utc() - chrono::Duration::days(10);
        store.record(old, "old").await.unwrap();
        let replier = RecordingReplier::default();

        app.handle_command(AdminCommand::PruneOlderThan(7), &replier).await.unwrap();
        assert_eq!(replier.last(), "Deleting [1] news older than [7] days");
        assert!(!store.exists("old").await.unwrap());
    }

    #[tokio::test]
    async fn force_runs_the_pipeline() {
        let (_dir, store, app) = app().await;
        for source in store.list_sources().await.unwrap() {
            store.remove_source(source.id).await.unwrap();
        }
        let replier = RecordingReplier::default();

        app.handle_command(AdminCommand::Force, &replier).await.unwrap();
        assert_eq!(
            replier.replies(),
            vec!["Forcing bot execution", "Run complete: 0 delivered"]
        );
    }

    #[tokio::test]
    async fn backup_sends_the_database_file() {
        let (_dir, store, app) = app().await;
        let replier = RecordingReplier::default();

        app.handle_command(AdminCommand::Backup, &replier).await.unwrap();
        let files = replier.files.lock().unwrap().clone();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, store.path());
        assert!(files[0].1.starts_with("SQLite backup at "));
    }

    #[tokio::test]
    async fn import_opml_adds_every_valid_new_feed() {
        let server = feed_server().await;
        let (_dir, store, app) = app().await;
        let replier = RecordingReplier::default();
        let command = AdminCommand::ImportOpml(format!("{}/list.opml", server.uri()));

        app.handle_command(command.clone(), &replier).await.unwrap();
        assert_eq!(replier.last(), "Imported 2 feeds");
        assert!(store.source_exists(&format!("{}/other.xml", server.uri())).await.unwrap());
        assert!(!store.source_exists(&format!("{}/missing.xml", server.uri())).await.unwrap());

        app.handle_command(command, &replier).await.unwrap();
        assert_eq!(replier.last(), "Imported 0 feeds");
    }

    #[tokio::test]
    async fn import_opml_surfaces_download_errors() {
        let server = MockServer::start().await;
        let (_dir, _store, app) = app().await;
        let replier = RecordingReplier::default();

        let result = app
            .handle_command(AdminCommand::ImportOpml(format!("{}/gone.opml", server.uri())), &replier)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn duplicates_ignore_scheme_www_and_trailing_slash() {
        let sources = vec![
            FeedSource { id: 1, url: "https://www.example.com/feed/".into() },
            FeedSource { id: 2, url: "http://example.com/feed".into() },
            FeedSource { id: 3, url: "https://other.example/feed".into() },
            FeedSource { id: 4, url: "HTTPS://EXAMPLE.COM/feed".into() },
        ];
        assert_eq!(duplicate_ids(&sources), vec![2, 4]);
    }

    #[test]
    fn chunks_stay_under_the_limit() {
        let lines = (0..10).map(|i| format!("{}: https://feed{}.example/rss", i, i));
        let chunks = chunk_lines(lines, 80);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 80));
        assert_eq!(chunks.concat().lines().count(), 10);
    }
}
