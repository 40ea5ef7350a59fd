use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use tokio::sync::Mutex;

use crate::db::HistoryStore;
use crate::error::Result;
use crate::feed::{collect_articles, FeedFetcher};
use crate::models::Article;
use crate::services::Translator;

use super::format::MessageFormatter;
use super::sink::{DeliveryError, DeliverySink};

/// Articles older than this are never delivered, independent of pruning.
const STALE_AFTER_DAYS: i64 = 30;
/// Genuine delivery failures tolerated per run.
pub const MAX_ERRORS: usize = 3;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Deliveries per run.
    pub max_articles: usize,
    /// Genuine delivery failures tolerated before the run aborts.
    pub max_errors: usize,
    /// False in dry-run mode: nothing is written to the history.
    pub record_deliveries: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_articles: 1,
            max_errors: MAX_ERRORS,
            record_deliveries: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub delivered: usize,
    pub already_sent: usize,
    pub stale: usize,
    pub future: usize,
    pub unrenderable: usize,
    pub errors: usize,
    pub aborted: bool,
}

/// Fetch, filter, format, deliver, record.
///
/// Runs are serialized: the scheduler and a forced run from the command
/// listener share one `Pipeline`, and the second caller waits for the first.
pub struct Pipeline {
    store: HistoryStore,
    fetcher: Arc<FeedFetcher>,
    sink: Arc<dyn DeliverySink>,
    translator: Arc<dyn Translator>,
    formatter: MessageFormatter,
    options: RunOptions,
    run_guard: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        store: HistoryStore,
        fetcher: Arc<FeedFetcher>,
        sink: Arc<dyn DeliverySink>,
        translator: Arc<dyn Translator>,
        formatter: MessageFormatter,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            fetcher,
            sink,
            translator,
            formatter,
            options,
            run_guard: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let _running = match self.run_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::info!("A run is already in progress, waiting for it to finish");
                self.run_guard.lock().await
            }
        };

        let urls: Vec<String> = self
            .store
            .list_sources()
            .await?
            .into_iter()
            .map(|source| source.url)
            .collect();
        if urls.is_empty() {
            tracing::warn!("No feeds configured, nothing to do");
            return Ok(RunReport::default());
        }
        tracing::debug!("Fetching {} feeds", urls.len());

        let articles = collect_articles(&self.fetcher, &urls).await;
        let report = self.deliver(articles, Utc::now().naive_utc()).await?;
        tracing::info!(
            "Run finished: {} delivered, {} already sent, {} stale, {} future, {} unrenderable, {} errors{}",
            report.delivered,
            report.already_sent,
            report.stale,
            report.future,
            report.unrenderable,
            report.errors,
            if report.aborted { ", aborted" } else { "" }
        );
        Ok(report)
    }

    /// Walks `articles` in order until the delivery quota is met or the
    /// error budget is exceeded.
    pub(crate) async fn deliver(&self, articles: Vec<Article>, now: NaiveDateTime) -> Result<RunReport> {
        let mut report = RunReport::default();
        let mut last_error = String::new();
        let stale_after = Duration::days(STALE_AFTER_DAYS);

        for article in articles {
            if report.delivered >= self.options.max_articles {
                break;
            }

            if self.store.exists(&article.checksum).await? {
                tracing::debug!("Post at [{}] was already sent", article.link);
                report.already_sent += 1;
                continue;
            }
            if now - article.published_at > stale_after {
                tracing::debug!("Article [{}] is older than {} days, skipping", article.link, STALE_AFTER_DAYS);
                report.stale += 1;
                continue;
            }
            if article.published_at > now {
                tracing::warn!("Article [{}] is dated in the future, skipping", article.link);
                report.future += 1;
                continue;
            }

            tracing::info!("Sending [{}]", article.link);
            let message = self.formatter.render(&article, self.translator.as_ref()).await;
            match self.sink.deliver(&message).await {
                Ok(()) => {
                    self.remember(&article).await?;
                    report.delivered += 1;
                }
                Err(DeliveryError::Unrenderable(reason)) => {
                    tracing::warn!("Skipping [{}] for good, sink cannot render it: {}", article.checksum, reason);
                    self.remember(&article).await?;
                    report.unrenderable += 1;
                }
                Err(DeliveryError::Transport(reason)) => {
                    tracing::error!("Delivery of [{}] failed: {}", article.link, reason);
                    last_error = reason;
                    report.errors += 1;
                }
            }

            if report.errors > self.options.max_errors {
                tracing::error!("Too many errors, skipping this execution");
                let alert = format!("Too many errors, skipping this execution. Last error: `{}`", last_error);
                if let Err(e) = self.sink.alert(&alert).await {
                    tracing::error!("Cannot alert admin: {}", e);
                }
                report.aborted = true;
                break;
            }
        }

        Ok(report)
    }

    async fn remember(&self, article: &Article) -> Result<()> {
        if !self.options.record_deliveries {
            return Ok(());
        }
        tracing::debug!("Adding [{}] to store", article.checksum);
        self.store.record(article.published_at, &article.checksum).await?;
        Ok(())
    }
}
