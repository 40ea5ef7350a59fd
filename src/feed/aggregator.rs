use futures::stream::{self, StreamExt};

use crate::models::Article;

use super::canonical::{canonicalize, Rejection};
use super::entry::{RawEntry, FIELD_CANDIDATES};
use super::fetcher::FeedFetcher;

const MAX_CONCURRENT_FETCHES: usize = 5;

/// Fetches every source and returns all articles, newest first.
///
/// Unavailable sources and unusable entries are skipped.
pub async fn collect_articles(fetcher: &FeedFetcher, urls: &[String]) -> Vec<Article> {
    let batches: Vec<Vec<RawEntry>> = stream::iter(urls.to_vec())
        .map(|url| async move { fetcher.fetch(&url).await })
        // `buffered` keeps source order, which breaks date ties below
        .buffered(MAX_CONCURRENT_FETCHES)
        .filter_map(|batch| async { batch })
        .collect()
        .await;

    let articles = articles_from_batches(batches);
    tracing::info!("Fetched {} articles from {} feeds", articles.len(), urls.len());
    articles
}

pub fn articles_from_batches(batches: Vec<Vec<RawEntry>>) -> Vec<Article> {
    let mut articles: Vec<Article> = batches
        .iter()
        .flatten()
        .filter_map(normalize_entry)
        .collect();
    // stable, so equal dates keep source-then-entry order
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    articles
}

/// First candidate tuple that yields an article wins.
pub fn normalize_entry(entry: &RawEntry) -> Option<Article> {
    let mut last_rejection = None;
    for fields in &FIELD_CANDIDATES {
        match canonicalize(entry, fields) {
            Ok(article) => return Some(article),
            Err(rejection) => last_rejection = Some(rejection),
        }
    }

    let link = entry.get("link").unwrap_or("<no link>");
    match last_rejection {
        Some(Rejection::BadDate(_)) => {
            tracing::warn!("Cannot process [{}]: no usable date", link)
        }
        Some(rejection) => tracing::info!("Skipping [{}]: {}", link, rejection),
        None => {}
    }
    None
}
