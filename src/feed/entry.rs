use std::collections::HashMap;

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, FeedType};

/// A feed entry as a bag of named fields. Every format fills the common
/// names (`summary`/`author`/`published`); RSS items also carry their native
/// names (`description`/`creator`/`pubDate`).
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    fields: HashMap<String, String>,
}

impl RawEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Field value, or `None` when absent or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn from_feed_entry(feed_type: &FeedType, entry: Entry) -> Self {
        let rss = matches!(feed_type, FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2);
        let mut raw = RawEntry::new();
        if let Some(title) = entry.title {
            raw.insert("title", title.content);
        }
        if let Some(link) = entry.links.first() {
            raw.insert("link", link.href.clone());
        }
        if let Some(summary) = entry.summary {
            if rss {
                raw.insert("description", summary.content.clone());
            }
            raw.insert("summary", summary.content);
        }
        if let Some(body) = entry.content.and_then(|c| c.body) {
            raw.insert("content", body);
        }
        if let Some(author) = entry.authors.first() {
            if rss {
                raw.insert("creator", author.name.clone());
            }
            raw.insert("author", author.name.clone());
        }
        if let Some(published) = entry.published {
            if rss {
                raw.insert("pubDate", format_date(published));
            }
            raw.insert("published", format_date(published));
        }
        if let Some(updated) = entry.updated {
            raw.insert("updated", format_date(updated));
        }
        raw
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339()
}

/// Field names tried together when building an article from an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCandidates {
    pub content: &'static str,
    pub author: &'static str,
    pub date: &'static str,
}

/// Tried in order; the first tuple that yields an article wins.
pub const FIELD_CANDIDATES: [FieldCandidates; 3] = [
    FieldCandidates {
        content: "description",
        author: "creator",
        date: "pubDate",
    },
    FieldCandidates {
        content: "summary",
        author: "author",
        date: "published",
    },
    FieldCandidates {
        content: "content",
        author: "author",
        date: "published",
    },
];

pub const PUBLISHED_FALLBACK: &str = "published";
pub const UPDATED_FALLBACK: &str = "updated";
