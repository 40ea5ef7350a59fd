use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::models::{checksum, Article};

use super::entry::{FieldCandidates, RawEntry, PUBLISHED_FALLBACK, UPDATED_FALLBACK};

pub const NO_TITLE: &str = "No title";
pub const SUMMARY_LIMIT: usize = 300;
const TRUNCATION_MARKER: &str = " ...";
const MIN_CONTENT_LEN: usize = 10;
const MIN_TITLE_LEN: usize = 2;
/// Wide enough that html2text never breaks words.
const RENDER_WIDTH: usize = 1000;

// html2text plain output: `[text][1]` links, `[1]: url` footnotes, `*em*`/`**strong**`
static FOOTNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[\d+\]:.*$").expect("footnote pattern"));
static LINK_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]\n]*)\](?:\[\d+\])?").expect("link text pattern"));
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{1,2}([^*\s][^*]*?)\*{1,2}").expect("emphasis pattern"));
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url pattern"));
static READ_MORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)read more").expect("read more pattern"));

/// Why an entry did not become an article. Never fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("content too short ({0} chars)")]
    ShortContent(usize),
    #[error("no parseable date in '{0}' or its fallbacks")]
    BadDate(&'static str),
}

/// Builds an article from `entry` using one tuple of candidate field names.
pub fn canonicalize(entry: &RawEntry, fields: &FieldCandidates) -> Result<Article, Rejection> {
    let link = entry.get("link").ok_or(Rejection::MissingField("link"))?;
    let content = entry
        .get(fields.content)
        .ok_or(Rejection::MissingField(fields.content))?;

    let text = clean_text(content);
    let length = text.chars().count();
    if length <= MIN_CONTENT_LEN {
        return Err(Rejection::ShortContent(length));
    }

    let published_at = [fields.date, PUBLISHED_FALLBACK, UPDATED_FALLBACK]
        .iter()
        .filter_map(|name| entry.get(name))
        .find_map(parse_timestamp)
        .ok_or(Rejection::BadDate(fields.date))?;

    let title = entry
        .get("title")
        .map(collapse_whitespace)
        .filter(|t| t.chars().count() >= MIN_TITLE_LEN)
        .unwrap_or_else(|| NO_TITLE.to_string());

    let author = entry
        .get(fields.author)
        .map(collapse_whitespace)
        .unwrap_or_else(|| domain_of(link));

    Ok(Article {
        title,
        author,
        published_at,
        summary: summarize(&text),
        link: link.to_string(),
        checksum: checksum(link),
    })
}

/// Renders HTML to plain text, drops link decorations and URLs, then
/// collapses whitespace.
pub fn clean_text(raw: &str) -> String {
    let rendered = html2text::from_read(raw.as_bytes(), RENDER_WIDTH).unwrap_or_else(|e| {
        tracing::debug!("Cannot render HTML, using it as text: {}", e);
        raw.to_string()
    });
    let text = FOOTNOTE.replace_all(&rendered, " ");
    let text = LINK_TEXT.replace_all(&text, "$1");
    let text = EMPHASIS.replace_all(&text, "$1");
    let text = BARE_URL.replace_all(&text, " ");
    collapse_whitespace(&text)
}

fn summarize(text: &str) -> String {
    let without_read_more = READ_MORE.replace_all(text, " ");
    let summary = collapse_whitespace(&without_read_more);
    if summary.chars().count() <= SUMMARY_LIMIT {
        return summary;
    }
    let cut: String = summary.chars().take(SUMMARY_LIMIT).collect();
    format!("{}{}", cut.trim_end(), TRUNCATION_MARKER)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Host of `link` without a leading `www.`, or `anonymous`.
pub fn domain_of(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Parses a feed timestamp and normalizes it to naive UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
