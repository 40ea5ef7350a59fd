use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One normalized feed entry, ready for delivery.
///
/// `published_at` is UTC with the offset dropped. Only `checksum` and
/// `published_at` outlive the run that built the article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub author: String,
    pub published_at: NaiveDateTime,
    pub summary: String,
    pub link: String,
    pub checksum: String,
}

/// Stable content address of a link.
///
/// Only surrounding whitespace and the case of the whole string are folded;
/// a trailing slash or any other difference yields a different checksum.
pub fn checksum(link: &str) -> String {
    let normalized = link.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}
