use serde::{Deserialize, Serialize};

/// A configured feed URL. `id` is the store's row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: i64,
    pub url: String,
}
