pub const SCHEMA: &str = r#"
-- configured feed sources, identified by rowid
CREATE TABLE IF NOT EXISTS feeds (
    url TEXT NOT NULL
);

-- delivered (or permanently skipped) articles
CREATE TABLE IF NOT EXISTS news (
    date TEXT NOT NULL,
    checksum TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_news_checksum ON news(checksum);
CREATE INDEX IF NOT EXISTS idx_news_date ON news(date);
"#;

/// Seeded into an empty `feeds` table on first use.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.amsat.org/feed/",
    "https://qrper.com/feed/",
    "https://swling.com/blog/feed/",
    "https://www.ari.it/?format=feed&type=rss",
    "https://www.cisar.it/index.php?format=feed&type=rss",
    "https://www.blogger.com/feeds/3151423644013078076/posts/default",
    "https://www.pa9x.com/feed/",
    "https://www.ham-yota.com/feed/",
    "https://www.iu2frl.it/feed/",
    "https://www.yota-italia.it/feed/",
    "https://feeds.feedburner.com/OnAllBands",
    "https://www.hamradio.me/feed",
];

/// Stored dates sort lexically in this format.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
