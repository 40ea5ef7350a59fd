use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use rusqlite::params;
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::FeedSource;

use super::schema::{DATE_FORMAT, DEFAULT_FEEDS, SCHEMA};

const BUSY_TIMEOUT: Duration = Duration::from_secs(3);

/// Persistent delivery history and feed source list.
///
/// Holds only the database path: every operation opens its own connection
/// and closes it when done, so no transaction spans two operations and the
/// store can be cloned freely across tasks.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Opens the store, creating tables and seeding default feeds if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { path };
        let conn = store.connect().await?;
        let (seeded, feeds, records) = conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;

                let feeds: i64 = conn.query_row("SELECT COUNT(*) FROM feeds", [], |row| row.get(0))?;
                let mut seeded = 0;
                if feeds == 0 {
                    let tx = conn.transaction()?;
                    for url in DEFAULT_FEEDS {
                        tx.execute("INSERT INTO feeds (url) VALUES (?1)", params![url])?;
                        seeded += 1;
                    }
                    tx.commit()?;
                }

                let records: i64 = conn.query_row("SELECT COUNT(*) FROM news", [], |row| row.get(0))?;
                Ok((seeded, feeds, records))
            })
            .await?;

        if seeded > 0 {
            tracing::info!("Feeds table was empty, added {} default feeds", seeded);
        } else {
            tracing::info!("Feeds table contains {} records", feeds);
        }
        tracing::info!("News table contains {} records", records);

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).await?;
        conn.call(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(())
        })
        .await?;
        Ok(conn)
    }

    // Delivery history

    pub async fn exists(&self, checksum: &str) -> Result<bool> {
        let checksum = checksum.to_string();
        let conn = self.connect().await?;
        let exists = conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM news WHERE checksum = ?1)",
                    params![checksum],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await?;
        Ok(exists)
    }

    /// Records a delivery. The insert is conditional on the checksum being
    /// absent, in one statement, so concurrent callers cannot both write it.
    /// Returns whether a row was added.
    pub async fn record(&self, date: NaiveDateTime, checksum: &str) -> Result<bool> {
        let checksum = checksum.to_string();
        let date = date.format(DATE_FORMAT).to_string();
        let conn = self.connect().await?;
        let inserted = conn
            .call(move |conn| {
                let rows = conn.execute(
                    r#"INSERT INTO news (date, checksum)
                       SELECT ?1, ?2
                       WHERE NOT EXISTS (SELECT 1 FROM news WHERE checksum = ?2)"#,
                    params![date, checksum],
                )?;
                Ok(rows > 0)
            })
            .await?;
        Ok(inserted)
    }

    /// Deletes records dated more than `max_age_days` before now.
    pub async fn prune(&self, max_age_days: u32) -> Result<usize> {
        let age = chrono::Duration::days(i64::from(max_age_days));
        let Some(cutoff) = Utc::now().naive_utc().checked_sub_signed(age) else {
            tracing::info!("No record can be older than {} days, nothing to remove", max_age_days);
            return Ok(0);
        };
        self.prune_before(cutoff).await
    }

    pub async fn prune_before(&self, cutoff: NaiveDateTime) -> Result<usize> {
        let cutoff = cutoff.format(DATE_FORMAT).to_string();
        let conn = self.connect().await?;
        let removed = conn
            .call(move |conn| {
                let removed = conn.execute("DELETE FROM news WHERE date < ?1", params![cutoff])?;
                Ok(removed)
            })
            .await?;
        tracing::info!("Removed {} old records from history", removed);
        Ok(removed)
    }

    // Feed sources

    pub async fn list_sources(&self) -> Result<Vec<FeedSource>> {
        let conn = self.connect().await?;
        let sources = conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT rowid, url FROM feeds ORDER BY rowid")?;
                let sources = stmt
                    .query_map([], |row| {
                        Ok(FeedSource {
                            id: row.get(0)?,
                            url: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(sources)
            })
            .await?;
        Ok(sources)
    }

    pub async fn source_exists(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        let conn = self.connect().await?;
        let exists = conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM feeds WHERE url = ?1)",
                    params![url],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await?;
        Ok(exists)
    }

    /// Inserts a source unconditionally and returns its id. Callers decide
    /// about duplicates; see `App::add_feed`.
    pub async fn add_source(&self, url: &str) -> Result<i64> {
        let url = url.to_string();
        let conn = self.connect().await?;
        let id = conn
            .call(move |conn| {
                conn.execute("INSERT INTO feeds (url) VALUES (?1)", params![url])?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// Returns whether a row with that id existed.
    pub async fn remove_source(&self, id: i64) -> Result<bool> {
        let conn = self.connect().await?;
        let removed = conn
            .call(move |conn| {
                let rows = conn.execute("DELETE FROM feeds WHERE rowid = ?1", params![id])?;
                Ok(rows > 0)
            })
            .await?;
        Ok(removed)
    }
}
