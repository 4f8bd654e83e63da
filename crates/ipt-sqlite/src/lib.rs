//! SQLite-backed `TrackingStore`.
//!
//! Queries run on the dedicated `tokio-rusqlite` connection thread. The table is
//! shared with the admin tool, so rows are decoded leniently and an admin-created
//! table is migrated at open.

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipt_core::{
    clock::Clock,
    domain::{RecipientId, Status, TrackingRecord},
    ports::TrackingStore,
    tracking::TrackingNumber,
    Error, Result,
};
use rusqlite::params;
use tokio_rusqlite::Connection;
use tracing::{info, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tracking (
        tracking_number TEXT PRIMARY KEY,
        chat_id         TEXT,
        status          TEXT,
        status_details  TEXT,
        last_updated    INTEGER,
        created_at      INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_tracking_chat_id ON tracking(chat_id);
    CREATE INDEX IF NOT EXISTS idx_tracking_last_updated ON tracking(last_updated);
";

const SELECT_COLUMNS: &str =
    "SELECT tracking_number, chat_id, status, status_details, last_updated FROM tracking";

/// Raw columns; every one may be NULL in tables written by the admin tool.
type Row = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
);

fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> Error {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => Error::Store(e.to_string()),
        tokio_rusqlite::Error::ConnectionClosed => {
            Error::Store("database connection closed".to_string())
        }
        other => Error::Store(other.to_string()),
    }
}

/// Create the table if missing and add columns older tables lack.
fn ensure_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;

    let has_created_at: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('tracking') WHERE name = 'created_at'",
        [],
        |row| row.get(0),
    )?;
    if has_created_at == 0 {
        conn.execute_batch("ALTER TABLE tracking ADD COLUMN created_at INTEGER")?;
        info!("added created_at column to tracking table");
    }
    Ok(())
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub async fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).await.map_err(from_tokio_rusqlite)?;
        let store = Self { conn, clock };
        store
            .call(|conn| {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA busy_timeout = 5000;
                    ",
                )?;
                ensure_schema(conn)
            })
            .await?;

        info!(path = %path.display(), "opened tracking database");
        Ok(store)
    }

    pub async fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(from_tokio_rusqlite)?;
        let store = Self { conn, clock };
        store.call(ensure_schema).await?;
        Ok(store)
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)?))
            .await
            .map_err(from_tokio_rusqlite)
    }

    async fn select(&self, filter: &'static str, arg: Option<String>) -> Result<Vec<TrackingRecord>> {
        let rows = self
            .call(move |conn| {
                let sql = format!(
                    "{SELECT_COLUMNS} {filter} ORDER BY last_updated DESC, tracking_number ASC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Row> {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                };
                let rows: rusqlite::Result<Vec<Row>> = match arg {
                    Some(a) => stmt.query_map(params![a], map_row)?.collect(),
                    None => stmt.query_map([], map_row)?.collect(),
                };
                rows
            })
            .await?;
        Ok(rows.into_iter().filter_map(decode).collect())
    }
}

/// Rows that cannot become a record are skipped so one bad row never hides the rest.
fn decode((tracking_number, chat_id, status, detail, last_updated): Row) -> Option<TrackingRecord> {
    let Some(tracking_number) = tracking_number else {
        warn!("skipping row without tracking number");
        return None;
    };
    let Ok(tn) = TrackingNumber::parse(&tracking_number) else {
        warn!(tracking_number = %tracking_number, "skipping row with invalid tracking number");
        return None;
    };
    let Some(chat_id) = chat_id.filter(|c| !c.trim().is_empty()) else {
        warn!(tracking_number = %tracking_number, "skipping row without chat id");
        return None;
    };
    let Some(last_updated) = last_updated.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
    else {
        warn!(tracking_number = %tracking_number, ?last_updated, "skipping row with invalid timestamp");
        return None;
    };
    Some(TrackingRecord {
        tracking_number: tn,
        recipient_id: RecipientId::new(chat_id),
        status: Status::from_label(status.as_deref().unwrap_or_default()),
        status_detail: detail.unwrap_or_default(),
        last_updated,
    })
}

#[async_trait]
impl TrackingStore for SqliteStore {
    async fn insert(&self, record: &TrackingRecord) -> Result<bool> {
        let tn = record.tracking_number.as_str().to_string();
        let chat_id = record.recipient_id.as_str().to_string();
        let status = record.status.label().to_string();
        let detail = record.status_detail.clone();
        let last_updated = record.last_updated.timestamp();
        let created_at = self.clock.now().timestamp();

        let inserted = self
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO tracking
                         (tracking_number, chat_id, status, status_details, last_updated, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![tn, chat_id, status, detail, last_updated, created_at],
                )
            })
            .await?;
        Ok(inserted == 1)
    }

    async fn list_by_recipient(&self, recipient: &RecipientId) -> Result<Vec<TrackingRecord>> {
        self.select("WHERE chat_id = ?1", Some(recipient.as_str().to_string()))
            .await
    }

    async fn list_all(&self) -> Result<Vec<TrackingRecord>> {
        self.select("", None).await
    }

    async fn update_status(
        &self,
        tracking_number: &TrackingNumber,
        status: &Status,
        detail: &str,
        last_updated: DateTime<Utc>,
    ) -> Result<bool> {
        let tn = tracking_number.as_str().to_string();
        let status = status.label().to_string();
        let detail = detail.to_string();
        let ts = last_updated.timestamp();

        let changed = self
            .call(move |conn| {
                conn.execute(
                    "UPDATE tracking SET status = ?1, status_details = ?2, last_updated = ?3
                     WHERE tracking_number = ?4",
                    params![status, detail, ts, tn],
                )
            })
            .await?;
        Ok(changed > 0)
    }

    async fn purge_older_than(&self, max_age: Duration) -> Result<usize> {
        let age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let cutoff = self.clock.now().timestamp().saturating_sub(age);
        self.call(move |conn| {
            conn.execute(
                "DELETE FROM tracking WHERE last_updated < ?1",
                params![cutoff],
            )
        })
        .await
    }
}
