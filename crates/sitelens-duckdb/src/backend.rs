use std::sync::Arc;

use anyhow::Result;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use sitelens_core::event::Event;

use crate::queries::format_timestamp;
use crate::schema::init_sql;

/// A DuckDB-backed event source and aggregate store.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// contend. The connection lives in `Arc<Mutex<_>>` so every statement is
/// serialised through one lock while the struct stays cheap to share across
/// tasks.
///
/// Every write runs synchronously while the lock is held, with no await
/// point between acquiring the lock and finishing the statement. A caller
/// cancelled while waiting for the lock therefore leaves nothing behind.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    /// Runs the schema init SQL so all tables and indexes exist.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests: data is discarded when the struct is dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append a batch of events in a single transaction.
    ///
    /// This is the ingest side of the event table; the analytics core only
    /// ever reads it back. Returns immediately if `events` is empty.
    pub async fn insert_events(&self, events: &[Event]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        for event in events {
            let properties = if event.properties.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&event.properties)?)
            };
            tx.execute(
                r#"INSERT INTO events (
                    id, website_id, session_id, visitor_id,
                    event_type, properties, time_on_page, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                duckdb::params![
                    uuid_v4(),
                    event.website_id,
                    event.session_id,
                    event.visitor_id,
                    event.event_type,
                    properties,
                    event.time_on_page,
                    format_timestamp(event.created_at),
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!("Inserted {} events into DuckDB", events.len());
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the DuckDB connection lock for direct queries.
    ///
    /// Intended for integration tests that need to plant or inspect rows.
    /// Production code should use the typed methods.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

fn uuid_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}
