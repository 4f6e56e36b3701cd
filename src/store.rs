//! The data-store collaborator boundary and its sqlite reference
//! implementation.
//!
//! The assembler and the guided engine only ever talk to [`DataStore`]. The
//! shipped [`SqliteStore`] backs the binary and the integration tests;
//! products embedding the crate can substitute their own store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use crate::context::{ContextCategory, Lookback};
use crate::guided::{GuidedMode, GuidedSession, SessionStatus};
use crate::guided::wheel::WheelState;

/// Default cap on records returned per category read.
pub const DEFAULT_FETCH_LIMIT: usize = 20;

/// A raw contextual record as handed to the section formatter.
///
/// Optional fields default explicitly rather than ad hoc:
/// - absent `kind` groups last in kind-then-priority ordering;
/// - absent `priority` sorts after any explicit priority;
/// - absent `target` makes progress reporting fall back to the raw
///   `current` value instead of a percentage;
/// - absent `occurred_at` sorts last in chronological ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub kind: Option<String>,
    pub priority: Option<i64>,
    pub target: Option<f64>,
    pub current: Option<f64>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Category-specific read filter derived from the category's lookback window.
#[derive(Debug, Clone)]
pub struct FetchFilter {
    pub since: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl FetchFilter {
    pub fn for_category(category: ContextCategory, now: DateTime<Utc>) -> Self {
        let since = match category.lookback() {
            Lookback::Today => Some(
                now.date_naive()
                    .and_hms_opt(0, 0, 0)
                    .map(|t| t.and_utc())
                    .unwrap_or(now),
            ),
            Lookback::Days(days) => Some(now - Duration::days(i64::from(days))),
            Lookback::All => None,
        };
        Self {
            since,
            limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

/// Storage collaborator for context reads and guided-session persistence.
///
/// `write_step_data` upserts by (session, step); concurrent multi-device
/// writes are last-write-wins by design.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn fetch_many(
        &self,
        category: ContextCategory,
        filter: &FetchFilter,
    ) -> Result<Vec<ContextRecord>>;

    async fn write_step_data(
        &self,
        session_id: &str,
        step_key: &str,
        payload: &Value,
    ) -> Result<()>;

    async fn read_session(&self, session_id: &str) -> Result<Option<GuidedSession>>;

    async fn write_session(&self, session: &GuidedSession) -> Result<()>;
}

/// Sqlite-backed store. A single connection behind a mutex is enough here;
/// reads are small and per-turn.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open store at {:?}", path.as_ref()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS context_records (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                kind TEXT,
                priority INTEGER,
                target REAL,
                current REAL,
                occurred_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_context_records_category
                ON context_records (category, occurred_at);

            CREATE TABLE IF NOT EXISTS guided_sessions (
                id TEXT PRIMARY KEY,
                mode TEXT NOT NULL,
                reference_id TEXT,
                current_step INTEGER NOT NULL,
                status TEXT NOT NULL,
                rim_count INTEGER,
                next_rim_date TEXT,
                ready INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS guided_step_data (
                session_id TEXT NOT NULL,
                step_key TEXT NOT NULL,
                payload TEXT NOT NULL,
                saved_at TEXT NOT NULL,
                PRIMARY KEY (session_id, step_key)
            );
            "#,
        )
        .context("Failed to initialize store schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace a context record. Used by the demo binary and tests
    /// to seed data; the host application normally owns this table.
    pub fn put_record(&self, category: ContextCategory, record: &ContextRecord) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO context_records
             (id, category, title, body, kind, priority, target, current, occurred_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                category.as_db_str(),
                record.title,
                record.body,
                record.kind,
                record.priority,
                record.target,
                record.current,
                record.occurred_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn fetch_many_sync(
        &self,
        category: ContextCategory,
        filter: &FetchFilter,
    ) -> Result<Vec<ContextRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, body, kind, priority, target, current, occurred_at
             FROM context_records
             WHERE category = ?1
               AND (?2 IS NULL OR occurred_at IS NULL OR occurred_at >= ?2)
             ORDER BY occurred_at DESC
             LIMIT ?3",
        )?;

        let since = filter.since.map(|t| t.to_rfc3339());
        let records = stmt
            .query_map(
                params![category.as_db_str(), since, filter.limit as i64],
                |row| {
                    Ok(ContextRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        body: row.get(2)?,
                        kind: row.get(3)?,
                        priority: row.get(4)?,
                        target: row.get(5)?,
                        current: row.get(6)?,
                        occurred_at: row
                            .get::<_, Option<String>>(7)?
                            .map(|raw| parse_rfc3339(raw, 7))
                            .transpose()?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn write_step_data_sync(&self, session_id: &str, step_key: &str, payload: &Value) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO guided_step_data (session_id, step_key, payload, saved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (session_id, step_key)
             DO UPDATE SET payload = excluded.payload, saved_at = excluded.saved_at",
            params![
                session_id,
                step_key,
                serde_json::to_string(payload)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn read_session_sync(&self, session_id: &str) -> Result<Option<GuidedSession>> {
        let conn = self.lock();

        let row = conn
            .query_row(
                "SELECT id, mode, reference_id, current_step, status,
                        rim_count, next_rim_date, ready, created_at, updated_at
                 FROM guided_sessions WHERE id = ?1",
                [session_id],
                |row| {
                    Ok(SessionRow {
                        id: row.get(0)?,
                        mode: row.get(1)?,
                        reference_id: row.get(2)?,
                        current_step: row.get::<_, i64>(3)?,
                        status: row.get(4)?,
                        rim_count: row.get(5)?,
                        next_rim_date: row.get(6)?,
                        ready: row.get(7)?,
                        created_at: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mode = GuidedMode::from_db(&row.mode)
            .with_context(|| format!("Unknown guided mode '{}' in store", row.mode))?;

        let mut step_data = BTreeMap::new();
        let mut stmt = conn.prepare(
            "SELECT step_key, payload FROM guided_step_data WHERE session_id = ?1",
        )?;
        let rows = stmt.query_map([session_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for entry in rows {
            let (key, raw) = entry?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(payload) => {
                    step_data.insert(key, payload);
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable step payload '{}': {}", key, e);
                }
            }
        }

        let wheel = match mode {
            GuidedMode::ChangeProcess => Some(WheelState {
                rim_count: row.rim_count.unwrap_or(0) as u32,
                next_rim_date: row
                    .next_rim_date
                    .as_deref()
                    .and_then(|raw| raw.parse().ok()),
                ready: row.ready.unwrap_or(0) != 0,
            }),
            _ => None,
        };

        Ok(Some(GuidedSession {
            id: row.id,
            mode,
            reference_id: row.reference_id,
            current_step: row.current_step.max(0) as usize,
            step_data,
            status: SessionStatus::from_db(&row.status),
            wheel,
            created_at: row.created_at.parse().unwrap_or_else(|_| Utc::now()),
            updated_at: row.updated_at.parse().unwrap_or_else(|_| Utc::now()),
        }))
    }

    fn write_session_sync(&self, session: &GuidedSession) -> Result<()> {
        let conn = self.lock();
        let wheel = session.wheel.as_ref();
        conn.execute(
            "INSERT OR REPLACE INTO guided_sessions
             (id, mode, reference_id, current_step, status,
              rim_count, next_rim_date, ready, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.id,
                session.mode.as_db_str(),
                session.reference_id,
                session.current_step as i64,
                session.status.as_db_str(),
                wheel.map(|w| i64::from(w.rim_count)),
                wheel.and_then(|w| w.next_rim_date.map(|d| d.to_string())),
                wheel.map(|w| i64::from(w.ready)),
                session.created_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

struct SessionRow {
    id: String,
    mode: String,
    reference_id: Option<String>,
    current_step: i64,
    status: String,
    rim_count: Option<i64>,
    next_rim_date: Option<String>,
    ready: Option<i64>,
    created_at: String,
    updated_at: String,
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn fetch_many(
        &self,
        category: ContextCategory,
        filter: &FetchFilter,
    ) -> Result<Vec<ContextRecord>> {
        self.fetch_many_sync(category, filter)
    }

    async fn write_step_data(
        &self,
        session_id: &str,
        step_key: &str,
        payload: &Value,
    ) -> Result<()> {
        self.write_step_data_sync(session_id, step_key, payload)
    }

    async fn read_session(&self, session_id: &str) -> Result<Option<GuidedSession>> {
        self.read_session_sync(session_id)
    }

    async fn write_session(&self, session: &GuidedSession) -> Result<()> {
        self.write_session_sync(session)
    }
}

fn parse_rfc3339(value: String, column: usize) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, body: &str, days_ago: i64) -> ContextRecord {
        ContextRecord {
            id: id.to_string(),
            title: format!("entry {}", id),
            body: body.to_string(),
            kind: None,
            priority: None,
            target: None,
            current: None,
            occurred_at: Some(Utc::now() - Duration::days(days_ago)),
        }
    }

    #[tokio::test]
    async fn fetch_respects_category_and_lookback() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .put_record(ContextCategory::RecentJournal, &record("j1", "fresh", 1))
            .unwrap();
        store
            .put_record(ContextCategory::RecentJournal, &record("j2", "stale", 30))
            .unwrap();
        store
            .put_record(ContextCategory::Victories, &record("v1", "win", 1))
            .unwrap();

        let filter = FetchFilter::for_category(ContextCategory::RecentJournal, Utc::now());
        let records = store
            .fetch_many(ContextCategory::RecentJournal, &filter)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "j1");
    }

    #[tokio::test]
    async fn undated_records_survive_a_lookback_filter() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut principle = record("p1", "keep promises", 0);
        principle.occurred_at = None;
        store
            .put_record(ContextCategory::RecentJournal, &principle)
            .unwrap();

        let filter = FetchFilter::for_category(ContextCategory::RecentJournal, Utc::now());
        let records = store
            .fetch_many(ContextCategory::RecentJournal, &filter)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn step_data_upserts_by_session_and_step() {
        let store = SqliteStore::open_in_memory().unwrap();
        let session = GuidedSession::new(crate::guided::GuidedMode::ChangeProcess, None);
        store.write_session(&session).await.unwrap();

        store
            .write_step_data(&session.id, "spoke_1", &json!({"title": "a", "detail": "b"}))
            .await
            .unwrap();
        store
            .write_step_data(&session.id, "spoke_2", &json!({"title": "c", "detail": "d"}))
            .await
            .unwrap();
        store
            .write_step_data(&session.id, "spoke_1", &json!({"title": "a2", "detail": "b2"}))
            .await
            .unwrap();

        let loaded = store.read_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.step_data.len(), 2);
        assert_eq!(loaded.step_data["spoke_1"]["title"], "a2");
        assert_eq!(loaded.step_data["spoke_2"]["title"], "c");
    }

    #[tokio::test]
    async fn session_round_trips_with_wheel_state() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut session = GuidedSession::new(crate::guided::GuidedMode::ChangeProcess, Some("wheel-9".into()));
        session.current_step = 3;
        session.status = SessionStatus::Paused;
        if let Some(wheel) = session.wheel.as_mut() {
            wheel.ready = true;
            wheel.rim_count = 2;
            wheel.next_rim_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15);
        }
        store.write_session(&session).await.unwrap();

        let loaded = store.read_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.mode, crate::guided::GuidedMode::ChangeProcess);
        assert_eq!(loaded.reference_id.as_deref(), Some("wheel-9"));
        assert_eq!(loaded.current_step, 3);
        assert_eq!(loaded.status, SessionStatus::Paused);
        let wheel = loaded.wheel.unwrap();
        assert!(wheel.ready);
        assert_eq!(wheel.rim_count, 2);
        assert_eq!(
            wheel.next_rim_date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[tokio::test]
    async fn missing_session_reads_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.read_session("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sessions_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helmsman.db");

        let session = GuidedSession::new(crate::guided::GuidedMode::Declaration, None);
        {
            let store = SqliteStore::open(&path).unwrap();
            store.write_session(&session).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.read_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.mode, crate::guided::GuidedMode::Declaration);
    }
}
