//! SQLite persistence for sessions and conversation history
//!
//! Sessions survive process restarts; the routing core only sees them
//! through the `SessionStore` trait.

mod schema;

pub use schema::SCHEMA;

use crate::session::{SessionRecord, SessionStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Fetch a session by user id
    pub fn get_session(&self, user_id: &str) -> DbResult<Option<SessionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, session_id, platform, current_node, turn_count, created_at, updated_at
             FROM sessions WHERE user_id = ?1",
        )?;

        let record = stmt
            .query_row(params![user_id], |row| {
                Ok(SessionRecord {
                    user_id: row.get(0)?,
                    session_id: row.get(1)?,
                    platform: row.get(2)?,
                    current_node: row.get(3)?,
                    turn_count: row.get(4)?,
                    created_at: parse_timestamp(&row.get::<_, String>(5)?),
                    updated_at: parse_timestamp(&row.get::<_, String>(6)?),
                })
            })
            .optional()?;
        Ok(record)
    }

    /// Insert or overwrite a session (last write wins)
    pub fn upsert_session(&self, record: &SessionRecord) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions (user_id, session_id, platform, current_node, turn_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                session_id = excluded.session_id,
                platform = excluded.platform,
                current_node = excluded.current_node,
                turn_count = excluded.turn_count,
                updated_at = excluded.updated_at",
            params![
                record.user_id,
                record.session_id,
                record.platform,
                record.current_node,
                record.turn_count,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Append one history line for a session
    pub fn insert_message(&self, session_id: &str, role: &str, content: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO messages (id, session_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                session_id,
                role,
                content,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent history lines, oldest first
    pub fn get_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> DbResult<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT role, content FROM messages
             WHERE session_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;
        let mut rows: Vec<(String, String)> = stmt
            .query_map(params![session_id, limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<_, _>>()?;
        rows.reverse();
        Ok(rows)
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl SessionStore for Database {
    async fn load(&self, user_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.get_session(user_id)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.upsert_session(record)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        self.insert_message(session_id, role, content)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<(String, String)>, StoreError> {
        self.get_recent_messages(session_id, limit)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let mut record = SessionRecord::new("user-1", "web");
        record.current_node = Some("troubleshooting".to_string());
        record.turn_count = 3;

        db.upsert_session(&record).unwrap();
        let loaded = db.get_session("user-1").unwrap().unwrap();
        assert_eq!(loaded.session_id, record.session_id);
        assert_eq!(loaded.current_node.as_deref(), Some("troubleshooting"));
        assert_eq!(loaded.turn_count, 3);

        assert!(db.get_session("nobody").unwrap().is_none());
    }

    #[test]
    fn upsert_overwrites_prior_state() {
        let db = Database::open_in_memory().unwrap();
        let mut record = SessionRecord::new("user-1", "web");
        db.upsert_session(&record).unwrap();

        record.current_node = None;
        record.turn_count = 1;
        db.upsert_session(&record).unwrap();

        let loaded = db.get_session("user-1").unwrap().unwrap();
        assert_eq!(loaded.current_node, None);
        assert_eq!(loaded.turn_count, 1);
    }

    #[test]
    fn history_is_returned_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message("sess_1", "user", "hello").unwrap();
        db.insert_message("sess_1", "assistant", "hi there").unwrap();
        db.insert_message("sess_other", "user", "unrelated").unwrap();

        let history = db.get_recent_messages("sess_1", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ("user".to_string(), "hello".to_string()));
        assert_eq!(history[1], ("assistant".to_string(), "hi there".to_string()));
    }

    #[test]
    fn opens_on_disk_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voltdesk.db");
        let db = Database::open(&path).unwrap();
        db.upsert_session(&SessionRecord::new("user-1", "android")).unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert!(reopened.get_session("user-1").unwrap().is_some());
    }
}
