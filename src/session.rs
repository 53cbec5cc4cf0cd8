//! Session store interface
//!
//! The routing core never assumes in-process persistence: it reads the
//! full prior state at the start of a turn and writes the full next state
//! at the end. Concurrent turns for one user may race; last write wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Per-user routing state as persisted between turns.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: String,
    pub session_id: String,
    pub platform: String,
    /// Active flow node, `None` meaning root / no active flow.
    pub current_node: Option<String>,
    pub turn_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: impl Into<String>, platform: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            session_id: format!("sess_{}", &Uuid::new_v4().simple().to_string()[..16]),
            platform: platform.into(),
            current_node: None,
            turn_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// External key-value session storage, keyed by user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the prior state, `None` for a first-time user.
    async fn load(&self, user_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Persist the next state. Overwrites any concurrent writer.
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Append one line of conversation history.
    async fn append_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), StoreError>;

    /// Most recent history lines for a session, oldest first.
    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<(String, String)>, StoreError>;
}
