//! User sessions
//!
//! A session is identified by a UUID generated when it is opened. The id
//! doubles as the name of the session's vector store collection. Sessions
//! are never persisted or resumed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One user's conversation with the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    turns: u64,
}

impl Session {
    /// Start a session with a fresh identifier
    pub(crate) fn new() -> Self {
        Session {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: 0,
        }
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Vector store collection holding this session's memories
    pub fn collection(&self) -> String {
        self.id.to_string()
    }

    /// When the session was opened
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Number of turns handled so far
    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub(crate) fn record_turn(&mut self) {
        self.turns += 1;
    }
}

/// Final statistics for a closed session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Session identifier
    pub session_id: Uuid,
    /// When the session was opened
    pub started_at: DateTime<Utc>,
    /// Turns handled
    pub turns: u64,
    /// Records still active
    pub active_memories: u64,
    /// Records soft-deleted during the session
    pub deleted_memories: u64,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {}: {} turns, {} active memories, {} forgotten",
            self.session_id, self.turns, self.active_memories, self.deleted_memories
        )
    }
}
