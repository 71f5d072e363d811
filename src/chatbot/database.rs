//! Persistent SQLite store for conversation turns and per-user session keys.
//!
//! Turns form an append-only log per user. Every append slides the expiry of
//! the whole log forward, so a conversation disappears 24h after its last
//! write. Session keys (style, timezone, last image query) expire on their own
//! schedule. Expiry is checked on read; `purge_expired` reclaims space.

use crate::chatbot::message::Turn;
use rusqlite::{Connection, OptionalExtension, params};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Retention window for chat turns, refreshed on every append.
pub const TURN_TTL_SECS: i64 = 24 * 60 * 60;

/// Soft expiry for style and timezone choices.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// How long an image query is remembered for a bare "show me" request.
pub const IMAGE_QUERY_TTL_SECS: i64 = 5 * 60;

/// Session key names.
pub mod keys {
    pub const STYLE: &str = "style";
    pub const TIMEZONE: &str = "timezone";
    pub const LAST_IMAGE_QUERY: &str = "last_image_query";
}

#[derive(Debug)]
pub enum DatabaseError {
    Open(rusqlite::Error),
    Sql(rusqlite::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(e) => write!(f, "failed to open database: {e}"),
            Self::Sql(e) => write!(f, "database error: {e}"),
            Self::Encode(e) => write!(f, "failed to encode turn: {e}"),
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open(e) | Self::Sql(e) => Some(e),
            Self::Encode(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sql(e)
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// SQLite-backed conversation and session store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::Open)?;
        Self::with_connection(conn)
    }

    /// Open (or create) a database file.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(DatabaseError::Open)?;
        let db = Self::with_connection(conn)?;
        let (turns, sessions) = db.counts()?;
        info!("Loaded database from {:?} ({} turns, {} session keys)", path, turns, sessions);
        Ok(db)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS session (
                user_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, key)
            );

            CREATE INDEX IF NOT EXISTS idx_turns_user ON turns(user_id, seq);
            CREATE INDEX IF NOT EXISTS idx_turns_expires ON turns(expires_at);
            "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn counts(&self) -> Result<(usize, usize), DatabaseError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let turns: i64 = conn.query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))?;
        let sessions: i64 = conn.query_row("SELECT COUNT(*) FROM session", [], |row| row.get(0))?;
        Ok((turns as usize, sessions as usize))
    }

    // ==================== TURNS ====================

    /// Append a turn to the user's log and refresh the log's expiry.
    pub fn append(&self, user_id: i64, turn: &Turn) -> Result<(), DatabaseError> {
        self.append_at(user_id, turn, now_secs())
    }

    pub(crate) fn append_at(&self, user_id: i64, turn: &Turn, now: i64) -> Result<(), DatabaseError> {
        let payload = serde_json::to_string(turn).map_err(DatabaseError::Encode)?;
        self.append_raw_at(user_id, &payload, now)
    }

    pub(crate) fn append_raw_at(&self, user_id: i64, payload: &str, now: i64) -> Result<(), DatabaseError> {
        let expires_at = now + TURN_TTL_SECS;
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO turns (user_id, payload, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, payload, now, expires_at],
        )?;
        tx.execute(
            "UPDATE turns SET expires_at = ?2 WHERE user_id = ?1",
            params![user_id, expires_at],
        )?;
        tx.commit()?;
        debug!("Stored turn for user {}", user_id);
        Ok(())
    }

    /// Up to `limit` most recent turns, oldest first.
    ///
    /// Rows that fail to decode still occupy their slot in the window but
    /// are dropped from the result.
    pub fn recent(&self, user_id: i64, limit: usize) -> Result<Vec<Turn>, DatabaseError> {
        self.recent_at(user_id, limit, now_secs())
    }

    pub(crate) fn recent_at(&self, user_id: i64, limit: usize, now: i64) -> Result<Vec<Turn>, DatabaseError> {
        let payloads = self.recent_payloads(user_id, limit, now)?;
        Ok(payloads.into_iter().rev().filter_map(|(seq, p)| decode_turn(seq, &p)).collect())
    }

    /// The question of the most recent turn, if any.
    pub fn latest_question(&self, user_id: i64) -> Result<Option<String>, DatabaseError> {
        let payloads = self.recent_payloads(user_id, 1, now_secs())?;
        Ok(payloads
            .first()
            .and_then(|(seq, p)| decode_turn(*seq, p))
            .and_then(|t| t.question))
    }

    /// Newest first.
    fn recent_payloads(&self, user_id: i64, limit: usize, now: i64) -> Result<Vec<(i64, String)>, DatabaseError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT seq, payload FROM turns
             WHERE user_id = ?1 AND expires_at > ?2
             ORDER BY seq DESC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![user_id, now, limit as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
    }

    // ==================== SESSION KEYS ====================

    /// Read a live session value.
    pub fn get_session(&self, user_id: i64, key: &str) -> Result<Option<String>, DatabaseError> {
        self.get_session_at(user_id, key, now_secs())
    }

    pub(crate) fn get_session_at(&self, user_id: i64, key: &str, now: i64) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let value = conn
            .query_row(
                "SELECT value FROM session WHERE user_id = ?1 AND key = ?2 AND expires_at > ?3",
                params![user_id, key, now],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a session value, replacing whatever was there.
    pub fn set_session(&self, user_id: i64, key: &str, value: &str, ttl_secs: i64) -> Result<(), DatabaseError> {
        self.set_session_at(user_id, key, value, ttl_secs, now_secs())
    }

    pub(crate) fn set_session_at(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
        ttl_secs: i64,
        now: i64,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO session (user_id, key, value, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![user_id, key, value, now + ttl_secs],
        )?;
        Ok(())
    }

    /// Write a session value only if no live value exists.
    ///
    /// Returns `true` if the value was written. Single statement, so two
    /// concurrent writers cannot both win.
    pub fn set_session_if_absent(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
        ttl_secs: i64,
    ) -> Result<bool, DatabaseError> {
        self.set_session_if_absent_at(user_id, key, value, ttl_secs, now_secs())
    }

    pub(crate) fn set_session_if_absent_at(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
        ttl_secs: i64,
        now: i64,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let changed = conn.execute(
            "INSERT INTO session (user_id, key, value, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
             WHERE session.expires_at <= ?5",
            params![user_id, key, value, now + ttl_secs, now],
        )?;
        Ok(changed > 0)
    }

    // ==================== MAINTENANCE ====================

    /// Delete expired turns and session keys. Returns rows removed.
    pub fn purge_expired(&self) -> Result<usize, DatabaseError> {
        self.purge_expired_at(now_secs())
    }

    pub(crate) fn purge_expired_at(&self, now: i64) -> Result<usize, DatabaseError> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let turns = conn.execute("DELETE FROM turns WHERE expires_at <= ?1", params![now])?;
        let sessions = conn.execute("DELETE FROM session WHERE expires_at <= ?1", params![now])?;
        if turns + sessions > 0 {
            info!("🧹 Purged {} expired turn(s), {} session key(s)", turns, sessions);
        }
        Ok(turns + sessions)
    }
}

fn decode_turn(seq: i64, payload: &str) -> Option<Turn> {
    match serde_json::from_str(payload) {
        Ok(turn) => Some(turn),
        Err(e) => {
            warn!("Skipping undecodable turn {}: {}", seq, e);
            None
        }
    }
}
