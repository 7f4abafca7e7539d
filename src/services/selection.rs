//! Durable active-account selection.
//!
//! Two keys live in a small SQLite key/value table. Selecting one kind of
//! account deletes the other key in the same transaction, so at most one of
//! them is ever set.

use crate::error::Result;
use crate::types::ActiveSelection;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

pub const REGULAR_KEY: &str = "selectedTradingAccountId";
pub const CHALLENGE_KEY: &str = "selectedChallengeAccountId";

/// SQLite-backed store for the active account selection.
pub struct SelectionStore {
    conn: Mutex<Connection>,
}

impl SelectionStore {
    /// Open (or create) the store at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("Selection store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory selection store initialized");
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "CREATE TABLE IF NOT EXISTS secure_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Persist a regular account as active and clear any challenge selection.
    pub fn select_regular(&self, account_id: &str) -> Result<()> {
        self.write(REGULAR_KEY, CHALLENGE_KEY, account_id)
    }

    /// Persist a challenge account as active and clear any regular selection.
    pub fn select_challenge(&self, account_id: &str) -> Result<()> {
        self.write(CHALLENGE_KEY, REGULAR_KEY, account_id)
    }

    /// Persist whichever kind `selection` names.
    pub fn save(&self, selection: &ActiveSelection) -> Result<()> {
        match selection {
            ActiveSelection::Regular(id) => self.select_regular(id),
            ActiveSelection::Challenge(id) => self.select_challenge(id),
        }
    }

    fn write(&self, key: &str, other: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO secure_store (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        tx.execute("DELETE FROM secure_store WHERE key = ?1", params![other])?;
        tx.commit()?;
        debug!("Stored {} = {}", key, value);
        Ok(())
    }

    /// Forget any selection.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "DELETE FROM secure_store WHERE key IN (?1, ?2)",
            params![REGULAR_KEY, CHALLENGE_KEY],
        )?;
        Ok(())
    }

    /// Raw value for one key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let value = conn
            .query_row(
                "SELECT value FROM secure_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// The live selection, if any.
    ///
    /// Should both keys ever be present (e.g. a store written by an older
    /// client), the challenge selection wins and the regular key is dropped.
    pub fn load(&self) -> Result<Option<ActiveSelection>> {
        let challenge = self.get(CHALLENGE_KEY)?;
        let regular = self.get(REGULAR_KEY)?;

        match (challenge, regular) {
            (Some(challenge), Some(_)) => {
                warn!("Both selection keys present, keeping challenge {}", challenge);
                self.select_challenge(&challenge)?;
                Ok(Some(ActiveSelection::Challenge(challenge)))
            }
            (Some(challenge), None) => Ok(Some(ActiveSelection::Challenge(challenge))),
            (None, Some(regular)) => Ok(Some(ActiveSelection::Regular(regular))),
            (None, None) => Ok(None),
        }
    }
}
