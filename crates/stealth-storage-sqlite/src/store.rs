//! Key/value persistence for stealth session state
//!
//! Every protected surface gets its own store (or its own scope inside the
//! shared SQLite table), so one surface can never read another's mode or
//! passcode verifier.

use crate::{Database, Error, Result};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Persisted key names
pub mod keys {
    /// `decoy` or `protected`
    pub const MODE: &str = "stealth.mode";
    /// `true` once a passcode has been set up
    pub const PASSCODE_CONFIGURED: &str = "stealth.passcodeConfigured";
    /// Opaque passcode verifier
    pub const PASSCODE_VERIFIER: &str = "stealth.passcodeVerifier";
    /// Title shown in tabs and task switchers
    pub const DECOY_TITLE: &str = "stealth.decoyTitle";
    /// RFC 3339 time of the last mode change
    pub const LAST_TRANSITION_AT: &str = "stealth.lastTransitionAt";
}

/// Durable client-side key/value storage.
///
/// Reads and writes are synchronous. Implementations report failures
/// instead of guessing; callers decide how to fail closed.
pub trait SessionStore: Send {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: SessionStore + Sync + ?Sized> SessionStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    reads_fail: AtomicBool,
    writes_fail: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail, as with storage disabled by the browser
    pub fn set_reads_fail(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail, as with an exhausted quota
    pub fn set_writes_fail(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes and removals so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.values.read().clone()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(Error::Storage("storage unavailable".to_string()));
        }
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(Error::Storage("storage unavailable".to_string()));
        }
        self.values.write().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(Error::Storage("storage unavailable".to_string()));
        }
        self.values.write().remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// SQLite-backed store scoped to one protected surface
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
    scope: String,
}

impl SqliteStore {
    /// Create a store over a shared database
    pub fn new(db: Arc<Mutex<Database>>, scope: impl Into<String>) -> Result<Self> {
        let scope = scope.into();
        if scope.is_empty() {
            return Err(Error::Validation("store scope must not be empty".to_string()));
        }
        Ok(Self { db, scope })
    }

    /// Scope this store reads and writes
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl SessionStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock();
        let value = db
            .conn()
            .query_row(
                "SELECT value FROM stealth_state WHERE scope = ?1 AND key = ?2",
                params![self.scope, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock();
        db.conn().execute(
            "INSERT OR REPLACE INTO stealth_state (scope, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![self.scope, key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock();
        db.conn().execute(
            "DELETE FROM stealth_state WHERE scope = ?1 AND key = ?2",
            params![self.scope, key],
        )?;
        Ok(())
    }
}
