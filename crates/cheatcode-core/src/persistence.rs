#![forbid(unsafe_code)]

//! Persistence adapter for effect state.
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: a failing store never panics and never
//!    propagates. The effect still renders for this page; it just will not
//!    survive a reload.
//! 2. **Absence is inactive**: toggling off deletes the key. A stored value
//!    other than `"true"` also reads as inactive.
//! 3. **Namespacing**: every key is `<prefix><name>` (default prefix
//!    `cheat_state_`).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Unavailable` | no storage on this origin | read as absent, writes dropped |
//! | `StorageError::Denied` | privacy mode, blocked cookies | read as absent, writes dropped |
//! | `StorageError::QuotaExceeded` | store full | write dropped, logged |

use std::collections::HashMap;
use std::fmt;

/// Default key prefix.
pub const DEFAULT_PREFIX: &str = "cheat_state_";

/// Key holding the active season.
pub const SEASON_KEY: &str = "season";

const ACTIVE_VALUE: &str = "true";

/// Errors a backing store can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No store exists on this host.
    Unavailable,
    /// The host refused access.
    Denied(String),
    /// The write would exceed the store's quota.
    QuotaExceeded,
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "storage unavailable"),
            Self::Denied(msg) => write!(f, "storage access denied: {msg}"),
            Self::QuotaExceeded => write!(f, "storage quota exceeded"),
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A durable per-origin string store.
pub trait KeyValueStore {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&mut self, key: &str) -> StorageResult<()>;
}

/// In-memory store for tests and headless hosts.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: HashMap<String, String>,
    failing: Option<StorageError>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails with `error`.
    #[must_use]
    pub fn failing(error: StorageError) -> Self {
        Self {
            data: HashMap::new(),
            failing: Some(error),
        }
    }

    /// Raw view of stored entries (full keys, prefix included).
    #[must_use]
    pub fn entries(&self) -> &HashMap<String, String> {
        &self.data
    }

    /// Seed a raw entry, bypassing the adapter.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    fn check(&self) -> StorageResult<()> {
        match &self.failing {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.check()?;
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.check()?;
        self.data.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.check()?;
        self.data.remove(key);
        Ok(())
    }
}

/// Failure-tolerant, prefix-namespaced view over a [`KeyValueStore`].
#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
    prefix: String,
}

impl<S: KeyValueStore> Persistence<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_prefix(store, DEFAULT_PREFIX)
    }

    #[must_use]
    pub fn with_prefix(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Full storage key for `name`.
    #[must_use]
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Read a value. Storage errors read as absent.
    #[must_use]
    pub fn load(&self, name: &str) -> Option<String> {
        match self.store.get(&self.key(name)) {
            Ok(value) => value,
            Err(err) => {
                crate::warn!(store = self.store.name(), name, error = %err, "state read failed");
                None
            }
        }
    }

    /// Write `Some(value)` or delete on `None`/empty.
    ///
    /// Returns whether the store accepted the change.
    pub fn save(&mut self, name: &str, value: Option<&str>) -> bool {
        let key = self.key(name);
        let result = match value {
            Some(v) if !v.is_empty() => self.store.set(&key, v),
            _ => self.store.remove(&key),
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                crate::warn!(store = self.store.name(), name, error = %err, "state write failed");
                false
            }
        }
    }

    /// Persist a boolean flag: `true` stores `"true"`, `false` deletes the key.
    pub fn save_flag(&mut self, name: &str, active: bool) -> bool {
        self.save(name, active.then_some(ACTIVE_VALUE))
    }

    /// Whether `name` is persisted as active.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.read_flag(name).unwrap_or(false)
    }

    /// Persisted flag, or `None` when the store could not be read.
    #[must_use]
    pub fn read_flag(&self, name: &str) -> Option<bool> {
        match self.store.get(&self.key(name)) {
            Ok(value) => Some(value.is_some_and(|v| v.trim().eq_ignore_ascii_case(ACTIVE_VALUE))),
            Err(err) => {
                crate::warn!(store = self.store.name(), name, error = %err, "state read failed");
                None
            }
        }
    }

    /// Key prefix in use.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_round_trip_uses_prefixed_key() {
        let mut p = Persistence::new(MemoryStore::new());
        assert!(p.save_flag("devmode", true));
        assert_eq!(
            p.store().entries().get("cheat_state_devmode").map(String::as_str),
            Some("true")
        );
        assert!(p.is_active("devmode"));
    }

    #[test]
    fn toggling_off_deletes_the_key() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save_flag("doom", true);
        p.save_flag("doom", false);
        assert!(p.store().entries().is_empty());
        assert!(!p.is_active("doom"));
    }

    #[test]
    fn false_like_values_are_inactive() {
        let mut store = MemoryStore::new();
        store.insert_raw("cheat_state_fps", "false");
        store.insert_raw("cheat_state_retro", "0");
        store.insert_raw("cheat_state_cyber", "TRUE");
        let p = Persistence::new(store);
        assert!(!p.is_active("fps"));
        assert!(!p.is_active("retro"));
        assert!(p.is_active("cyber"));
    }

    #[test]
    fn empty_value_deletes() {
        let mut p = Persistence::new(MemoryStore::new());
        p.save(SEASON_KEY, Some("winter"));
        assert_eq!(p.load(SEASON_KEY).as_deref(), Some("winter"));
        p.save(SEASON_KEY, Some(""));
        assert_eq!(p.load(SEASON_KEY), None);
    }

    #[test]
    fn failing_store_degrades_silently() {
        let mut p = Persistence::new(MemoryStore::failing(StorageError::QuotaExceeded));
        assert!(!p.save_flag("bighead", true));
        assert!(!p.is_active("bighead"));
        assert_eq!(p.read_flag("bighead"), None);
        assert_eq!(p.load(SEASON_KEY), None);
    }

    #[test]
    fn custom_prefix() {
        let p = Persistence::with_prefix(MemoryStore::new(), "egg_");
        assert_eq!(p.key("matrix"), "egg_matrix");
        assert_eq!(p.prefix(), "egg_");
    }

    #[test]
    fn error_display() {
        assert_eq!(
            StorageError::Denied("SecurityError".into()).to_string(),
            "storage access denied: SecurityError"
        );
    }
}
