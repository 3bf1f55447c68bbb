//! Persisted credential storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! Mirrors the browser's `localStorage` contract: string values under string
//! keys. The bearer token lives under `token` and the JSON user snapshot under
//! `user`. Both are written at login and removed together at logout; a
//! missing or unparseable entry means "not authenticated".
//!
//! DESIGN
//! ======
//! `CredentialStorage` takes `&self` so the session store can hold it behind
//! an `Rc`. `MemoryStorage` backs tests and ephemeral sessions; `FileStorage`
//! keeps a flat JSON object on disk for the terminal client.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::net::types::User;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("storage encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key/value store with `localStorage` semantics.
pub trait CredentialStorage {
    /// Read a value. Backend failures read as `None`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be persisted.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be updated.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// CREDENTIAL HELPERS
// =============================================================================

/// Read the bearer token. Empty strings count as absent.
pub fn load_token(storage: &dyn CredentialStorage) -> Option<String> {
    storage.get_item(TOKEN_KEY).filter(|token| !token.trim().is_empty())
}

/// Read and decode the user snapshot.
pub fn load_user(storage: &dyn CredentialStorage) -> Option<User> {
    let raw = storage.get_item(USER_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "stored user snapshot is unreadable; treating as signed out");
            None
        }
    }
}

/// Persist the token and user snapshot written at login. The snapshot goes
/// first and is rolled back if the token write fails, so a failed save never
/// leaves half a session behind.
///
/// # Errors
///
/// Returns `StorageError` if either key cannot be written.
pub fn save_credentials(storage: &dyn CredentialStorage, token: &str, user: &User) -> Result<(), StorageError> {
    let snapshot = serde_json::to_string(user)?;
    storage.set_item(USER_KEY, &snapshot)?;
    if let Err(e) = storage.set_item(TOKEN_KEY, token) {
        if let Err(rollback) = storage.remove_item(USER_KEY) {
            tracing::warn!(error = %rollback, "failed to roll back user snapshot");
        }
        return Err(e);
    }
    Ok(())
}

/// Remove both credential keys. Both removals are attempted even if the
/// first fails; the first error is returned.
///
/// # Errors
///
/// Returns the first `StorageError` encountered.
pub fn clear_credentials(storage: &dyn CredentialStorage) -> Result<(), StorageError> {
    let token = storage.remove_item(TOKEN_KEY);
    let user = storage.remove_item(USER_KEY);
    token.and(user)
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl CredentialStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE STORAGE
// =============================================================================

/// A flat `{ "key": "value" }` JSON file. Every call re-reads the file so
/// separate processes sharing the path observe each other's writes.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a sibling temp file and rename so readers never see a torn file.
    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut items) => items.remove(key),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "credential file unreadable");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking a fresh login.
        let mut items = self.read_all().unwrap_or_default();
        items.insert(key.to_owned(), value.to_owned());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let items = match self.read_all() {
            Ok(mut items) => {
                if items.remove(key).is_none() {
                    return Ok(());
                }
                items
            }
            // Corrupt contents hold nothing worth keeping.
            Err(StorageError::Json(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        self.write_all(&items)
    }
}
