//! Client-local key-value persistence.
//!
//! The storefront keeps a small amount of state on the device: the bearer
//! credential, the serialized cart lines, and the in-flight checkout
//! draft. Each [`StorageArea`] is a flat string-to-string map with
//! write-through persistence, mirroring the durable and session-scoped
//! areas a browser would offer.
//!
//! Load failures are absorbed: a missing or unreadable backing file
//! yields an empty area, and callers treat a missing key as absence of
//! the resource. Write failures are reported so callers can decide
//! whether to log and move on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Fixed keys for persisted client state.
pub mod keys {
    /// Key for the stored bearer credential.
    pub const CREDENTIAL: &str = "jwt_token";

    /// Key for the serialized cart line list.
    pub const CART: &str = "cart";

    /// Key for the in-flight checkout draft.
    pub const CHECKOUT_DRAFT: &str = "orderData";
}

/// Errors that can occur when persisting an area.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the area contents failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

enum Backend {
    /// Write-through JSON file.
    File(PathBuf),
    /// In-memory only; used by tests and ephemeral sessions.
    Memory,
}

/// A client-local key-value area.
///
/// Cheaply cloneable; clones share the same underlying map, so every
/// component sees the same state (there is one "device", not one copy
/// per component).
#[derive(Clone)]
pub struct StorageArea {
    inner: Arc<Mutex<AreaInner>>,
}

struct AreaInner {
    backend: Backend,
    entries: HashMap<String, String>,
}

impl StorageArea {
    /// Open a file-backed area, loading any existing contents.
    ///
    /// A missing, unreadable, or malformed backing file yields an empty
    /// area rather than an error.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        let entries = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).ok())
            .unwrap_or_default();

        Self {
            inner: Arc::new(Mutex::new(AreaInner {
                backend: Backend::File(path.to_path_buf()),
                entries,
            })),
        }
    }

    /// Create an in-memory area.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(AreaInner {
                backend: Backend::Memory,
                entries: HashMap::new(),
            })),
        }
    }

    /// Get a stored value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).cloned()
    }

    /// Store a value, overwriting any prior one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written. The
    /// in-memory value is updated regardless, so readers in this process
    /// stay consistent.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.entries.insert(key.to_owned(), value.to_owned());
        Self::flush(&inner)
    }

    /// Remove a stored value. No-op if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.entries.remove(key);
        Self::flush(&inner)
    }

    /// Remove every stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.entries.clear();
        Self::flush(&inner)
    }

    fn flush(inner: &AreaInner) -> Result<(), StorageError> {
        match &inner.backend {
            Backend::Memory => Ok(()),
            Backend::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let raw = serde_json::to_string(&inner.entries)?;
                std::fs::write(path, raw)?;
                Ok(())
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AreaInner> {
        // A poisoned lock means a panic mid-mutation; the map itself is
        // always in a consistent state, so keep serving it.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_area_roundtrip() {
        let area = StorageArea::in_memory();
        assert_eq!(area.get("k"), None);

        area.set("k", "v").unwrap();
        assert_eq!(area.get("k"), Some("v".to_string()));

        area.remove("k").unwrap();
        assert_eq!(area.get("k"), None);
    }

    #[test]
    fn test_clones_share_state() {
        let area = StorageArea::in_memory();
        let other = area.clone();

        area.set("k", "v").unwrap();
        assert_eq!(other.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_file_area_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let area = StorageArea::open(&path);
        area.set("jwt_token", "abc.def.ghi").unwrap();
        area.set("cart", "[]").unwrap();
        drop(area);

        let reopened = StorageArea::open(&path);
        assert_eq!(reopened.get("jwt_token"), Some("abc.def.ghi".to_string()));
        assert_eq!(reopened.get("cart"), Some("[]".to_string()));
    }

    #[test]
    fn test_malformed_backing_file_yields_empty_area() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let area = StorageArea::open(&path);
        assert_eq!(area.get("jwt_token"), None);
    }

    #[test]
    fn test_missing_backing_file_yields_empty_area() {
        let dir = tempfile::tempdir().unwrap();
        let area = StorageArea::open(&dir.path().join("absent.json"));
        assert_eq!(area.get("cart"), None);
    }

    #[test]
    fn test_clear_empties_area() {
        let area = StorageArea::in_memory();
        area.set("a", "1").unwrap();
        area.set("b", "2").unwrap();

        area.clear().unwrap();
        assert_eq!(area.get("a"), None);
        assert_eq!(area.get("b"), None);
    }
}
