//! Durable session storage and the per-platform credential store
//!
//! Credentials live in a key-value store scoped to the user's session (the
//! dashboard equivalent of browser local storage). The [`StorageBackend`]
//! trait abstracts the medium; [`FileStorage`] is the durable JSON-backed
//! implementation and [`MemoryStorage`] backs tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::registry::PlatformId;

/// Storage key for the cached long-lived Facebook token
pub const LONG_LIVED_TOKEN_KEY: &str = "fb_long_lived_token";
/// Storage key for the JSON-serialized resolved page list
pub const PAGES_KEY: &str = "facebook_pages";
/// Storage key for the active page selection
pub const SELECTED_PAGE_KEY: &str = "facebook_selected_page";

/// Key-value storage over string keys
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-memory backend for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

/// JSON-file-backed storage
///
/// The whole map is rewritten on every mutation. Entry counts are tiny (a
/// handful of tokens and one cached page list), so simplicity wins over
/// incremental writes.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the storage file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| StoreError::Read(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                key: path.display().to_string(),
                detail: e.to_string(),
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Write(format!("{}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Write(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| StoreError::Write(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.persist(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        self.persist(&entries)
    }
}

/// Stored authorization state for one platform
///
/// A platform is connected iff `primary_token` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub platform: PlatformId,
    pub primary_token: String,
    pub secondary_token: Option<String>,
    pub expires_at: Option<i64>,
}

impl Credential {
    pub fn is_connected(&self) -> bool {
        !self.primary_token.is_empty()
    }
}

/// Per-platform credential store over a [`StorageBackend`]
///
/// Storage keys come from the platform registry so callers never touch key
/// names directly.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn StorageBackend>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    fn expiry_key(platform: PlatformId) -> String {
        format!("{}_token_expires_at", platform.as_str())
    }

    fn auth_state_key(platform: PlatformId) -> String {
        format!("{}_auth_state", platform.as_str())
    }

    /// Current credential for a platform; an empty primary token means
    /// "not connected"
    pub fn get(&self, platform: PlatformId) -> Result<Credential> {
        let descriptor = platform.descriptor();
        let primary_token = self
            .backend
            .get(descriptor.primary_token_key)?
            .unwrap_or_default();
        let secondary_token = match descriptor.secondary_token_key {
            Some(key) => self.backend.get(key)?,
            None => None,
        };
        let expires_at = self
            .backend
            .get(&Self::expiry_key(platform))?
            .and_then(|v| v.parse().ok());

        Ok(Credential {
            platform,
            primary_token,
            secondary_token,
            expires_at,
        })
    }

    /// Store a platform's token(s) after a completed OAuth exchange
    pub fn set(
        &self,
        platform: PlatformId,
        primary_token: &str,
        secondary_token: Option<&str>,
    ) -> Result<()> {
        let descriptor = platform.descriptor();
        self.backend.set(descriptor.primary_token_key, primary_token)?;
        if let (Some(key), Some(secondary)) = (descriptor.secondary_token_key, secondary_token) {
            self.backend.set(key, secondary)?;
        }
        Ok(())
    }

    /// Record when a platform's token expires
    pub fn set_expiry(&self, platform: PlatformId, expires_at: i64) -> Result<()> {
        self.backend
            .set(&Self::expiry_key(platform), &expires_at.to_string())
    }

    /// Remove a platform's primary and secondary entries
    pub fn clear(&self, platform: PlatformId) -> Result<()> {
        let descriptor = platform.descriptor();
        self.backend.remove(descriptor.primary_token_key)?;
        if let Some(key) = descriptor.secondary_token_key {
            self.backend.remove(key)?;
        }
        self.backend.remove(&Self::expiry_key(platform))?;
        Ok(())
    }

    /// Logout: clear every platform plus the Facebook-family caches
    pub fn clear_all(&self) -> Result<()> {
        for platform in PlatformId::all() {
            self.clear(*platform)?;
        }
        self.backend.remove(LONG_LIVED_TOKEN_KEY)?;
        self.backend.remove(PAGES_KEY)?;
        self.backend.remove(SELECTED_PAGE_KEY)?;
        Ok(())
    }

    pub fn is_connected(&self, platform: PlatformId) -> Result<bool> {
        Ok(self.get(platform)?.is_connected())
    }

    /// Cached long-lived Facebook token, distinct from the short-lived one
    pub fn long_lived_token(&self) -> Result<Option<String>> {
        self.backend.get(LONG_LIVED_TOKEN_KEY)
    }

    pub fn set_long_lived_token(&self, token: &str) -> Result<()> {
        self.backend.set(LONG_LIVED_TOKEN_KEY, token)
    }

    /// Transient OAuth anti-forgery state, persisted while the redirect is
    /// in flight
    pub fn set_auth_state(&self, platform: PlatformId, state: &str) -> Result<()> {
        self.backend.set(&Self::auth_state_key(platform), state)
    }

    /// Take (and remove) the persisted anti-forgery state. Single use: a
    /// second read returns None.
    pub fn take_auth_state(&self, platform: PlatformId) -> Result<Option<String>> {
        let key = Self::auth_state_key(platform);
        let value = self.backend.get(&key)?;
        if value.is_some() {
            self.backend.remove(&key)?;
        }
        Ok(value)
    }

    /// Raw access for JSON-serialized entries (page cache, selection)
    pub fn entry(&self, key: &str) -> Result<Option<String>> {
        self.backend.get(key)
    }

    pub fn set_entry(&self, key: &str, value: &str) -> Result<()> {
        self.backend.set(key, value)
    }

    pub fn remove_entry(&self, key: &str) -> Result<()> {
        self.backend.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory_store() -> CredentialStore {
        CredentialStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_get_unconnected_platform() {
        let store = memory_store();
        let credential = store.get(PlatformId::LinkedIn).unwrap();
        assert!(!credential.is_connected());
        assert!(credential.primary_token.is_empty());
        assert!(credential.secondary_token.is_none());
    }

    #[test]
    fn test_set_and_get_with_secondary() {
        let store = memory_store();
        store
            .set(PlatformId::TikTok, "token-1", Some("open-id-1"))
            .unwrap();

        let credential = store.get(PlatformId::TikTok).unwrap();
        assert!(credential.is_connected());
        assert_eq!(credential.primary_token, "token-1");
        assert_eq!(credential.secondary_token.as_deref(), Some("open-id-1"));
    }

    #[test]
    fn test_clear_removes_primary_and_secondary() {
        let store = memory_store();
        store
            .set(PlatformId::TikTok, "token-1", Some("open-id-1"))
            .unwrap();
        store.set_expiry(PlatformId::TikTok, 1_700_000_000).unwrap();

        store.clear(PlatformId::TikTok).unwrap();

        let credential = store.get(PlatformId::TikTok).unwrap();
        assert!(!credential.is_connected());
        assert!(credential.secondary_token.is_none());
        assert!(credential.expires_at.is_none());
    }

    #[test]
    fn test_clear_all_drops_facebook_caches() {
        let store = memory_store();
        store.set(PlatformId::Facebook, "fb-token", None).unwrap();
        store.set_long_lived_token("long-lived").unwrap();
        store.set_entry(PAGES_KEY, "[]").unwrap();
        store.set_entry(SELECTED_PAGE_KEY, "page-1").unwrap();

        store.clear_all().unwrap();

        assert!(!store.is_connected(PlatformId::Facebook).unwrap());
        assert!(store.long_lived_token().unwrap().is_none());
        assert!(store.entry(PAGES_KEY).unwrap().is_none());
        assert!(store.entry(SELECTED_PAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_auth_state_is_single_use() {
        let store = memory_store();
        store.set_auth_state(PlatformId::TikTok, "abc123").unwrap();

        assert_eq!(
            store.take_auth_state(PlatformId::TikTok).unwrap().as_deref(),
            Some("abc123")
        );
        assert!(store.take_auth_state(PlatformId::TikTok).unwrap().is_none());
    }

    #[test]
    fn test_expiry_round_trip() {
        let store = memory_store();
        store.set(PlatformId::Facebook, "fb-token", None).unwrap();
        store.set_expiry(PlatformId::Facebook, 1_800_000_000).unwrap();

        let credential = store.get(PlatformId::Facebook).unwrap();
        assert_eq!(credential.expires_at, Some(1_800_000_000));
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");

        {
            let backend = FileStorage::open(&path).unwrap();
            let store = CredentialStore::new(Arc::new(backend));
            store.set(PlatformId::LinkedIn, "persisted", None).unwrap();
        }

        let backend = FileStorage::open(&path).unwrap();
        let store = CredentialStore::new(Arc::new(backend));
        let credential = store.get(PlatformId::LinkedIn).unwrap();
        assert_eq!(credential.primary_token, "persisted");
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(FileStorage::open(&path).is_err());
    }
}
