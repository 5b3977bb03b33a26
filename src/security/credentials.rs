use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Storage key for the short-lived access credential.
pub const ACCESS_TOKEN_KEY: &str = "accesstoken";

/// Storage key for the long-lived refresh credential.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Client-side credential storage.
///
/// The pipeline reads the access credential on every request and writes a
/// new one once per successful renewal; login writes both credentials and
/// logout removes them. Implementations are injected so the storage
/// lifecycle stays controllable (and swappable in tests).
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor preloading both session credentials.
    pub fn with_session(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        store.set(ACCESS_TOKEN_KEY, access);
        store.set(REFRESH_TOKEN_KEY, refresh);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

/// JSON-file-backed store persisting the session across process restarts.
///
/// Reads happen against an in-memory copy; every write goes through to
/// disk. A write failure is logged and the in-memory state kept, since the
/// store is not expected to be durable against losing access to the file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading existing entries if the file is
    /// present. A missing file starts an empty session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path).context("reading credential file")?;
            serde_json::from_str(&raw).context("parsing credential file")?
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), "credential store opened");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        let raw = match serde_json::to_string_pretty(entries) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "failed to serialize credential store");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, raw) {
            warn!(
                path = %self.path.display(),
                error = %err,
                "failed to persist credential store"
            );
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        self.persist(&entries);
    }
}
