//! Storage adapters for cached license state.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::types::ClientLicenseState;

/// Where cached license state lives. Implement this to put state in a
/// keychain, a settings database, or anywhere else.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Option<ClientLicenseState>;
    fn store(&self, state: &ClientLicenseState);
    fn clear(&self);
}

/// File-backed store keeping one JSON document at
/// `{dir}/license-state.json`.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "license-state.json";

    /// Create a store in the given directory. Returns `None` when the
    /// directory does not exist and cannot be created.
    pub fn new(dir: &Path) -> Option<Self> {
        if !dir.is_dir() && std::fs::create_dir_all(dir).is_err() {
            return None;
        }
        Some(Self {
            path: dir.join(Self::FILE_NAME),
        })
    }
}

impl StateStore for FileStore {
    fn load(&self) -> Option<ClientLicenseState> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn store(&self, state: &ClientLicenseState) {
        if let Ok(contents) = serde_json::to_string_pretty(state) {
            let _ = std::fs::write(&self.path, contents);
        }
    }

    fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

/// In-memory store for tests and short-lived processes.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<Option<ClientLicenseState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Option<ClientLicenseState> {
        self.state.read().ok()?.clone()
    }

    fn store(&self, state: &ClientLicenseState) {
        if let Ok(mut slot) = self.state.write() {
            *slot = Some(state.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.state.write() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientStatus;

    #[test]
    fn file_store_round_trips_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        assert!(store.load().is_none());

        let state = ClientLicenseState {
            license_key: Some("AK-TEST".to_string()),
            status: ClientStatus::Active,
            plan: Some("pro".to_string()),
            ..Default::default()
        };
        store.store(&state);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.license_key.as_deref(), Some("AK-TEST"));
        assert_eq!(loaded.status, ClientStatus::Active);

        store.clear();
        store.clear(); // clearing twice is fine
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_state_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join(FileStore::FILE_NAME), "{not json").unwrap();
        assert!(store.load().is_none());
    }
}
