//! Session credential storage
//!
//! Platforms that authenticate with a browser session (Substack) need a
//! credential captured out of band. The orchestrator only ever reads it
//! through the [`SessionStore`] trait; how it got there is not its concern.
//!
//! - `MemorySessionStore`: in-process map, for tests and embedding
//! - `FileSessionStore`: JSON file with owner-only permissions, used by the
//!   binaries
//!
//! Keys are `{platform}.{credential}`, e.g. [`SUBSTACK_SESSION_KEY`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Result, SessionError};

/// Key of the Substack session cookie
pub const SUBSTACK_SESSION_KEY: &str = "substack.session";

/// Key/value store for session credentials
pub trait SessionStore: Send + Sync {
    /// Read a credential; `Ok(None)` when it was never stored
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store or replace a credential
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a credential. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Backend name for diagnostics
    fn backend_name(&self) -> &str;
}

#[derive(Default)]
pub struct MemorySessionStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// JSON-file session store
///
/// The whole file is read on every `get` so credentials written by
/// `cross-session` are picked up without restarting. Writes replace the file
/// and restrict it to mode 600 on Unix.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        validate_not_symlink(&self.path)?;

        let content = std::fs::read_to_string(&self.path).map_err(SessionError::Io)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content).map_err(SessionError::Corrupt)?)
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(SessionError::Io)?;
        }
        if self.path.exists() {
            validate_not_symlink(&self.path)?;
        }

        let content = serde_json::to_string_pretty(values).map_err(SessionError::Corrupt)?;
        std::fs::write(&self.path, content).map_err(SessionError::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms).map_err(SessionError::Io)?;
        }

        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)?;
        tracing::debug!("Stored session credential '{}' in {:?}", key, self.path);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
            tracing::debug!("Removed session credential '{}'", key);
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}

/// Refuse to follow a symlink where a credential file is expected
fn validate_not_symlink(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path).map_err(SessionError::Io)?;
    if metadata.is_symlink() {
        return Err(SessionError::Symlink(path.display().to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrosspostError;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get(SUBSTACK_SESSION_KEY).unwrap(), None);

        store.set(SUBSTACK_SESSION_KEY, "sid=abc").unwrap();
        assert_eq!(
            store.get(SUBSTACK_SESSION_KEY).unwrap().as_deref(),
            Some("sid=abc")
        );

        store.remove(SUBSTACK_SESSION_KEY).unwrap();
        assert_eq!(store.get(SUBSTACK_SESSION_KEY).unwrap(), None);
        store.remove(SUBSTACK_SESSION_KEY).unwrap();
    }

    #[test]
    fn test_memory_store_with_entries() {
        let store = MemorySessionStore::with_entries([(SUBSTACK_SESSION_KEY, "sid=1")]);
        assert_eq!(store.get(SUBSTACK_SESSION_KEY).unwrap().as_deref(), Some("sid=1"));
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path().join("session.json"));
        assert_eq!(store.get(SUBSTACK_SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.json");

        FileSessionStore::new(path.clone())
            .set(SUBSTACK_SESSION_KEY, "sid=persisted")
            .unwrap();

        let store = FileSessionStore::new(path.clone());
        assert_eq!(
            store.get(SUBSTACK_SESSION_KEY).unwrap().as_deref(),
            Some("sid=persisted")
        );

        store.remove(SUBSTACK_SESSION_KEY).unwrap();
        assert_eq!(FileSessionStore::new(path).get(SUBSTACK_SESSION_KEY).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        FileSessionStore::new(path.clone()).set("k", "v").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_rejects_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("real.json");
        std::fs::write(&target, "{}").unwrap();
        let link = temp_dir.path().join("session.json");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let result = FileSessionStore::new(link).get(SUBSTACK_SESSION_KEY);
        assert!(matches!(
            result,
            Err(CrosspostError::Session(SessionError::Symlink(_)))
        ));
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileSessionStore::new(path).get(SUBSTACK_SESSION_KEY);
        assert!(matches!(
            result,
            Err(CrosspostError::Session(SessionError::Corrupt(_)))
        ));
    }
}
