//! Durable credential slot and the session context built on top of it.

use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use crate::error::{AdminError, AdminResult};

/// Key under which the admin credential is persisted.
pub const CREDENTIAL_KEY: &str = "adminSecret";

/// A durable key-value slot holding the admin credential across restarts.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, secret: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON key-value file, by default under the user's config directory.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| anyhow!("no config directory available for this platform"))?;
        Ok(base.join("wedding-admin").join("session.json"))
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).with_context(|| {
                format!("credential file '{}' is not valid JSON", self.path.display())
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to read '{}'", self.path.display())),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create credential directory '{}'", parent.display())
            })?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write '{}'", self.path.display()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(CREDENTIAL_KEY))
    }

    fn save(&self, secret: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(CREDENTIAL_KEY.to_string(), secret.to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(CREDENTIAL_KEY).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(secret.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self
            .slot
            .lock()
            .map_err(|_| anyhow!("credential slot poisoned"))?
            .clone())
    }

    fn save(&self, secret: &str) -> Result<()> {
        *self
            .slot
            .lock()
            .map_err(|_| anyhow!("credential slot poisoned"))? = Some(secret.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .slot
            .lock()
            .map_err(|_| anyhow!("credential slot poisoned"))? = None;
        Ok(())
    }
}

/// Holds the admin credential for one session. The persisted slot is read
/// once on `init` and written on `login`/`logout`.
pub struct SessionContext {
    store: Box<dyn CredentialStore>,
    credential: Option<String>,
}

impl SessionContext {
    pub fn init(store: Box<dyn CredentialStore>) -> Self {
        let credential = match store.load() {
            Ok(value) => value.filter(|secret| !secret.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "session: failed to read persisted credential");
                None
            }
        };
        debug!(restored = credential.is_some(), "session: initialized");
        Self { store, credential }
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn login(&mut self, secret: &str) -> AdminResult<()> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(AdminError::validation("Please enter admin secret"));
        }
        self.store
            .save(secret)
            .map_err(|err| AdminError::transport(None, format!("{err:#}")))?;
        self.credential = Some(secret.to_string());
        Ok(())
    }

    /// Drops the in-memory credential even if clearing the durable slot fails.
    pub fn logout(&mut self) {
        self.credential = None;
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "session: failed to clear persisted credential");
        }
    }

    pub(crate) fn require_credential(&self) -> AdminResult<String> {
        self.credential.clone().ok_or(AdminError::Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_until_cleared() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.load().expect("load"), None);
        store.save("s3cret").expect("save");

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load().expect("load").as_deref(), Some("s3cret"));

        reopened.clear().expect("clear");
        assert_eq!(FileCredentialStore::new(&path).load().expect("load"), None);
    }

    #[test]
    fn file_store_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"theme":"palette2"}"#).expect("seed");

        let store = FileCredentialStore::new(&path);
        store.save("s3cret").expect("save");
        store.clear().expect("clear");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("palette2"));
        assert!(!raw.contains("s3cret"));
    }

    #[test]
    fn session_restores_persisted_credential() {
        let session = SessionContext::init(Box::new(MemoryCredentialStore::with_secret("abc")));
        assert_eq!(session.credential(), Some("abc"));
    }

    #[test]
    fn login_rejects_blank_secret() {
        let mut session = SessionContext::init(Box::new(MemoryCredentialStore::default()));
        let err = session.login("   ").expect_err("blank secret");
        assert!(matches!(err, AdminError::Validation(ref msgs) if msgs == &["Please enter admin secret"]));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn logout_clears_durable_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let mut session = SessionContext::init(Box::new(FileCredentialStore::new(&path)));
        session.login(" secret ").expect("login");
        assert_eq!(session.credential(), Some("secret"));

        session.logout();
        assert!(!session.is_authenticated());
        let reloaded = SessionContext::init(Box::new(FileCredentialStore::new(&path)));
        assert!(!reloaded.is_authenticated());
    }
}
