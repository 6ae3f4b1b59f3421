//! Local credential cache.
//!
//! Persists the signed-in user's id and email so later sessions can recover
//! identity without another round-trip to the identity provider. Cleared on
//! explicit sign-out.

use std::path::PathBuf;
use std::{fs, io};

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::types::{Identity, Role};

const SESSION_FILE: &str = "session.json";

/// The two entries kept on disk. The role is not stored; it is re-derived
/// from the configured support address on load.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    user_id: String,
    email: String,
}

pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Store rooted at the platform data-local directory.
    pub fn open_default() -> Self {
        let dir = dirs::data_local_dir()
            .map(|base| base.join("dealdesk"))
            .unwrap_or_else(|| PathBuf::from("cache").join("dealdesk"));
        Self { dir }
    }

    /// Store rooted at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn save(&self, identity: &Identity) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let session = StoredSession {
            user_id: identity.id.clone(),
            email: identity.email.clone(),
        };
        let body = serde_json::to_string_pretty(&session)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(self.dir.join(SESSION_FILE), body)
    }

    /// Cached identity, or `None` when no session was stored or the file is
    /// unreadable. A corrupt file is treated as signed-out.
    pub fn load(&self, config: &AppConfig) -> Option<Identity> {
        let raw = fs::read_to_string(self.dir.join(SESSION_FILE)).ok()?;
        let session: StoredSession = serde_json::from_str(&raw).ok()?;
        let role = if config.is_support_email(&session.email) {
            Role::Support
        } else {
            Role::Client
        };
        Some(Identity {
            id: session.user_id,
            email: session.email,
            role,
        })
    }

    pub fn clear(&self) -> io::Result<()> {
        let path = self.dir.join(SESSION_FILE);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> CredentialStore {
        let dir = std::env::temp_dir().join(format!("dealdesk-credentials-{tag}"));
        let _ = fs::remove_dir_all(&dir);
        CredentialStore::at(dir)
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = temp_store("round-trip");
        let identity = Identity {
            id: "uid-42".to_string(),
            email: "owner@soapworks.example".to_string(),
            role: Role::Client,
        };
        store.save(&identity).unwrap();

        let loaded = store.load(&AppConfig::default()).unwrap();
        assert_eq!(loaded, identity);
        store.clear().unwrap();
    }

    #[test]
    fn load_rederives_support_role() {
        let store = temp_store("support-role");
        let identity = Identity {
            id: "support".to_string(),
            email: "support@abc.com".to_string(),
            // Stored role is irrelevant; only id and email hit the disk.
            role: Role::Client,
        };
        store.save(&identity).unwrap();

        let loaded = store.load(&AppConfig::default()).unwrap();
        assert_eq!(loaded.role, Role::Support);
        store.clear().unwrap();
    }

    #[test]
    fn clear_leaves_store_empty() {
        let store = temp_store("clear");
        let identity = Identity {
            id: "uid-9".to_string(),
            email: "someone@example.com".to_string(),
            role: Role::Client,
        };
        store.save(&identity).unwrap();
        store.clear().unwrap();
        assert!(store.load(&AppConfig::default()).is_none());
        // Clearing an already-empty store is fine.
        store.clear().unwrap();
    }

    #[test]
    fn load_on_missing_file_is_none() {
        let store = temp_store("missing");
        assert!(store.load(&AppConfig::default()).is_none());
    }
}
