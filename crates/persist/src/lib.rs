//! Strata persistence: on-disk auth token store.
//! Keep code tiny and predictable.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A persisted token grant for one `user@host` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds-since-epoch expiry of the access token, if the server said.
    pub expires_at: Option<i64>,
}

/// File-backed token store under `$STRATA_HOME` (default `~/.strata`).
/// One JSON file per `user@host`, mode 0600.
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(default_home().join("tokens")))
    }

    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, username: &str, hostname: &str) -> PathBuf {
        self.dir.join(format!("{username}@{hostname}.json"))
    }

    pub fn load(&self, username: &str, hostname: &str) -> Result<Option<TokenRecord>> {
        let path = self.path_for(username, hostname);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("reading token file {}", path.display()))?;
        match serde_json::from_str(&data) {
            Ok(rec) => {
                debug!(path = %path.display(), "loaded persisted token");
                Ok(Some(rec))
            }
            Err(err) => {
                // A corrupt token file is treated as absent; the caller will
                // just authenticate again and overwrite it.
                debug!(path = %path.display(), error = %err, "ignoring unreadable token file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, username: &str, hostname: &str, record: &TokenRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating token dir {}", self.dir.display()))?;
        restrict_permissions(&self.dir, 0o700)?;
        let path = self.path_for(username, hostname);
        let data = serde_json::to_string_pretty(record)?;
        fs::write(&path, data).with_context(|| format!("writing token file {}", path.display()))?;
        restrict_permissions(&path, 0o600)?;
        debug!(path = %path.display(), "saved token");
        Ok(())
    }

    pub fn remove(&self, username: &str, hostname: &str) -> Result<()> {
        let path = self.path_for(username, hostname);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing token file {}", path.display())),
        }
    }
}

/// Resolve the strata home directory: `$STRATA_HOME`, else `~/.strata`.
pub fn default_home() -> PathBuf {
    if let Some(home) = std::env::var_os("STRATA_HOME") {
        return PathBuf::from(home);
    }
    if let Some(home) = std::env::var_os("HOME") {
        let mut p = PathBuf::from(home);
        p.push(".strata");
        return p;
    }
    // Fallback to current directory
    PathBuf::from(".strata")
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, perms)
        .with_context(|| format!("setting permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("strata-test-{nanos}"))
    }

    fn record() -> TokenRecord {
        TokenRecord {
            access_token: "tok".to_string(),
            refresh_token: Some("ref".to_string()),
            expires_at: Some(1_700_000_000),
        }
    }

    #[test]
    fn save_load_remove_round_trip() {
        let store = TokenStore::open(temp_dir());
        assert!(store.load("alice", "strata.example.com").unwrap().is_none());
        store.save("alice", "strata.example.com", &record()).unwrap();
        let loaded = store.load("alice", "strata.example.com").unwrap().unwrap();
        assert_eq!(loaded, record());
        store.remove("alice", "strata.example.com").unwrap();
        assert!(store.load("alice", "strata.example.com").unwrap().is_none());
        // double remove is fine
        store.remove("alice", "strata.example.com").unwrap();
    }

    #[test]
    fn corrupt_files_read_as_absent() {
        let dir = temp_dir();
        let store = TokenStore::open(dir.clone());
        store.save("bob", "h", &record()).unwrap();
        fs::write(dir.join("bob@h.json"), "not json").unwrap();
        assert!(store.load("bob", "h").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn token_files_are_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = temp_dir();
        let store = TokenStore::open(dir.clone());
        store.save("carol", "h", &record()).unwrap();
        let mode = fs::metadata(dir.join("carol@h.json")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
