use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use vts_observability::redact_text;

use crate::error::{Result, VtsError};

pub fn default_token_path() -> PathBuf {
    PathBuf::from("extensions")
        .join("vtube_studio")
        .join("auth_token.txt")
}

/// Long-lived authentication token issued by the host to one plugin identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&redact_text(&self.0)).finish()
    }
}

/// Plain-text token file. Single writer assumed; there is no locking.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(default_token_path())
    }
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored token, or `None` when the file is missing, unreadable or blank.
    pub fn load(&self) -> Option<Credential> {
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no authentication token at {}", self.path.display());
                return None;
            }
            Err(err) => {
                warn!(
                    "could not read authentication token from {}: {err}",
                    self.path.display()
                );
                return None;
            }
        };
        let token = existing.trim();
        if token.is_empty() {
            return None;
        }
        info!("found authentication token in {}", self.path.display());
        Some(Credential::new(token))
    }

    /// Overwrite the token file, creating it and its parent directories.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| VtsError::Credential {
                path: self.path.clone(),
                source,
            })?;
        }
        std::fs::write(&self.path, credential.expose()).map_err(|source| {
            VtsError::Credential {
                path: self.path.clone(),
                source,
            }
        })?;
        info!("authentication token saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("auth_token.txt"));
        assert!(store.load().is_none());
    }

    #[test]
    fn blank_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth_token.txt");
        std::fs::write(&path, "  \n").unwrap();
        assert!(CredentialStore::new(path).load().is_none());
    }

    #[test]
    fn save_creates_parents_and_load_trims() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extensions").join("vtube_studio").join("auth_token.txt");
        let store = CredentialStore::new(&path);

        store.save(&Credential::new("tok-123")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "tok-123");

        std::fs::write(&path, "tok-456\n").unwrap();
        assert_eq!(store.load(), Some(Credential::new("tok-456")));
    }

    #[test]
    fn save_overwrites_previous_token() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("auth_token.txt"));
        store.save(&Credential::new("first")).unwrap();
        store.save(&Credential::new("second")).unwrap();
        assert_eq!(store.load().unwrap().expose(), "second");
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", Credential::new("tok-secret"));
        assert!(!rendered.contains("tok-secret"));
        assert!(rendered.contains("redacted"));
    }
}
