use anyhow::Context;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const FALLBACK_ACCOUNT: &str = "usuario";
pub const FINGERPRINT_LEN: usize = 8;
const IDENTITY_DIR_NAME: &str = ".docente_app";
const IDENTITY_FILE_EXT: &str = "config";

/// Name of the OS account running the daemon, or a placeholder.
pub fn local_account() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| FALLBACK_ACCOUNT.to_string())
}

/// Short hex digest of the session parameters.
///
/// Only decorrelates identity files between sessions sharing one OS account;
/// collisions are tolerated.
pub fn session_fingerprint(session: &serde_json::Value) -> String {
    let canonical = if session.is_null() {
        String::new()
    } else {
        session.to_string()
    };
    hex::encode(&Sha256::digest(canonical.as_bytes())[..FINGERPRINT_LEN / 2])
}

pub fn identity_key(account: &str, session: &serde_json::Value) -> String {
    format!("{}_{}", sanitize_account(account), session_fingerprint(session))
}

// The key becomes a file name; domain accounts like `SCHOOL\ana` must not
// escape the identity directory.
fn sanitize_account(account: &str) -> String {
    let cleaned: String = account
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        FALLBACK_ACCOUNT.to_string()
    } else {
        cleaned
    }
}

/// Per-device "current teacher" files, one plain-text file per identity key.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    dir: PathBuf,
}

impl IdentityStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.docente_app`, or `./.docente_app` when there is no home directory.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(IDENTITY_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(IDENTITY_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{IDENTITY_FILE_EXT}"))
    }

    pub fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read identity file {}", path.to_string_lossy())
                })
            }
        };
        let name = raw.trim();
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }

    /// Replaces the stored teacher. Written to a side file and renamed over
    /// the old one so a reader never sees a mix of old and new contents.
    pub fn save(&self, key: &str, teacher: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!(
                "failed to create identity directory {}",
                self.dir.to_string_lossy()
            )
        })?;
        let dst = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.{IDENTITY_FILE_EXT}.saving"));
        std::fs::write(&tmp, teacher.trim())
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        std::fs::rename(&tmp, &dst).with_context(|| {
            format!("failed to move identity into {}", dst.to_string_lossy())
        })?;
        tracing::info!(key, "identity saved");
        Ok(())
    }

    pub fn clear(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(key, "identity cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("failed to remove identity file {}", path.to_string_lossy())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_is_eight_hex_chars_and_stable() {
        let session = json!({ "kiosk": "aula-3" });
        let a = session_fingerprint(&session);
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, session_fingerprint(&json!({ "kiosk": "aula-3" })));
        assert_ne!(a, session_fingerprint(&json!({ "kiosk": "aula-4" })));
    }

    #[test]
    fn missing_session_hashes_like_empty_input() {
        // sha256("") starts with e3b0c442
        assert_eq!(session_fingerprint(&serde_json::Value::Null), "e3b0c442");
    }

    #[test]
    fn key_joins_account_and_fingerprint() {
        let key = identity_key("ana", &serde_json::Value::Null);
        assert_eq!(key, "ana_e3b0c442");
    }

    #[test]
    fn key_account_cannot_escape_directory() {
        let key = identity_key("../SCHOOL\\ana", &serde_json::Value::Null);
        assert!(!key.contains('/'));
        assert!(!key.contains('\\'));
        assert_eq!(identity_key("  ", &serde_json::Value::Null), "usuario_e3b0c442");
        assert_eq!(identity_key("..", &serde_json::Value::Null), "usuario_e3b0c442");
    }
}
