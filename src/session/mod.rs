//! Login session context.
//!
//! One [`Session`] represents an authenticated admin. It is created by
//! `lotadmin login`, persisted to `~/.lotadmin/session.json`, handed to the
//! HTTP client explicitly, and removed by `lotadmin logout`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated admin session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Backend the token was issued by.
    pub base_url: String,
    pub issued_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn new(
        access_token: impl Into<String>,
        username: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            username,
            base_url: base_url.into(),
            issued_at: Utc::now(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (`~/.lotadmin/session.json`).
    pub fn default_location() -> Option<Self> {
        default_session_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session. A missing or malformed file means "logged out".
    pub fn load(&self) -> Option<Session> {
        let content = fs::read_to_string(&self.path).ok()?;
        let session: Session = serde_json::from_str(&content).ok()?;
        if session.access_token.trim().is_empty() {
            return None;
        }
        Some(session)
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("failed to create session directory")?;
        }
        let json = serde_json::to_string_pretty(session).context("failed to serialize session")?;
        fs::write(&self.path, json).context("failed to write session file")?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    /// Remove the session file. Returns whether a session existed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).context("failed to remove session file")?;
        Ok(true)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .context("failed to restrict session file permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// `~/.lotadmin/session.json`
pub fn default_session_path() -> Option<PathBuf> {
    crate::utils::paths::lotadmin_home_dir().map(|dir| dir.join("session.json"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        assert!(store.load().is_none());

        let session = Session::new("jwt-123", Some("admin".to_string()), "http://localhost:8000");
        store.save(&session).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.authorization(), "Bearer jwt-123");

        assert!(store.clear().unwrap());
        assert!(store.load().is_none());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn malformed_file_is_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(SessionStore::new(&path).load().is_none());
    }

    #[test]
    fn blank_token_is_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            r#"{"access_token":"  ","base_url":"http://x","issued_at":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(SessionStore::new(&path).load().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store
            .save(&Session::new("t", None, "http://localhost:8000"))
            .unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
