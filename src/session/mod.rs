//! Operator session persisted between CLI invocations
//!
//! The session is a small JSON object keyed by the same names the admin
//! front end keeps in its browser storage. Loading never logs in on its own:
//! a stored token is only trusted while `session_expires` lies in the future.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("session store error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed session file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persisted key set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Value>,
    #[serde(default)]
    pub superadmin_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_expires: Option<DateTime<Utc>>,
}

impl StoredKeys {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<StoredKeys, SessionError>;
    fn save(&self, keys: &StoredKeys) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// JSON file store, e.g. `.dyncontent/session.json`
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<StoredKeys, SessionError> {
        if !self.path.exists() {
            return Ok(StoredKeys::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(StoredKeys::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, keys: &StoredKeys) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(keys)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// An authenticated operator
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: Option<Value>,
    pub superadmin: bool,
    pub expires: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|at| at <= now).unwrap_or(false)
    }

    fn to_keys(&self) -> StoredKeys {
        StoredKeys {
            auth_token: Some(self.token.clone()),
            user_data: self.user.clone(),
            superadmin_authenticated: self.superadmin,
            session_token: Some(self.token.clone()),
            session_expires: self.expires,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated(Session),
    LoggedOut,
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::LoggedOut => "logged out",
        }
    }
}

pub struct SessionManager<S: SessionStore> {
    store: S,
    state: SessionState,
}

impl<S: SessionStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: SessionState::Anonymous,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuild the state from persisted keys
    ///
    /// Only a superadmin session with a token and an unexpired (or absent)
    /// `session_expires` is restored. An expired session is wiped and the
    /// state becomes `LoggedOut`.
    pub fn restore(&mut self, now: DateTime<Utc>) -> Result<&SessionState, SessionError> {
        let keys = self.store.load()?;
        let token = keys.session_token.clone().or(keys.auth_token.clone());

        self.state = match token {
            Some(token) if keys.superadmin_authenticated => {
                let session = Session {
                    token,
                    user: keys.user_data,
                    superadmin: true,
                    expires: keys.session_expires,
                };
                if session.is_expired(now) {
                    tracing::info!("Stored session expired at {:?}", session.expires);
                    self.store.clear()?;
                    SessionState::LoggedOut
                } else {
                    SessionState::Authenticated(session)
                }
            }
            _ => SessionState::Anonymous,
        };
        Ok(&self.state)
    }

    pub fn begin_login(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Anonymous | SessionState::LoggedOut => {
                self.state = SessionState::Authenticating;
                Ok(())
            }
            _ => Err(self.invalid("begin login")),
        }
    }

    pub fn complete_login(&mut self, session: Session) -> Result<(), SessionError> {
        if self.state != SessionState::Authenticating {
            return Err(self.invalid("complete login"));
        }
        self.store.save(&session.to_keys())?;
        tracing::debug!("Session stored (superadmin={})", session.superadmin);
        self.state = SessionState::Authenticated(session);
        Ok(())
    }

    pub fn fail_login(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Authenticating {
            return Err(self.invalid("fail login"));
        }
        self.state = SessionState::Anonymous;
        Ok(())
    }

    /// Remove every persisted key; valid from any state
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.store.clear()?;
        self.state = SessionState::LoggedOut;
        Ok(())
    }

    /// Bearer token of the current session
    pub fn token(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session.token.as_str()),
            _ => None,
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn session(expires: Option<DateTime<Utc>>) -> Session {
        Session {
            token: "tok-1".to_string(),
            user: Some(serde_json::json!({"email": "ops@example.com"})),
            superadmin: true,
            expires,
        }
    }

    #[test]
    fn test_no_auto_login() {
        let temp = TempDir::new().unwrap();
        let mut manager = SessionManager::new(FileSessionStore::new(temp.path().join("s.json")));
        assert_eq!(manager.restore(Utc::now()).unwrap(), &SessionState::Anonymous);
        assert!(manager.token().is_none());
    }

    #[test]
    fn test_login_persists_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/session.json");
        let mut manager = SessionManager::new(FileSessionStore::new(&path));

        manager.begin_login().unwrap();
        assert_eq!(manager.state(), &SessionState::Authenticating);
        manager
            .complete_login(session(Some(Utc::now() + Duration::hours(1))))
            .unwrap();
        assert_eq!(manager.token(), Some("tok-1"));

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "auth_token",
            "user_data",
            "superadmin_authenticated",
            "session_token",
            "session_expires",
        ] {
            assert!(raw.get(key).is_some(), "missing {}", key);
        }

        let mut restored = SessionManager::new(FileSessionStore::new(&path));
        restored.restore(Utc::now()).unwrap();
        assert_eq!(restored.token(), Some("tok-1"));
    }

    #[test]
    fn test_expired_session_logs_out() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("session.json"));
        store
            .save(&session(Some(Utc::now() - Duration::minutes(5))).to_keys())
            .unwrap();

        let mut manager = SessionManager::new(store);
        assert_eq!(manager.restore(Utc::now()).unwrap(), &SessionState::LoggedOut);
        assert!(manager.store().load().unwrap().is_empty());
    }

    #[test]
    fn test_non_superadmin_is_not_restored() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path().join("session.json"));
        let mut keys = session(None).to_keys();
        keys.superadmin_authenticated = false;
        store.save(&keys).unwrap();

        let mut manager = SessionManager::new(store);
        assert_eq!(manager.restore(Utc::now()).unwrap(), &SessionState::Anonymous);
    }

    #[test]
    fn test_invalid_transitions() {
        let temp = TempDir::new().unwrap();
        let mut manager = SessionManager::new(FileSessionStore::new(temp.path().join("s.json")));

        assert!(matches!(
            manager.complete_login(session(None)),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(manager.fail_login().is_err());

        manager.begin_login().unwrap();
        assert!(manager.begin_login().is_err());
        manager.fail_login().unwrap();
        assert_eq!(manager.state(), &SessionState::Anonymous);
    }

    #[test]
    fn test_logout_clears_store() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        let mut manager = SessionManager::new(FileSessionStore::new(&path));
        manager.begin_login().unwrap();
        manager.complete_login(session(None)).unwrap();
        assert!(path.exists());

        manager.logout().unwrap();
        assert!(!path.exists());
        assert_eq!(manager.state(), &SessionState::LoggedOut);
        manager.logout().unwrap();

        manager.begin_login().unwrap();
    }
}
