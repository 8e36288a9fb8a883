//! Persisted session: bearer token plus the logged-in and first-launch flags.
//!
//! The store is the only place the bearer token lives. It is shared by every
//! API client through a cheap clone and written to disk after each change so
//! a restarted process resumes the same session.
//!
//! When the server rejects the token (HTTP 401) the API layer calls
//! [`SessionStore::invalidate`], which drops the token and flips the
//! re-login signal observed through [`SessionStore::subscribe_relogin`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::ApiError;

/// Errors persisting the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk layout. Key names are shared with other FreshCart clients.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(rename = "isLoggedIn", default)]
    is_logged_in: bool,
    #[serde(rename = "alreadyLaunched", default)]
    already_launched: bool,
}

#[derive(Default)]
struct SessionState {
    token: Option<SecretString>,
    logged_in: bool,
    launched: bool,
}

impl SessionState {
    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            auth_token: self.token.as_ref().map(|t| t.expose_secret().to_string()),
            is_logged_in: self.logged_in,
            already_launched: self.launched,
        }
    }
}

impl From<PersistedSession> for SessionState {
    fn from(persisted: PersistedSession) -> Self {
        let token = persisted
            .auth_token
            .filter(|t| !t.is_empty())
            .map(SecretString::from);
        Self {
            // A logged-in flag without a token cannot authenticate anything.
            logged_in: persisted.is_logged_in && token.is_some(),
            token,
            launched: persisted.already_launched,
        }
    }
}

/// Shared handle to the session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    /// `None` keeps the session in memory only.
    path: Option<PathBuf>,
    state: RwLock<SessionState>,
    /// Serializes file writes so they land in the order of state changes.
    write_lock: Mutex<()>,
    relogin: watch::Sender<bool>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.inner.path)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Load the session stored at `path`.
    ///
    /// A missing file starts an empty session. A corrupt file is logged and
    /// also treated as empty; it is overwritten on the next change.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Io` if the file exists but cannot be read.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<PersistedSession>(&bytes) {
                Ok(persisted) => SessionState::from(persisted),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable session file");
                    SessionState::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No session file yet");
                SessionState::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::with_state(Some(path), state))
    }

    /// A session that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_state(None, SessionState::default())
    }

    /// An in-memory session that is already logged in.
    #[must_use]
    pub fn in_memory_with_token(token: impl Into<String>) -> Self {
        Self::with_state(
            None,
            SessionState {
                token: Some(SecretString::from(token.into())),
                logged_in: true,
                launched: true,
            },
        )
    }

    fn with_state(path: Option<PathBuf>, state: SessionState) -> Self {
        let (relogin, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionStoreInner {
                path,
                state: RwLock::new(state),
                write_lock: Mutex::new(()),
                relogin,
            }),
        }
    }

    /// The current bearer token, if any.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner.state.read().await.token.clone()
    }

    /// The bearer token, or `ApiError::NotAuthenticated` when there is none.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotAuthenticated` if no token is stored.
    pub async fn require_token(&self) -> Result<SecretString, ApiError> {
        self.token().await.ok_or(ApiError::NotAuthenticated)
    }

    /// Whether a login has been established and not cleared.
    pub async fn is_logged_in(&self) -> bool {
        self.inner.state.read().await.logged_in
    }

    /// Store a freshly issued token and mark the session logged in.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session cannot be written.
    #[instrument(skip_all)]
    pub async fn establish(&self, token: SecretString) -> Result<(), SessionError> {
        {
            let mut state = self.inner.state.write().await;
            state.token = Some(token);
            state.logged_in = true;
        }
        self.inner.relogin.send_replace(false);
        info!("Session established");
        self.persist().await
    }

    /// Log out: drop the token and the logged-in flag.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session cannot be written.
    #[instrument(skip_all)]
    pub async fn clear(&self) -> Result<(), SessionError> {
        {
            let mut state = self.inner.state.write().await;
            state.token = None;
            state.logged_in = false;
        }
        info!("Session cleared");
        self.persist().await
    }

    /// The server rejected the token. Clears it and raises the re-login signal.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session cannot be written. The signal is
    /// raised regardless.
    #[instrument(skip_all)]
    pub async fn invalidate(&self) -> Result<(), SessionError> {
        {
            let mut state = self.inner.state.write().await;
            state.token = None;
            state.logged_in = false;
        }
        warn!("Session token rejected by server, re-login required");
        self.inner.relogin.send_replace(true);
        self.persist().await
    }

    /// Record that the app has been launched.
    ///
    /// Returns `true` only the first time it is ever called for this session
    /// file, which drives onboarding screens.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the flag cannot be written.
    pub async fn mark_launched(&self) -> Result<bool, SessionError> {
        {
            let mut state = self.inner.state.write().await;
            if state.launched {
                return Ok(false);
            }
            state.launched = true;
        }
        self.persist().await?;
        Ok(true)
    }

    /// Receiver that turns `true` whenever the server rejects the token.
    #[must_use]
    pub fn subscribe_relogin(&self) -> watch::Receiver<bool> {
        self.inner.relogin.subscribe()
    }

    async fn persist(&self) -> Result<(), SessionError> {
        let Some(path) = &self.inner.path else {
            return Ok(());
        };

        let _guard = self.inner.write_lock.lock().await;
        let bytes = serde_json::to_vec_pretty(&self.inner.state.read().await.to_persisted())?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!(path = %path.display(), "Session persisted");
        Ok(())
    }
}
