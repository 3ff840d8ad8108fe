// Session store: authentication state shared by every screen.

use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::domain::{CheckInApi, ClientError, CredentialProvider, Identity, KeyValueStore, Session};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

const LOGIN_FAILED: &str = "login failed, check username and password";
const AUTH_EVENT_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { username: String },
    SignedOut,
    // The backend rejected the held credential; the UI should route to login.
    SessionRevoked,
}

/// Persisted credential plus the in-memory session built from it.
///
/// A staged token without an identity is partial state: it is sent as a bearer
/// credential but never reported as an authenticated session.
pub struct SessionVault {
    storage: Arc<dyn KeyValueStore>,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionVault {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            storage,
            current: RwLock::new(None),
            events,
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn persisted_token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted token");
                None
            }
        }
    }

    fn stage_token(&self, token: &str) -> Result<(), ClientError> {
        self.storage
            .set(TOKEN_KEY, token)
            .map_err(ClientError::Storage)
    }

    fn establish(&self, identity: &Identity) -> Result<Session, ClientError> {
        let token = self
            .persisted_token()
            .ok_or_else(|| ClientError::Auth("no credential to attach identity to".into()))?;
        let cached = serde_json::to_string(identity).map_err(|e| ClientError::Storage(e.to_string()))?;
        self.storage
            .set(USER_KEY, &cached)
            .map_err(ClientError::Storage)?;

        let session = Session::new(token, identity);
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session.clone());
        Ok(session)
    }

    // Drops credential and identity; returns whether anything was held.
    fn clear(&self) -> bool {
        let had_token = self.persisted_token().is_some();
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(error = %e, key, "failed to clear persisted session key");
            }
        }
        let had_session = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .is_some();
        had_token || had_session
    }

    fn notify(&self, event: AuthEvent) {
        // No subscribers is fine; nobody is routing on auth changes yet.
        let _ = self.events.send(event);
    }
}

impl CredentialProvider for SessionVault {
    fn bearer_token(&self) -> Option<String> {
        self.persisted_token()
    }

    fn revoke(&self) {
        if self.clear() {
            tracing::warn!("credential rejected by backend, session cleared");
            self.notify(AuthEvent::SessionRevoked);
        }
    }
}

// Login/logout/restore workflows on top of the vault.
#[derive(Clone)]
pub struct SessionStore {
    api: Arc<dyn CheckInApi>,
    vault: Arc<SessionVault>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn CheckInApi>, vault: Arc<SessionVault>) -> Self {
        Self { api, vault }
    }

    pub fn current(&self) -> Option<Session> {
        self.vault.current()
    }

    pub fn is_authenticated(&self) -> bool {
        self.vault.is_authenticated()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.vault.subscribe()
    }

    /// Establishes a session or fails with `ClientError::Auth`, never both and
    /// never neither. Partial state is cleared on failure.
    #[tracing::instrument(name = "login", skip_all, fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Auth("username and password are required".into()));
        }

        match self.try_login(username, password).await {
            Ok(session) => {
                tracing::info!(role = ?session.role, "signed in");
                self.vault.notify(AuthEvent::SignedIn {
                    username: session.username.clone(),
                });
                Ok(session)
            }
            Err(e) => {
                self.vault.clear();
                tracing::warn!(error = %e, "login failed");
                Err(ClientError::Auth(e.user_message(LOGIN_FAILED)))
            }
        }
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let token = self.api.login(username, password).await?;
        self.vault.stage_token(&token)?;
        let identity = self.api.current_identity().await?;
        self.vault.establish(&identity)
    }

    /// Local-only; takes effect without a backend call.
    pub fn logout(&self) {
        if self.vault.clear() {
            tracing::info!("signed out");
        }
        self.vault.notify(AuthEvent::SignedOut);
    }

    /// Rebuilds the session from a persisted credential. A rejected credential
    /// is cleared silently and leaves the store unauthenticated.
    #[tracing::instrument(name = "restore_session", skip_all)]
    pub async fn restore_from_persisted(&self) -> Option<Session> {
        self.vault.persisted_token()?;

        match self.api.current_identity().await {
            Ok(identity) => match self.vault.establish(&identity) {
                Ok(session) => {
                    tracing::info!(username = %session.username, "session restored");
                    Some(session)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "persisted credential vanished during restore");
                    self.vault.clear();
                    None
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "persisted credential rejected");
                self.vault.clear();
                None
            }
        }
    }
}
