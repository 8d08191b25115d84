//! Session provider: the one place that talks to the auth service. Everything
//! else reads the current user from here.

use crate::backend::{AuthService, Session};
use crate::error::{ForestError, ForestResult};
use memory_forest_types::{AuthUser, SessionInfo, SignUpOutcome};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Initial resolution has not finished yet.
    Loading,
    Unauthenticated,
    Ready(Session),
}

pub struct SessionProvider {
    auth: Arc<dyn AuthService>,
    state: RwLock<SessionState>,
}

impl SessionProvider {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            state: RwLock::new(SessionState::Loading),
        }
    }

    /// Resolves a previously stored access token. Any failure lands in
    /// `Unauthenticated`; resolution never leaves the provider loading.
    pub async fn initialize(&self, stored_token: Option<&str>) -> SessionState {
        let resolved = match stored_token.filter(|t| !t.is_empty()) {
            None => SessionState::Unauthenticated,
            Some(token) => match self.auth.current_user(token).await {
                Ok(Some(user)) => SessionState::Ready(Session {
                    access_token: token.to_string(),
                    refresh_token: None,
                    user,
                }),
                Ok(None) => SessionState::Unauthenticated,
                Err(e) => {
                    log::warn!("[SESSION] Could not resolve stored session: {}", e);
                    SessionState::Unauthenticated
                }
            },
        };
        *self.state.write() = resolved.clone();
        resolved
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.read(), SessionState::Loading)
    }

    pub fn session(&self) -> Option<Session> {
        match &*self.state.read() {
            SessionState::Ready(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.session().map(|s| s.user)
    }

    pub fn require_session(&self) -> ForestResult<Session> {
        self.session().ok_or(ForestError::Unauthenticated)
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            loading: self.is_loading(),
            user: self.current_user(),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ForestResult<Session> {
        let session = self.auth.sign_in(email, password).await?;
        log::info!("[SESSION] User {} signed in", session.user.id);
        *self.state.write() = SessionState::Ready(session.clone());
        Ok(session)
    }

    /// Does not sign in; the account may still need email confirmation.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> ForestResult<SignUpOutcome> {
        self.auth.sign_up(email, password, redirect_to).await
    }

    /// Clears the local session even if the remote call fails.
    pub async fn sign_out(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), SessionState::Unauthenticated);
        if let SessionState::Ready(session) = previous {
            if let Err(e) = self.auth.sign_out(&session).await {
                log::warn!("[SESSION] Remote sign-out failed for {}: {}", session.user.id, e);
            } else {
                log::info!("[SESSION] User {} signed out", session.user.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::local::LocalBackend;

    async fn provider_with_user() -> (Arc<LocalBackend>, SessionProvider, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::open(":memory:", dir.path(), "").unwrap());
        backend.sign_up("ada@example.com", "secret123", None).await.unwrap();
        let provider = SessionProvider::new(backend.clone());
        (backend, provider, dir)
    }

    #[tokio::test]
    async fn test_starts_loading_then_resolves() {
        let (_backend, provider, _dir) = provider_with_user().await;
        assert!(provider.is_loading());
        assert_eq!(provider.initialize(None).await, SessionState::Unauthenticated);
        assert!(!provider.is_loading());
        assert!(provider.current_user().is_none());
    }

    #[tokio::test]
    async fn test_restores_stored_token() {
        let (backend, provider, _dir) = provider_with_user().await;
        let session = backend.sign_in("ada@example.com", "secret123").await.unwrap();

        let state = provider.initialize(Some(&session.access_token)).await;
        assert_eq!(state, SessionState::Ready(session.clone()));
        assert_eq!(provider.current_user().map(|u| u.id), Some(session.user.id));
    }

    #[tokio::test]
    async fn test_stale_token_is_unauthenticated() {
        let (_backend, provider, _dir) = provider_with_user().await;
        assert_eq!(
            provider.initialize(Some("not-a-token")).await,
            SessionState::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let (backend, provider, _dir) = provider_with_user().await;
        provider.initialize(None).await;

        let err = provider.sign_in("ada@example.com", "wrong-one").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(provider.session().is_none());

        let session = provider.sign_in("ada@example.com", "secret123").await.unwrap();
        assert!(provider.require_session().is_ok());

        provider.sign_out().await;
        assert_eq!(provider.state(), SessionState::Unauthenticated);
        assert!(matches!(provider.require_session(), Err(ForestError::Unauthenticated)));
        assert!(backend.current_user(&session.access_token).await.unwrap().is_none());
    }
}
