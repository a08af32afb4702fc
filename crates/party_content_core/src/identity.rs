//! crates/party_content_core/src/identity.rs
//!
//! The identity client. Constructed once at startup and handed to whatever needs
//! the session; state changes are published through a `watch` channel.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::domain::{SessionState, UserId};
use crate::ports::{AuthError, AuthProvider, AuthResult, ConsentFlow, IdentityBackend, IdentityGrant};

pub struct IdentityClient {
    backend: Arc<dyn IdentityBackend>,
    consent: Arc<dyn ConsentFlow>,
    state: watch::Sender<SessionState>,
    /// Serializes transitions so two flows cannot interleave their writes.
    transition: Mutex<()>,
}

impl IdentityClient {
    pub fn new(backend: Arc<dyn IdentityBackend>, consent: Arc<dyn ConsentFlow>) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            backend,
            consent,
            state,
            transition: Mutex::new(()),
        }
    }

    /// The current state. Never blocks.
    pub fn session(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Restores a persisted session or creates an anonymous one. When the backend
    /// refuses anonymous identities the client stays `Unauthenticated` and the
    /// rejection is returned. A failed restore is returned as-is; a stored session
    /// that could not be checked is not replaced by a new identity.
    pub async fn ensure_anonymous_session(&self) -> AuthResult<UserId> {
        let _guard = self.transition.lock().await;
        if let Some(id) = self.session().user_id() {
            return Ok(id.clone());
        }

        match self.backend.restore_session().await {
            Ok(Some(grant)) => {
                info!(user_id = %grant.user_id, anonymous = grant.is_anonymous, "Restored session");
                return Ok(self.apply(grant));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Failed to restore session; continuing unauthenticated");
                return Err(e);
            }
        }

        if !self.backend.supports_anonymous() {
            warn!("Anonymous sessions are not supported; continuing unauthenticated");
            return Err(AuthError::ProviderRejected(
                "anonymous sessions are not supported".to_string(),
            ));
        }

        let grant = self.backend.create_anonymous().await.map_err(|e| {
            warn!(error = %e, "Anonymous session creation failed; continuing unauthenticated");
            e
        })?;
        info!(user_id = %grant.user_id, "Anonymous session created");
        Ok(self.apply(grant))
    }

    /// Runs the external consent flow for `provider` and, on success, moves to
    /// `Authenticated`. Cancellation and failures leave the state unchanged.
    pub async fn sign_in(&self, provider: AuthProvider) -> AuthResult<UserId> {
        let _guard = self.transition.lock().await;
        let url = self.backend.authorization_url(provider).await?;
        let callback = self.consent.run(&url).await.map_err(|e| {
            if e == AuthError::Cancelled {
                info!(provider = provider.as_str(), "Sign-in cancelled by user");
            }
            e
        })?;
        let grant = self.backend.exchange(&callback).await?;
        if grant.is_anonymous {
            return Err(AuthError::ProviderRejected(
                "sign-in returned an anonymous identity".to_string(),
            ));
        }
        info!(user_id = %grant.user_id, provider = provider.as_str(), "Signed in");
        Ok(self.apply(grant))
    }

    /// Clears the session, then immediately starts a fresh anonymous one when the
    /// backend supports it.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let _guard = self.transition.lock().await;
        self.backend.sign_out().await?;

        if self.backend.supports_anonymous() {
            match self.backend.create_anonymous().await {
                Ok(grant) => {
                    info!(user_id = %grant.user_id, "Signed out; new anonymous session");
                    self.apply(grant);
                    return Ok(());
                }
                Err(e) => warn!(error = %e, "Could not start an anonymous session after sign-out"),
            }
        }
        info!("Signed out");
        self.state.send_replace(SessionState::Unauthenticated);
        Ok(())
    }

    fn apply(&self, grant: IdentityGrant) -> UserId {
        let id = grant.user_id;
        let next = if grant.is_anonymous {
            SessionState::Anonymous(id.clone())
        } else {
            SessionState::Authenticated(id.clone())
        };
        self.state.send_replace(next);
        id
    }
}
