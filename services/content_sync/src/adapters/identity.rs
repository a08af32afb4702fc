//! services/content_sync/src/adapters/identity.rs
//!
//! The identity backend over the hosted database. Anonymous identities are rows in
//! `users` with `is_anonymous = true`; every session, anonymous or not, is an
//! `auth_sessions` row whose id is the bearer token. The token of the current
//! session is kept in device storage so it survives restarts.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use party_content_core::domain::UserId;
use party_content_core::ports::{
    AuthError, AuthProvider, AuthResult, ConsentCallback, IdentityBackend, IdentityGrant,
    KeyValueStore,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const SESSION_KEY: &str = "party_content:session";
const SESSION_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct IdentitySettings {
    pub auth_base_url: String,
    pub redirect_url: String,
    pub allow_anonymous: bool,
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

#[derive(FromRow)]
struct SessionRecord {
    user_id: Uuid,
    is_anonymous: bool,
}

impl SessionRecord {
    fn to_grant(self) -> IdentityGrant {
        IdentityGrant {
            user_id: UserId::new(self.user_id.to_string()),
            is_anonymous: self.is_anonymous,
        }
    }
}

/// An identity backend that implements the `IdentityBackend` port.
#[derive(Clone)]
pub struct PgIdentityBackend {
    pool: PgPool,
    storage: Arc<dyn KeyValueStore>,
    settings: IdentitySettings,
}

impl PgIdentityBackend {
    pub fn new(pool: PgPool, storage: Arc<dyn KeyValueStore>, settings: IdentitySettings) -> Self {
        Self {
            pool,
            storage,
            settings,
        }
    }

    async fn stored_token(&self) -> Option<String> {
        match self.storage.get(SESSION_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<StoredSession>(&raw) {
                Ok(stored) => Some(stored.token),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable stored session");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session");
                None
            }
        }
    }

    async fn store_token(&self, token: &str) {
        let stored = StoredSession {
            token: token.to_string(),
        };
        let raw = match serde_json::to_string(&stored) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to encode session");
                return;
            }
        };
        if let Err(e) = self.storage.set(SESSION_KEY, &raw).await {
            warn!(error = %e, "Failed to persist session; it will not survive a restart");
        }
    }

    async fn forget_token(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY).await {
            warn!(error = %e, "Failed to remove stored session");
        }
    }

    async fn lookup(&self, token: &str) -> AuthResult<Option<IdentityGrant>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT s.user_id, u.is_anonymous FROM auth_sessions s \
             JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(record.map(SessionRecord::to_grant))
    }
}

fn map_sqlx_error(e: sqlx::Error) -> AuthError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => AuthError::NetworkUnavailable(e.to_string()),
        _ => AuthError::ProviderRejected(e.to_string()),
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

pub(crate) fn authorization_url(settings: &IdentitySettings, provider: AuthProvider) -> String {
    format!(
        "{}/authorize?provider={}&redirect_to={}",
        settings.auth_base_url.trim_end_matches('/'),
        provider.as_str(),
        encode_component(&settings.redirect_url)
    )
}

//=========================================================================================
// `IdentityBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityBackend for PgIdentityBackend {
    fn supports_anonymous(&self) -> bool {
        self.settings.allow_anonymous
    }

    async fn restore_session(&self) -> AuthResult<Option<IdentityGrant>> {
        let Some(token) = self.stored_token().await else {
            return Ok(None);
        };
        let grant = self.lookup(&token).await?;
        if grant.is_none() {
            debug!("Stored session expired or revoked");
            self.forget_token().await;
        }
        Ok(grant)
    }

    async fn create_anonymous(&self) -> AuthResult<IdentityGrant> {
        if !self.settings.allow_anonymous {
            return Err(AuthError::ProviderRejected(
                "anonymous sessions are disabled".to_string(),
            ));
        }
        let user_id = Uuid::new_v4();
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::days(SESSION_DAYS);

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("INSERT INTO users (user_id, is_anonymous) VALUES ($1, TRUE)")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        self.store_token(&token).await;
        Ok(IdentityGrant {
            user_id: UserId::new(user_id.to_string()),
            is_anonymous: true,
        })
    }

    async fn authorization_url(&self, provider: AuthProvider) -> AuthResult<String> {
        Ok(authorization_url(&self.settings, provider))
    }

    /// The identity service writes the `auth_sessions` row once consent completes;
    /// the callback token is that row's id.
    async fn exchange(&self, callback: &ConsentCallback) -> AuthResult<IdentityGrant> {
        let grant = self.lookup(&callback.token).await?.ok_or_else(|| {
            AuthError::ProviderRejected("invalid or expired sign-in token".to_string())
        })?;
        self.store_token(&callback.token).await;
        Ok(grant)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(token) = self.stored_token().await {
            sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
                .bind(&token)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        self.forget_token().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_encodes_redirect() {
        let settings = IdentitySettings {
            auth_base_url: "https://id.example.com/".to_string(),
            redirect_url: "partygames://auth-callback".to_string(),
            allow_anonymous: true,
        };
        assert_eq!(
            authorization_url(&settings, AuthProvider::Apple),
            "https://id.example.com/authorize?provider=apple&redirect_to=partygames%3A%2F%2Fauth-callback"
        );
    }

    #[test]
    fn connection_loss_is_network_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            AuthError::NetworkUnavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            AuthError::ProviderRejected(_)
        ));
    }
}
