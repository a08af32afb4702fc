//! crates/party_content_core/src/ports.rs
//!
//! Defines the service contracts (traits) the content core consumes.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the hosted backend, the identity provider and the device's
//! persistent storage.

use async_trait::async_trait;

use crate::domain::{ContentId, ContentItem, ContentKind, ContentPayload, UserId};
use crate::ownership::OwnerFilter;

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// Errors from the identity provider. All of them are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Sign-in was cancelled")]
    Cancelled,
    #[error("The identity provider rejected the request: {0}")]
    ProviderRejected(String),
    #[error("The identity provider is unreachable: {0}")]
    NetworkUnavailable(String),
}

/// Errors from the remote content store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The ownership filter excluded the row.
    #[error("Permission denied")]
    PermissionDenied,
    #[error("A theme named '{0}' already exists")]
    DuplicateName(String),
    #[error("The content store is unreachable: {0}")]
    Unreachable(String),
    #[error("An unexpected store error occurred: {0}")]
    Unknown(String),
}

/// A failure of the device's key-value storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Local storage failure: {0}")]
pub struct StorageError(pub String);

pub type AuthResult<T> = Result<T, AuthError>;
pub type StoreResult<T> = Result<T, StoreError>;

//=========================================================================================
// Query Filters
//=========================================================================================

/// Equality/null filters applied to a content query. `None` fields are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub is_custom: Option<bool>,
    pub owner: Option<OwnerFilter>,
    /// Exact match against the payload name.
    pub name: Option<String>,
}

impl ContentFilter {
    pub fn basic() -> Self {
        Self {
            is_custom: Some(false),
            ..Self::default()
        }
    }

    pub fn custom_owned_by(owner: OwnerFilter) -> Self {
        Self {
            is_custom: Some(true),
            owner: Some(owner),
            name: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, item: &ContentItem) -> bool {
        if self.is_custom.is_some_and(|custom| custom != item.is_custom) {
            return false;
        }
        if let Some(owner) = &self.owner {
            if !owner.matches(item.owner_id.as_ref()) {
                return false;
            }
        }
        match &self.name {
            Some(name) => item.payload.name() == Some(name.as_str()),
            None => true,
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait RemoteContentStore: Send + Sync {
    /// A lightweight query used only to decide whether the store is reachable.
    async fn probe(&self) -> StoreResult<()>;

    async fn query(&self, kind: ContentKind, filter: &ContentFilter) -> StoreResult<Vec<ContentItem>>;

    /// Count-only variant of `query`.
    async fn count(&self, kind: ContentKind, filter: &ContentFilter) -> StoreResult<usize>;

    /// Inserts a custom item. The store assigns `id` and `created_at`; the returned
    /// item is authoritative. A name collision surfaces as `StoreError::DuplicateName`.
    async fn insert(&self, payload: &ContentPayload, owner: Option<&UserId>) -> StoreResult<ContentItem>;

    /// Deletes a custom item. The store re-applies `owner` itself and answers
    /// `PermissionDenied` when the row exists but the filter excludes it.
    async fn delete(&self, kind: ContentKind, id: &ContentId, owner: &OwnerFilter) -> StoreResult<()>;

    /// Moves null-owned custom items to `new_owner`. Rows already owned by someone
    /// are left alone. Returns the ids actually moved.
    async fn reassign_owner(
        &self,
        kind: ContentKind,
        ids: &[ContentId],
        new_owner: &UserId,
    ) -> StoreResult<Vec<ContentId>>;
}

/// String key → string value storage on the device.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProvider {
    Google,
    Apple,
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
            AuthProvider::Apple => "apple",
        }
    }
}

/// What the identity service hands back for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityGrant {
    pub user_id: UserId,
    pub is_anonymous: bool,
}

/// The callback delivered when the external consent flow completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentCallback {
    pub callback_url: String,
    pub token: String,
}

#[async_trait]
pub trait IdentityBackend: Send + Sync {
    fn supports_anonymous(&self) -> bool;

    /// Returns a previously persisted session, if any.
    async fn restore_session(&self) -> AuthResult<Option<IdentityGrant>>;

    async fn create_anonymous(&self) -> AuthResult<IdentityGrant>;

    async fn authorization_url(&self, provider: AuthProvider) -> AuthResult<String>;

    async fn exchange(&self, callback: &ConsentCallback) -> AuthResult<IdentityGrant>;

    async fn sign_out(&self) -> AuthResult<()>;
}

/// The web-based consent handshake. Dismissal by the user is `AuthError::Cancelled`.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn run(&self, authorization_url: &str) -> AuthResult<ConsentCallback>;
}
