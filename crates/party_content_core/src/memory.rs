//! crates/party_content_core/src/memory.rs
//!
//! In-process implementations of the ports.
//!
//! `MemoryKeyValueStore` and `MemoryContentStore` back tests and local tooling.
//! `NullIdentityBackend` and `DeclinedConsent` are the null-object defaults used
//! when no identity provider is configured: every check degrades to the
//! null-owner path.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{ContentId, ContentItem, ContentKind, ContentPayload, UserId};
use crate::ownership::OwnerFilter;
use crate::ports::{
    AuthError, AuthProvider, AuthResult, ConsentCallback, ConsentFlow, ContentFilter,
    IdentityBackend, IdentityGrant, KeyValueStore, RemoteContentStore, StorageError, StoreError,
    StoreResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//=========================================================================================
// Key-value storage
//=========================================================================================

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

//=========================================================================================
// Remote content store
//=========================================================================================

/// A content store held in memory, with the same ownership and name-uniqueness
/// rules the hosted database enforces.
pub struct MemoryContentStore {
    items: Mutex<Vec<ContentItem>>,
    reachable: AtomicBool,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
            inserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of `insert` calls that reached the store.
    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls that reached the store.
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn seed_basic(&self, payload: ContentPayload) -> ContentItem {
        self.push(payload, false, None)
    }

    pub fn seed_custom(&self, payload: ContentPayload, owner: Option<UserId>) -> ContentItem {
        self.push(payload, true, owner)
    }

    pub fn items(&self) -> Vec<ContentItem> {
        lock(&self.items).clone()
    }

    fn push(&self, payload: ContentPayload, is_custom: bool, owner_id: Option<UserId>) -> ContentItem {
        let item = ContentItem {
            id: ContentId::new(Uuid::new_v4().to_string()),
            is_custom,
            owner_id,
            payload,
            created_at: Utc::now(),
        };
        lock(&self.items).push(item.clone());
        item
    }

    fn ensure_reachable(&self) -> StoreResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unreachable("memory store switched off".to_string()))
        }
    }
}

#[async_trait]
impl RemoteContentStore for MemoryContentStore {
    async fn probe(&self) -> StoreResult<()> {
        self.ensure_reachable()
    }

    async fn query(&self, kind: ContentKind, filter: &ContentFilter) -> StoreResult<Vec<ContentItem>> {
        self.ensure_reachable()?;
        Ok(lock(&self.items)
            .iter()
            .filter(|item| item.kind() == kind && filter.matches(item))
            .cloned()
            .collect())
    }

    async fn count(&self, kind: ContentKind, filter: &ContentFilter) -> StoreResult<usize> {
        self.ensure_reachable()?;
        Ok(lock(&self.items)
            .iter()
            .filter(|item| item.kind() == kind && filter.matches(item))
            .count())
    }

    async fn insert(&self, payload: &ContentPayload, owner: Option<&UserId>) -> StoreResult<ContentItem> {
        self.ensure_reachable()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if let (ContentKind::Theme, Some(name)) = (payload.kind(), payload.name()) {
            let taken = lock(&self.items)
                .iter()
                .any(|item| item.kind() == ContentKind::Theme && item.payload.name() == Some(name));
            if taken {
                return Err(StoreError::DuplicateName(name.to_string()));
            }
        }
        Ok(self.push(payload.clone(), true, owner.cloned()))
    }

    async fn delete(&self, kind: ContentKind, id: &ContentId, owner: &OwnerFilter) -> StoreResult<()> {
        self.ensure_reachable()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut items = lock(&self.items);
        let position = items
            .iter()
            .position(|item| &item.id == id && item.kind() == kind)
            .ok_or_else(|| StoreError::NotFound(format!("{kind} {id}")))?;
        let item = &items[position];
        if !item.is_custom || !owner.matches(item.owner_id.as_ref()) {
            return Err(StoreError::PermissionDenied);
        }
        items.remove(position);
        Ok(())
    }

    async fn reassign_owner(
        &self,
        kind: ContentKind,
        ids: &[ContentId],
        new_owner: &UserId,
    ) -> StoreResult<Vec<ContentId>> {
        self.ensure_reachable()?;
        let mut moved = Vec::new();
        for item in lock(&self.items).iter_mut() {
            if item.kind() == kind && item.is_custom && item.owner_id.is_none() && ids.contains(&item.id) {
                item.owner_id = Some(new_owner.clone());
                moved.push(item.id.clone());
            }
        }
        Ok(moved)
    }
}

//=========================================================================================
// Null identity defaults
//=========================================================================================

/// An identity backend that offers no identities at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIdentityBackend;

#[async_trait]
impl IdentityBackend for NullIdentityBackend {
    fn supports_anonymous(&self) -> bool {
        false
    }

    async fn restore_session(&self) -> AuthResult<Option<IdentityGrant>> {
        Ok(None)
    }

    async fn create_anonymous(&self) -> AuthResult<IdentityGrant> {
        Err(AuthError::ProviderRejected("no identity provider configured".to_string()))
    }

    async fn authorization_url(&self, provider: AuthProvider) -> AuthResult<String> {
        Err(AuthError::ProviderRejected(format!(
            "sign-in with {} is not available",
            provider.as_str()
        )))
    }

    async fn exchange(&self, _callback: &ConsentCallback) -> AuthResult<IdentityGrant> {
        Err(AuthError::ProviderRejected("no identity provider configured".to_string()))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        Ok(())
    }
}

/// A consent flow the user always dismisses.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclinedConsent;

#[async_trait]
impl ConsentFlow for DeclinedConsent {
    async fn run(&self, _authorization_url: &str) -> AuthResult<ConsentCallback> {
        Err(AuthError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme(name: &str) -> ContentPayload {
        ContentPayload::Theme {
            name: name.to_string(),
            words: vec!["word".to_string()],
        }
    }

    #[tokio::test]
    async fn delete_reapplies_owner_filter() {
        let store = MemoryContentStore::new();
        let bob = UserId::new("bob");
        let item = store.seed_custom(theme("Bob's"), Some(bob.clone()));

        let denied = store
            .delete(ContentKind::Theme, &item.id, &OwnerFilter::MatchesUser(UserId::new("alice")))
            .await;
        assert_eq!(denied, Err(StoreError::PermissionDenied));

        store
            .delete(ContentKind::Theme, &item.id, &OwnerFilter::MatchesUser(bob))
            .await
            .expect("owner can delete");
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn built_in_rows_cannot_be_deleted() {
        let store = MemoryContentStore::new();
        let item = store.seed_basic(theme("Food"));
        let denied = store.delete(ContentKind::Theme, &item.id, &OwnerFilter::MatchesNull).await;
        assert_eq!(denied, Err(StoreError::PermissionDenied));
    }

    #[tokio::test]
    async fn theme_names_are_unique_at_insert() {
        let store = MemoryContentStore::new();
        store.insert(&theme("Animals"), None).await.expect("first insert");
        let second = store.insert(&theme("Animals"), Some(&UserId::new("a"))).await;
        assert_eq!(second, Err(StoreError::DuplicateName("Animals".to_string())));
    }

    #[tokio::test]
    async fn reassign_only_moves_null_owned_rows() {
        let store = MemoryContentStore::new();
        let mine = store.seed_custom(theme("Mine"), None);
        let theirs = store.seed_custom(theme("Theirs"), Some(UserId::new("b")));
        let moved = store
            .reassign_owner(
                ContentKind::Theme,
                &[mine.id.clone(), theirs.id.clone()],
                &UserId::new("a"),
            )
            .await
            .expect("reassign");
        assert_eq!(moved, vec![mine.id]);
    }

    #[tokio::test]
    async fn null_backend_rejects_anonymous_sessions() {
        let backend = NullIdentityBackend;
        assert!(!backend.supports_anonymous());
        assert!(matches!(
            backend.create_anonymous().await,
            Err(AuthError::ProviderRejected(_))
        ));
    }
}
