use async_trait::async_trait;
use party_content_core::memory::MemoryContentStore;
use party_content_core::{
    ContentFilter, ContentId, ContentItem, ContentKind, ContentPayload, OwnerFilter,
    RemoteContentStore, StoreError, StoreResult, UserId,
};

pub fn theme(name: &str) -> ContentPayload {
    ContentPayload::Theme {
        name: name.to_string(),
        words: vec!["lion".to_string(), "tiger".to_string(), "bear".to_string()],
    }
}

/// Wraps a `MemoryContentStore` and makes chosen calls misbehave the way a hosted
/// database can: stale name lookups, row-level policies, queries failing while
/// the service still answers its reachability check.
#[derive(Default)]
pub struct ScriptedStore {
    pub inner: MemoryContentStore,
    hide_names: bool,
    deny_deletes: bool,
    fail_queries: bool,
}

impl ScriptedStore {
    pub fn new(inner: MemoryContentStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Name lookups come back empty, as from a lagging replica. Inserts still
    /// hit the uniqueness rule of the wrapped store.
    pub fn hiding_names(mut self) -> Self {
        self.hide_names = true;
        self
    }

    /// Every delete is refused server-side.
    pub fn denying_deletes(mut self) -> Self {
        self.deny_deletes = true;
        self
    }

    /// Listing queries fail while the reachability check keeps succeeding.
    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }
}

#[async_trait]
impl RemoteContentStore for ScriptedStore {
    async fn probe(&self) -> StoreResult<()> {
        self.inner.probe().await
    }

    async fn query(&self, kind: ContentKind, filter: &ContentFilter) -> StoreResult<Vec<ContentItem>> {
        if self.fail_queries {
            return Err(StoreError::Unknown("statement timeout".to_string()));
        }
        if self.hide_names && filter.name.is_some() {
            return Ok(Vec::new());
        }
        self.inner.query(kind, filter).await
    }

    async fn count(&self, kind: ContentKind, filter: &ContentFilter) -> StoreResult<usize> {
        self.inner.count(kind, filter).await
    }

    async fn insert(&self, payload: &ContentPayload, owner: Option<&UserId>) -> StoreResult<ContentItem> {
        self.inner.insert(payload, owner).await
    }

    async fn delete(&self, kind: ContentKind, id: &ContentId, owner: &OwnerFilter) -> StoreResult<()> {
        if self.deny_deletes {
            return Err(StoreError::PermissionDenied);
        }
        self.inner.delete(kind, id, owner).await
    }

    async fn reassign_owner(
        &self,
        kind: ContentKind,
        ids: &[ContentId],
        new_owner: &UserId,
    ) -> StoreResult<Vec<ContentId>> {
        self.inner.reassign_owner(kind, ids, new_owner).await
    }
}
