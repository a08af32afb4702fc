//! crates/party_content_core/src/service.rs
//!
//! The public surface consumed by game screens: listing, limit checks, creation and
//! deletion of custom content, plus the offline download/clear actions.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::LocalContentCache;
use crate::domain::{ContentId, ContentItem, ContentKind, ContentPayload, SessionState, UserId};
use crate::limits::{ContentLimits, LimitCheckError, LimitGate, LimitStatus};
use crate::merge::merge_content;
use crate::ownership::{can_mutate, owner_filter_for};
use crate::ports::{ContentFilter, KeyValueStore, RemoteContentStore, StoreError};

/// Outcomes a screen must be able to tell apart when a create or delete fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("You have reached the limit of {limit} custom {kind} items ({count} created)")]
    LimitReached {
        kind: ContentKind,
        count: usize,
        limit: usize,
    },
    #[error("A theme named '{name}' already exists")]
    DuplicateName { name: String },
    #[error("You appear to be offline; please try again when connected")]
    Offline,
    #[error("You can only change content you created")]
    NotOwner,
    #[error("That item no longer exists")]
    NotFound,
    #[error("Invalid content: {0}")]
    Invalid(String),
    #[error("Content store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ContentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateName(name) => ContentError::DuplicateName { name },
            StoreError::Unreachable(_) => ContentError::Offline,
            StoreError::PermissionDenied => ContentError::NotOwner,
            StoreError::NotFound(_) => ContentError::NotFound,
            other => ContentError::Store(other),
        }
    }
}

impl From<LimitCheckError> for ContentError {
    fn from(e: LimitCheckError) -> Self {
        match e {
            LimitCheckError::Unreachable => ContentError::Offline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub kind: ContentKind,
    pub basic: usize,
    pub custom: usize,
}

#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn RemoteContentStore>,
    cache: LocalContentCache,
    gate: LimitGate,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn RemoteContentStore>,
        storage: Arc<dyn KeyValueStore>,
        limits: ContentLimits,
    ) -> Self {
        Self {
            gate: LimitGate::new(store.clone(), limits),
            cache: LocalContentCache::new(storage),
            store,
        }
    }

    pub fn cache(&self) -> &LocalContentCache {
        &self.cache
    }

    /// Everything playable for `kind`: cached content first, then whatever only the
    /// remote store has. Falls back to the cache alone when the store is unreachable.
    pub async fn list_available(&self, kind: ContentKind, session: &SessionState) -> Vec<ContentItem> {
        let mut local = self.cache.get_basic(kind).await;
        local.extend(self.cache.get_custom(kind).await);

        if let Err(e) = self.store.probe().await {
            debug!(%kind, error = %e, "Store unreachable; listing cached content only");
            return local;
        }

        match self.fetch_remote(kind, session).await {
            Ok((basic, custom)) => {
                let mut remote = basic;
                remote.extend(custom);
                merge_content(local, remote)
            }
            Err(e) => {
                warn!(%kind, error = %e, "Remote listing failed on a reachable store; using cached content");
                local
            }
        }
    }

    pub async fn check_limit(
        &self,
        kind: ContentKind,
        session: &SessionState,
    ) -> Result<LimitStatus, LimitCheckError> {
        self.gate.check_limit(kind, session).await
    }

    /// Creates a custom item owned by `session`. The limit gate runs first and
    /// short-circuits; themes are additionally checked for a name collision.
    pub async fn create_custom_item(
        &self,
        session: &SessionState,
        payload: ContentPayload,
    ) -> Result<ContentItem, ContentError> {
        payload.validate().map_err(ContentError::Invalid)?;
        let kind = payload.kind();

        let status = self.gate.check_limit(kind, session).await?;
        if !status.can_create {
            info!(%kind, count = status.count, limit = status.limit, "Custom content limit reached");
            return Err(ContentError::LimitReached {
                kind,
                count: status.count,
                limit: status.limit,
            });
        }

        if let (ContentKind::Theme, Some(name)) = (kind, payload.name()) {
            let existing = self.store.query(kind, &ContentFilter::named(name)).await?;
            if !existing.is_empty() {
                return Err(ContentError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }

        let owner = owner_filter_for(session);
        let item = self.store.insert(&payload, owner.owner_tag()).await?;
        info!(%kind, id = %item.id, "Custom content created");
        if item.owner_id.is_none() {
            self.cache.record_created_here(kind, item.id.clone()).await;
        }
        self.cache.upsert_custom(item.clone()).await;
        Ok(item)
    }

    /// Deletes `item` when `session` owns it. No remote call is made otherwise.
    pub async fn delete_custom_item(
        &self,
        session: &SessionState,
        item: &ContentItem,
    ) -> Result<(), ContentError> {
        if !can_mutate(item, session) {
            return Err(ContentError::NotOwner);
        }
        let kind = item.kind();
        match self.store.delete(kind, &item.id, &owner_filter_for(session)).await {
            Ok(()) => info!(%kind, id = %item.id, "Custom content deleted"),
            // Already gone remotely; drop the cached copy so it stops being listed.
            Err(StoreError::NotFound(_)) => {
                info!(%kind, id = %item.id, "Custom content already deleted remotely");
                self.forget_cached(kind, &item.id).await;
                return Err(ContentError::NotFound);
            }
            Err(e) => return Err(e.into()),
        }
        self.forget_cached(kind, &item.id).await;
        Ok(())
    }

    /// Replaces both cache partitions for `kind` with the remote copy.
    pub async fn download_for_offline(
        &self,
        kind: ContentKind,
        session: &SessionState,
    ) -> Result<DownloadSummary, ContentError> {
        let (basic, custom) = self.fetch_remote(kind, session).await?;
        let summary = DownloadSummary {
            kind,
            basic: basic.len(),
            custom: custom.len(),
        };
        self.cache.save_basic(kind, basic).await;
        self.cache.save_custom(kind, custom).await;
        self.cache.record_download(kind, summary.basic, Utc::now()).await;
        info!(%kind, basic = summary.basic, custom = summary.custom, "Content downloaded for offline use");
        Ok(summary)
    }

    pub async fn clear_offline_data(&self) {
        self.cache.clear_all().await;
        info!("Offline content cleared");
    }

    /// Hands the anonymous items created on this device to a freshly signed-in user.
    /// Null-owned rows downloaded from other devices are never claimed.
    pub async fn claim_device_content(
        &self,
        kind: ContentKind,
        user: &UserId,
    ) -> Result<Vec<ContentId>, ContentError> {
        let candidates = self.cache.created_here(kind).await;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let moved = self.store.reassign_owner(kind, &candidates, user).await?;
        self.cache.assign_custom_owner(kind, &moved, user).await;
        self.cache.forget_created_here(kind, &candidates).await;
        info!(%kind, %user, claimed = moved.len(), "Device content claimed");
        Ok(moved)
    }

    async fn forget_cached(&self, kind: ContentKind, id: &ContentId) {
        self.cache.remove_custom(kind, id).await;
        self.cache.forget_created_here(kind, std::slice::from_ref(id)).await;
    }

    async fn fetch_remote(
        &self,
        kind: ContentKind,
        session: &SessionState,
    ) -> Result<(Vec<ContentItem>, Vec<ContentItem>), StoreError> {
        let basic_filter = ContentFilter::basic();
        let custom_filter = ContentFilter::custom_owned_by(owner_filter_for(session));
        futures::future::try_join(
            self.store.query(kind, &basic_filter),
            self.store.query(kind, &custom_filter),
        )
        .await
    }
}
