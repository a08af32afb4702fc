//! crates/party_content_core/src/cache.rs
//!
//! The on-device copy of downloaded content.
//!
//! Content lives in one key per `(kind, basic|custom)` partition, each holding the
//! whole partition as JSON, so every write replaces a partition wholesale. Storage
//! failures never reach the caller: reads degrade to empty and writes to no-ops,
//! with a warning logged.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

use crate::domain::{
    CacheEntry, ContentId, ContentItem, ContentKind, DownloadRecord, DownloadStatus, UserId,
};
use crate::ports::{KeyValueStore, StorageError};

const KEY_PREFIX: &str = "party_content";
const DOWNLOAD_STATUS_KEY: &str = "party_content:download_status";

#[derive(Debug, thiserror::Error)]
enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Partition {
    Basic,
    Custom,
}

impl Partition {
    fn as_str(self) -> &'static str {
        match self {
            Partition::Basic => "basic",
            Partition::Custom => "custom",
        }
    }
}

fn partition_key(kind: ContentKind, partition: Partition) -> String {
    format!("{KEY_PREFIX}:{}:{}", kind.as_str(), partition.as_str())
}

/// Ids of anonymous items created on this device, kept apart from the custom
/// partition which also holds other devices' null-owned rows after a download.
fn created_here_key(kind: ContentKind) -> String {
    format!("{KEY_PREFIX}:{}:created_here", kind.as_str())
}

#[derive(Clone)]
pub struct LocalContentCache {
    storage: Arc<dyn KeyValueStore>,
}

impl LocalContentCache {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub async fn save_basic(&self, kind: ContentKind, items: Vec<ContentItem>) {
        self.write_partition(kind, Partition::Basic, items, Utc::now()).await;
    }

    pub async fn save_custom(&self, kind: ContentKind, items: Vec<ContentItem>) {
        self.write_partition(kind, Partition::Custom, items, Utc::now()).await;
    }

    pub async fn get_basic(&self, kind: ContentKind) -> Vec<ContentItem> {
        self.read_items(kind, Partition::Basic).await
    }

    pub async fn get_custom(&self, kind: ContentKind) -> Vec<ContentItem> {
        self.read_items(kind, Partition::Custom).await
    }

    /// Cached custom entries with their download timestamps.
    pub async fn custom_entries(&self, kind: ContentKind) -> Vec<CacheEntry> {
        self.read_entries(kind, Partition::Custom).await
    }

    /// Adds or replaces a single custom item, keeping the rest of the partition.
    pub async fn upsert_custom(&self, item: ContentItem) {
        let kind = item.kind();
        let mut entries = self.read_entries(kind, Partition::Custom).await;
        let entry = CacheEntry {
            item,
            downloaded_at: Utc::now(),
        };
        match entries.iter_mut().find(|e| e.item.id == entry.item.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        self.write_entries(kind, Partition::Custom, &entries).await;
    }

    pub async fn remove_custom(&self, kind: ContentKind, id: &ContentId) {
        let mut entries = self.read_entries(kind, Partition::Custom).await;
        let before = entries.len();
        entries.retain(|e| &e.item.id != id);
        if entries.len() != before {
            self.write_entries(kind, Partition::Custom, &entries).await;
        }
    }

    /// Rewrites the owner of the listed custom items.
    pub async fn assign_custom_owner(&self, kind: ContentKind, ids: &[ContentId], owner: &UserId) {
        let mut entries = self.read_entries(kind, Partition::Custom).await;
        let mut changed = false;
        for entry in entries.iter_mut().filter(|e| ids.contains(&e.item.id)) {
            entry.item.owner_id = Some(owner.clone());
            changed = true;
        }
        if changed {
            self.write_entries(kind, Partition::Custom, &entries).await;
        }
    }

    pub async fn created_here(&self, kind: ContentKind) -> Vec<ContentId> {
        let key = created_here_key(kind);
        match self.read_json::<Vec<ContentId>>(&key).await {
            Ok(ids) => ids.unwrap_or_default(),
            Err(e) => {
                warn!(%key, error = %e, "Failed to read locally created ids; treating as empty");
                Vec::new()
            }
        }
    }

    pub async fn record_created_here(&self, kind: ContentKind, id: ContentId) {
        let mut ids = self.created_here(kind).await;
        if ids.contains(&id) {
            return;
        }
        ids.push(id);
        self.write_created_here(kind, &ids).await;
    }

    pub async fn forget_created_here(&self, kind: ContentKind, forget: &[ContentId]) {
        let mut ids = self.created_here(kind).await;
        let before = ids.len();
        ids.retain(|id| !forget.contains(id));
        if ids.len() != before {
            self.write_created_here(kind, &ids).await;
        }
    }

    pub async fn download_status(&self) -> DownloadStatus {
        match self.read_json::<DownloadStatus>(DOWNLOAD_STATUS_KEY).await {
            Ok(status) => status.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to read download status; treating as empty");
                DownloadStatus::default()
            }
        }
    }

    pub async fn record_download(&self, kind: ContentKind, item_count: usize, at: DateTime<Utc>) {
        let mut status = self.download_status().await;
        status.kinds.insert(
            kind,
            DownloadRecord {
                completed: true,
                downloaded_at: at,
                item_count,
            },
        );
        if let Err(e) = self.write_json(DOWNLOAD_STATUS_KEY, &status).await {
            warn!(%kind, error = %e, "Failed to record download status");
        }
    }

    /// Wipes every partition and the download-status record.
    pub async fn clear_all(&self) {
        let mut keys: Vec<String> = ContentKind::ALL
            .into_iter()
            .flat_map(|kind| {
                [
                    partition_key(kind, Partition::Basic),
                    partition_key(kind, Partition::Custom),
                    created_here_key(kind),
                ]
            })
            .collect();
        keys.push(DOWNLOAD_STATUS_KEY.to_string());

        for key in keys {
            if let Err(e) = self.storage.remove(&key).await {
                warn!(%key, error = %e, "Failed to clear cache key");
            }
        }
    }

    async fn write_created_here(&self, kind: ContentKind, ids: &[ContentId]) {
        let key = created_here_key(kind);
        if let Err(e) = self.write_json(&key, &ids).await {
            warn!(%key, error = %e, "Failed to write locally created ids; skipping");
        }
    }

    async fn read_items(&self, kind: ContentKind, partition: Partition) -> Vec<ContentItem> {
        self.read_entries(kind, partition)
            .await
            .into_iter()
            .map(|e| e.item)
            .collect()
    }

    async fn read_entries(&self, kind: ContentKind, partition: Partition) -> Vec<CacheEntry> {
        let key = partition_key(kind, partition);
        match self.read_json::<Vec<CacheEntry>>(&key).await {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                warn!(%key, error = %e, "Failed to read cached content; treating as empty");
                Vec::new()
            }
        }
    }

    async fn write_partition(
        &self,
        kind: ContentKind,
        partition: Partition,
        items: Vec<ContentItem>,
        downloaded_at: DateTime<Utc>,
    ) {
        let entries: Vec<CacheEntry> = items
            .into_iter()
            .map(|item| CacheEntry { item, downloaded_at })
            .collect();
        self.write_entries(kind, partition, &entries).await;
    }

    async fn write_entries(&self, kind: ContentKind, partition: Partition, entries: &[CacheEntry]) {
        let key = partition_key(kind, partition);
        if let Err(e) = self.write_json(&key, &entries).await {
            warn!(%key, error = %e, "Failed to write cached content; skipping");
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.storage.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write_json<T: serde::Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.storage.set(key, &raw).await?;
        Ok(())
    }
}
