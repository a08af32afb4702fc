//! crates/party_content_core/src/limits.rs
//!
//! The per-kind quota on custom content.

use std::sync::Arc;
use tracing::warn;

use crate::domain::{ContentKind, SessionState};
use crate::ownership::owner_filter_for;
use crate::ports::{ContentFilter, RemoteContentStore};

pub const DEFAULT_CUSTOM_LIMIT: usize = 10;

/// Quota per content kind. Anonymous and authenticated sessions currently share it;
/// authentication only changes the scoping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    pub theme: usize,
    pub pair: usize,
    pub question_set: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            theme: DEFAULT_CUSTOM_LIMIT,
            pair: DEFAULT_CUSTOM_LIMIT,
            question_set: DEFAULT_CUSTOM_LIMIT,
        }
    }
}

impl ContentLimits {
    pub fn for_kind(&self, kind: ContentKind, _session: &SessionState) -> usize {
        match kind {
            ContentKind::Theme => self.theme,
            ContentKind::Pair => self.pair,
            ContentKind::QuestionSet => self.question_set,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitStatus {
    pub count: usize,
    pub limit: usize,
    pub can_create: bool,
}

impl LimitStatus {
    pub fn new(count: usize, limit: usize) -> Self {
        Self {
            count,
            limit,
            can_create: count < limit,
        }
    }
}

/// The count could not be obtained, so creation is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LimitCheckError {
    #[error("Cannot check the content limit while the store is unreachable")]
    Unreachable,
}

#[derive(Clone)]
pub struct LimitGate {
    store: Arc<dyn RemoteContentStore>,
    limits: ContentLimits,
}

impl LimitGate {
    pub fn new(store: Arc<dyn RemoteContentStore>, limits: ContentLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> ContentLimits {
        self.limits
    }

    /// Counts the session's custom items of `kind` against the quota. Any store
    /// failure fails closed.
    pub async fn check_limit(
        &self,
        kind: ContentKind,
        session: &SessionState,
    ) -> Result<LimitStatus, LimitCheckError> {
        let filter = ContentFilter::custom_owned_by(owner_filter_for(session));
        let count = self.store.count(kind, &filter).await.map_err(|e| {
            warn!(%kind, error = %e, "Limit check failed; refusing creation");
            LimitCheckError::Unreachable
        })?;
        Ok(LimitStatus::new(count, self.limits.for_kind(kind, session)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::memory::MemoryContentStore;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn can_create_is_count_below_limit(count in 0usize..1000, limit in 0usize..1000) {
            let status = LimitStatus::new(count, limit);
            prop_assert_eq!(status.can_create, count < limit);
        }
    }

    #[tokio::test]
    async fn unreachable_store_fails_closed() {
        let store = Arc::new(MemoryContentStore::new());
        store.set_reachable(false);
        let gate = LimitGate::new(store, ContentLimits::default());

        let result = gate
            .check_limit(ContentKind::Theme, &SessionState::Anonymous(UserId::new("x")))
            .await;
        assert_eq!(result, Err(LimitCheckError::Unreachable));
    }

    #[tokio::test]
    async fn counts_only_items_in_scope() {
        let store = Arc::new(MemoryContentStore::new());
        let alice = UserId::new("alice");
        for i in 0..3 {
            store.seed_custom(
                crate::domain::ContentPayload::Pair {
                    left: format!("L{i}"),
                    right: format!("R{i}"),
                },
                Some(alice.clone()),
            );
        }
        store.seed_custom(
            crate::domain::ContentPayload::Pair {
                left: "Up".to_string(),
                right: "Down".to_string(),
            },
            None,
        );
        let limits = ContentLimits { pair: 3, ..ContentLimits::default() };
        let gate = LimitGate::new(store, limits);

        let status = gate
            .check_limit(ContentKind::Pair, &SessionState::Authenticated(alice))
            .await
            .expect("limit check");
        assert_eq!(status, LimitStatus { count: 3, limit: 3, can_create: false });

        let anonymous = gate
            .check_limit(ContentKind::Pair, &SessionState::Unauthenticated)
            .await
            .expect("limit check");
        assert_eq!(anonymous.count, 1);
        assert!(anonymous.can_create);
    }
}
