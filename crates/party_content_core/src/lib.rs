pub mod cache;
pub mod domain;
pub mod identity;
pub mod limits;
pub mod memory;
pub mod merge;
pub mod ownership;
pub mod ports;
pub mod service;

pub use cache::LocalContentCache;
pub use domain::{
    CacheEntry, ContentId, ContentItem, ContentKind, ContentPayload, DownloadRecord,
    DownloadStatus, QuestionPair, SessionState, UserId,
};
pub use identity::IdentityClient;
pub use limits::{ContentLimits, LimitCheckError, LimitGate, LimitStatus, DEFAULT_CUSTOM_LIMIT};
pub use merge::merge_content;
pub use ownership::{can_mutate, owner_filter_for, OwnerFilter};
pub use ports::{
    AuthError, AuthProvider, AuthResult, ConsentCallback, ConsentFlow, ContentFilter,
    IdentityBackend, IdentityGrant, KeyValueStore, RemoteContentStore, StorageError, StoreError,
    StoreResult,
};
pub use service::{ContentError, ContentService, DownloadSummary};
