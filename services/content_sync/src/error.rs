//! services/content_sync/src/error.rs
//!
//! Defines the primary error type for the content sync service.

use crate::config::ConfigError;
use party_content_core::ports::AuthError;
use party_content_core::service::ContentError;

/// The primary error type for the `content_sync` service.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the identity provider.
    #[error("Identity error: {0}")]
    Auth(#[from] AuthError),

    /// Represents a failed content operation.
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
