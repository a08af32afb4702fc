//! services/content_sync/src/bin/content_sync.rs
//!
//! Startup driver: establishes a session and downloads every content kind for
//! offline play, then reports what the device can show.

use content_sync_lib::{
    adapters::{FileKeyValueStore, IdentitySettings, PgContentStore, PgIdentityBackend, TerminalConsentFlow},
    config::Config,
    error::SyncError,
};
use party_content_core::{ContentKind, ContentService, IdentityClient, KeyValueStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting content sync...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgContentStore::new(db_pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Adapters ---
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(config.cache_dir.clone()));
    let identity_backend = Arc::new(PgIdentityBackend::new(
        db_pool,
        storage.clone(),
        IdentitySettings {
            auth_base_url: config.auth_base_url.clone(),
            redirect_url: config.auth_redirect_url.clone(),
            allow_anonymous: config.allow_anonymous,
        },
    ));
    let identity = IdentityClient::new(identity_backend, Arc::new(TerminalConsentFlow::new()));
    let content = ContentService::new(store, storage, config.limits);

    // --- 4. Establish a Session ---
    if let Err(e) = identity.ensure_anonymous_session().await {
        warn!("Continuing without a session: {}", e);
    }
    let session = identity.session();
    info!(?session, "Session ready");

    // --- 5. Download Content for Offline Use ---
    for kind in ContentKind::ALL {
        match content.download_for_offline(kind, &session).await {
            Ok(summary) => info!(
                %kind,
                basic = summary.basic,
                custom = summary.custom,
                "Downloaded"
            ),
            Err(e) => warn!(%kind, "Download skipped: {}", e),
        }

        let available = content.list_available(kind, &session).await;
        match content.check_limit(kind, &session).await {
            Ok(status) => info!(
                %kind,
                available = available.len(),
                custom = status.count,
                limit = status.limit,
                can_create = status.can_create,
                "Content available"
            ),
            Err(e) => info!(%kind, available = available.len(), "Content available; {}", e),
        }
    }

    info!(cache_dir = %config.cache_dir.display(), "Content sync finished");
    Ok(())
}
