//! guildwarden - moderation state store
//!
//! Connects the configured backend, prepares the store (guild mirror,
//! temporary action expiry, curse word list) and keeps it running until
//! interrupted.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use guildwarden::config::{Config, JsonSettings, StoreBackendKind};
use guildwarden::database::{Database, MemoryBackend, MongoBackend};
use guildwarden::{ModerationStore, StoreBackend, StoreOptions};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("guildwarden=info,mongodb=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting guildwarden...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Store backend: {:?}", config.backend);

    let backend: Arc<dyn StoreBackend> = match config.backend {
        StoreBackendKind::Mongo => {
            let uri = config.mongodb_uri.as_deref().unwrap_or_default();
            info!("Connecting to MongoDB...");
            let db = Database::connect(uri, &config.mongodb_database, config.mongodb_timeout).await?;
            info!("Database connected");
            Arc::new(MongoBackend::new(&db))
        }
        StoreBackendKind::Memory => {
            warn!("Using the in-memory backend; nothing will be persisted");
            Arc::new(MemoryBackend::with_sweep_interval(config.expiry_sweep))
        }
    };

    let store = ModerationStore::new(backend, StoreOptions::from(&config))?;
    let summary = store.init().await?;
    info!(
        "Loaded {} guilds, seeded {} curse words",
        summary.guilds_loaded, summary.curse_words_seeded
    );

    let settings = JsonSettings::open(&config.settings_file, JsonSettings::default_values()).await?;
    info!("Settings file: {}", settings.path().display());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
