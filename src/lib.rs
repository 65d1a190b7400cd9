//! guildwarden - moderation state for Discord guilds.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration and the JSON settings file
//! - `database` - Backends (MongoDB, in-memory), models and repositories
//! - `cache` - Named moka caches behind a registry
//! - `store` - The `ModerationStore` facade

pub mod cache;
pub mod config;
pub mod database;
pub mod store;

pub use config::Config;
pub use database::{StoreBackend, StoreError, StoreResult};
pub use store::{GuildSettingsView, InitSummary, ModerationStore, StoreOptions};
