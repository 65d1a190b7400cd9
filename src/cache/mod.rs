//! Cache module - Named, typed caches over Moka.
//!
//! - `CacheRegistry` - Central registry holding all named caches
//! - `TypedCache` - Typed handle over one Moka cache
//! - `CacheConfig` - Capacity and expiry settings per cache
//!
//! ## Usage
//!
//! ```rust,ignore
//! let guilds = registry.get_or_create::<String, GuildConfig>(
//!     "guild_config",
//!     CacheConfig::guild_mirror(10_000),
//! )?;
//! guilds.insert(guild.guild_id.clone(), guild);
//! ```

mod config;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use registry::{CacheError, CacheRegistry};
pub use typed::TypedCache;
