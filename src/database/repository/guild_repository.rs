//! Guild configuration repository with a write-through mirror.
//!
//! Every guild document read from or written to the store is mirrored in a
//! bounded moka cache. Writes go to the store first and the mirror is then
//! reconciled from the store's post-write document, so the mirror never
//! holds anything the store has not accepted. Documents carry a revision
//! counter and the mirror keeps the highest one it has seen, which stops
//! out-of-order responses from concurrent writers rolling it back.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::database::backend::StoreBackend;
use crate::database::error::{validate_snowflake, StoreError, StoreResult};
use crate::database::models::{BanInfo, GuildConfig, GuildPatch, GuildUpdate, MuteInfo};

/// Repository for guild configuration.
pub struct GuildRepository {
    backend: Arc<dyn StoreBackend>,
    cache: TypedCache<String, GuildConfig>,
    default_log_channel: u64,
}

impl GuildRepository {
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        registry: &CacheRegistry,
        capacity: u64,
        default_log_channel: u64,
    ) -> Result<Self, CacheError> {
        let cache = registry.get_or_create("guild_config", CacheConfig::guild_mirror(capacity))?;

        Ok(Self {
            backend,
            cache,
            default_log_channel,
        })
    }

    /// Get a guild, from the mirror when possible.
    ///
    /// Missing guilds are created with defaults. If the store cannot create
    /// one, a default document is returned without being mirrored.
    pub async fn get(&self, guild_id: &str) -> StoreResult<GuildConfig> {
        validate_snowflake("guild_id", guild_id)?;

        if let Some(guild) = self.cache.get(&guild_id.to_string()) {
            return Ok(guild);
        }

        self.fetch(guild_id).await
    }

    /// Re-read a guild from the store, bypassing the mirror.
    pub async fn refresh(&self, guild_id: &str) -> StoreResult<GuildConfig> {
        validate_snowflake("guild_id", guild_id)?;
        self.fetch(guild_id).await
    }

    /// Whether the store holds a document for the guild.
    pub async fn exists(&self, guild_id: &str) -> StoreResult<bool> {
        validate_snowflake("guild_id", guild_id)?;
        self.backend.guild_exists(guild_id).await
    }

    /// Merge-patch a guild: only the patched fields change.
    ///
    /// Creates the guild with defaults when missing. The mirror is
    /// reconciled from the store's post-write document rather than patched
    /// in place.
    pub async fn apply_patch(&self, guild_id: &str, patch: GuildPatch) -> StoreResult<GuildConfig> {
        self.get(guild_id).await?;

        self.write(guild_id, &GuildUpdate::Patch(patch))
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("upsert of guild {guild_id} returned nothing")))
    }

    /// Apply an update that requires the guild to exist, creating it first
    /// if needed.
    pub async fn update_existing(
        &self,
        guild_id: &str,
        update: &GuildUpdate,
    ) -> StoreResult<GuildConfig> {
        validate_snowflake("guild_id", guild_id)?;

        if let Some(guild) = self.write(guild_id, update).await? {
            return Ok(guild);
        }

        // Writes never fall back to a default document.
        if self.backend.find_guild(guild_id).await?.is_none() {
            self.create_default(guild_id).await?;
        }
        self.write(guild_id, update)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("guild {guild_id}")))
    }

    pub async fn set_muted_role(&self, guild_id: &str, role_id: u64) -> StoreResult<GuildConfig> {
        self.apply_patch(guild_id, GuildPatch::default().muted_role(role_id)).await
    }

    pub async fn set_log_channel(&self, guild_id: &str, channel_id: u64) -> StoreResult<GuildConfig> {
        self.apply_patch(guild_id, GuildPatch::default().log_channel(channel_id)).await
    }

    pub async fn add_mod_role(&self, guild_id: &str, role_id: u64) -> StoreResult<GuildConfig> {
        self.update_existing(guild_id, &GuildUpdate::AddModRole(role_id)).await
    }

    pub async fn remove_mod_role(&self, guild_id: &str, role_id: u64) -> StoreResult<GuildConfig> {
        self.update_existing(guild_id, &GuildUpdate::RemoveModRole(role_id)).await
    }

    pub async fn record_mute(
        &self,
        guild_id: &str,
        user_id: &str,
        info: MuteInfo,
    ) -> StoreResult<GuildConfig> {
        validate_snowflake("user_id", user_id)?;
        let update = GuildUpdate::SetMute {
            user_id: user_id.to_string(),
            info,
        };
        self.update_existing(guild_id, &update).await
    }

    pub async fn clear_mute(&self, guild_id: &str, user_id: &str) -> StoreResult<GuildConfig> {
        validate_snowflake("user_id", user_id)?;
        let update = GuildUpdate::ClearMute {
            user_id: user_id.to_string(),
        };
        self.update_existing(guild_id, &update).await
    }

    pub async fn record_ban(
        &self,
        guild_id: &str,
        user_id: &str,
        info: BanInfo,
    ) -> StoreResult<GuildConfig> {
        validate_snowflake("user_id", user_id)?;
        let update = GuildUpdate::SetBan {
            user_id: user_id.to_string(),
            info,
        };
        self.update_existing(guild_id, &update).await
    }

    pub async fn clear_ban(&self, guild_id: &str, user_id: &str) -> StoreResult<GuildConfig> {
        validate_snowflake("user_id", user_id)?;
        let update = GuildUpdate::ClearBan {
            user_id: user_id.to_string(),
        };
        self.update_existing(guild_id, &update).await
    }

    /// Load every stored guild into the mirror.
    pub async fn warm(&self) -> StoreResult<usize> {
        let guilds = self.backend.all_guilds().await?;
        let count = guilds.len();
        for guild in guilds {
            self.remember(guild);
        }
        info!("Loaded {} guilds into the configuration mirror", count);
        Ok(count)
    }

    /// Mirror-only read for call sites that cannot await.
    pub fn snapshot(&self, guild_id: &str) -> Option<GuildConfig> {
        self.cache.get(&guild_id.to_string())
    }

    /// Every mirrored guild.
    pub fn snapshot_all(&self) -> Vec<GuildConfig> {
        self.cache.values()
    }

    async fn write(&self, guild_id: &str, update: &GuildUpdate) -> StoreResult<Option<GuildConfig>> {
        let result = self.backend.update_guild(guild_id, update).await?;
        if let Some(guild) = &result {
            self.remember(guild.clone());
        }
        Ok(result)
    }

    async fn fetch(&self, guild_id: &str) -> StoreResult<GuildConfig> {
        match self.backend.find_guild(guild_id).await? {
            Some(guild) => {
                self.remember(guild.clone());
                Ok(guild)
            }
            None => match self.create_default(guild_id).await {
                Ok(guild) => Ok(guild),
                Err(e) => {
                    error!("Failed to create guild {}: {}", guild_id, e);
                    Ok(GuildConfig::new(guild_id, self.default_log_channel))
                }
            },
        }
    }

    async fn create_default(&self, guild_id: &str) -> StoreResult<GuildConfig> {
        info!("Guild {} not found, creating it", guild_id);
        let guild = GuildConfig::new(guild_id, self.default_log_channel);

        if self.backend.insert_guild_if_absent(&guild).await? {
            info!("Added guild {} to the store", guild_id);
        }

        // Re-read: a concurrent creator may have won the insert.
        match self.backend.find_guild(guild_id).await {
            Ok(Some(stored)) => {
                self.remember(stored.clone());
                Ok(stored)
            }
            Ok(None) => {
                warn!("Guild {} missing right after creation, using defaults", guild_id);
                Ok(guild)
            }
            Err(e) => {
                warn!("Failed to re-read guild {} after creation: {}", guild_id, e);
                Ok(guild)
            }
        }
    }

    fn remember(&self, guild: GuildConfig) {
        let key = guild.guild_id.clone();
        let revision = guild.revision;
        if !self
            .cache
            .insert_if(key, guild, |new, cached| new.revision >= cached.revision)
        {
            debug!("Kept newer mirrored guild over revision {}", revision);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryBackend;
    use crate::database::testing::FlakyBackend;
    use crate::database::models::BanInfo;

    fn repo(backend: Arc<dyn StoreBackend>) -> GuildRepository {
        GuildRepository::new(backend, &CacheRegistry::new(), 100, 77).unwrap()
    }

    #[tokio::test]
    async fn test_get_creates_missing_guild() {
        let backend = Arc::new(MemoryBackend::new());
        let guilds = repo(backend.clone());

        let guild = guilds.get("100").await.unwrap();
        assert_eq!(guild.guild_id, "100");
        assert_eq!(guild.log_channel_id, 77);
        assert!(guild.warning_users.is_empty());
        assert!(backend.guild_exists("100").await.unwrap());
        assert!(guilds.snapshot("100").is_some());
    }

    #[tokio::test]
    async fn test_invalid_guild_id_is_rejected() {
        let guilds = repo(Arc::new(MemoryBackend::new()));
        let err = guilds.get("not-a-guild").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "guild_id", .. }));
    }

    #[tokio::test]
    async fn test_patch_writes_through() {
        let backend = Arc::new(MemoryBackend::new());
        let guilds = repo(backend.clone());
        guilds.get("100").await.unwrap();

        guilds
            .apply_patch("100", GuildPatch::default().muted_role(5))
            .await
            .unwrap();

        let stored = backend.find_guild("100").await.unwrap().unwrap();
        assert_eq!(stored.muted_role_id, 5);
        assert_eq!(stored.log_channel_id, 77);
        assert_eq!(guilds.snapshot("100").unwrap(), stored);
    }

    #[tokio::test]
    async fn test_patch_on_uncached_guild_caches_full_document() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .insert_guild_if_absent(&GuildConfig::new("100", 3))
            .await
            .unwrap();
        let guilds = repo(backend.clone());

        let guild = guilds
            .apply_patch("100", GuildPatch::default().mod_roles(vec![1, 2]))
            .await
            .unwrap();

        assert_eq!(guild.log_channel_id, 3);
        assert_eq!(guilds.snapshot("100").unwrap().mod_roles, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stale_document_does_not_replace_newer() {
        let guilds = repo(Arc::new(MemoryBackend::new()));
        let stale = guilds.get("100").await.unwrap();
        guilds.set_log_channel("100", 9).await.unwrap();

        guilds.remember(stale);
        assert_eq!(guilds.snapshot("100").unwrap().log_channel_id, 9);
    }

    #[tokio::test]
    async fn test_warm_loads_every_guild() {
        let backend = Arc::new(MemoryBackend::new());
        for id in ["1", "2", "3"] {
            backend.insert_guild_if_absent(&GuildConfig::new(id, 0)).await.unwrap();
        }
        let guilds = repo(backend);

        assert_eq!(guilds.warm().await.unwrap(), 3);
        assert_eq!(guilds.snapshot_all().len(), 3);
    }

    #[tokio::test]
    async fn test_mod_roles_and_mutes() {
        let guilds = repo(Arc::new(MemoryBackend::new()));

        guilds.add_mod_role("100", 11).await.unwrap();
        guilds.add_mod_role("100", 12).await.unwrap();
        let guild = guilds.add_mod_role("100", 11).await.unwrap();
        assert_eq!(guild.mod_roles, vec![11, 12]);

        let info = MuteInfo {
            moderator_id: "9".to_string(),
            reason: "spam".to_string(),
            muted_at: 1,
            until: Some(61),
        };
        let guild = guilds.record_mute("100", "200", info.clone()).await.unwrap();
        assert_eq!(guild.muted_users.get("200"), Some(&info));

        let guild = guilds.clear_mute("100", "200").await.unwrap();
        assert!(guild.muted_users.is_empty());
    }

    #[tokio::test]
    async fn test_failed_creation_degrades_to_default() {
        let guilds = repo(Arc::new(FlakyBackend::new().fail_guild_inserts()));

        let guild = guilds.get("100").await.unwrap();
        assert_eq!(guild, GuildConfig::new("100", 77));
        // Never mirror what the store did not accept.
        assert!(guilds.snapshot("100").is_none());
    }

    #[tokio::test]
    async fn test_failed_creation_surfaces_on_writes() {
        let guilds = repo(Arc::new(FlakyBackend::new().fail_guild_inserts()));

        let err = guilds.add_mod_role("100", 11).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(guilds.snapshot("100").is_none());
    }

    #[tokio::test]
    async fn test_bans() {
        let guilds = repo(Arc::new(MemoryBackend::new()));
        let info = BanInfo {
            moderator_id: "9".to_string(),
            reason: "raid".to_string(),
            banned_at: 1_700_000_000,
        };

        let guild = guilds.record_ban("100", "200", info.clone()).await.unwrap();
        assert_eq!(guild.banned_users.get("200"), Some(&info));
        assert_eq!(guilds.snapshot("100").unwrap().banned_users.len(), 1);

        let guild = guilds.clear_ban("100", "200").await.unwrap();
        assert!(guild.banned_users.is_empty());
        assert!(matches!(
            guilds.record_ban("100", "x", info).await,
            Err(StoreError::Validation { field: "user_id", .. })
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_role_is_rejected() {
        let guilds = repo(Arc::new(MemoryBackend::new()));

        let err = guilds.add_mod_role("100", u64::MAX).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "role_id", .. }));
        assert!(guilds.get("100").await.unwrap().mod_roles.is_empty());
    }
}
