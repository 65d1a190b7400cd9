//! Moderation store facade.
//!
//! `ModerationStore` is what the moderation front-end talks to. It owns the
//! repositories, wires them to one backend and one cache registry, and
//! exposes guild config, warnings, curse words, the moderation log,
//! temporary actions and user profiles as a single surface.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;
use tracing::info;

use crate::cache::{CacheError, CacheRegistry};
use crate::config::Config;
use crate::database::{
    timeout_duration_for, BanInfo, CurseWordEntry, CurseWordRepository, GuildConfig, GuildPatch,
    GuildRepository, ModerationRecord, ModerationRepository, MuteInfo, ProfileDetails, ProfileRepository,
    ProfileStat, Severity, StoreBackend, StoreError, StoreResult, TemporaryAction,
    TemporaryActionKind, TemporaryActionRepository, UserProfile, WarningRecord, WarnsRepository,
};

/// Knobs the store needs from the application config.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub default_log_channel_id: u64,
    pub legacy_curse_file: Option<PathBuf>,
    pub guild_cache_capacity: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_log_channel_id: 0,
            legacy_curse_file: None,
            guild_cache_capacity: 10_000,
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_log_channel_id: config.default_log_channel_id,
            legacy_curse_file: Some(config.legacy_curse_file.clone()),
            guild_cache_capacity: config.guild_cache_capacity,
        }
    }
}

/// What [`ModerationStore::init`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitSummary {
    pub guilds_loaded: usize,
    pub expiry_policy: bool,
    pub curse_words_seeded: usize,
}

pub struct ModerationStore {
    cache: CacheRegistry,
    guilds: Arc<GuildRepository>,
    warns: WarnsRepository,
    curse_words: CurseWordRepository,
    moderation: ModerationRepository,
    temporary: TemporaryActionRepository,
    profiles: ProfileRepository,
}

impl ModerationStore {
    pub fn new(backend: Arc<dyn StoreBackend>, options: StoreOptions) -> Result<Self, CacheError> {
        let cache = CacheRegistry::new();

        let guilds = Arc::new(GuildRepository::new(
            Arc::clone(&backend),
            &cache,
            options.guild_cache_capacity,
            options.default_log_channel_id,
        )?);
        let curse_words =
            CurseWordRepository::new(Arc::clone(&backend), &cache, options.legacy_curse_file)?;

        Ok(Self {
            warns: WarnsRepository::new(Arc::clone(&guilds)),
            moderation: ModerationRepository::new(Arc::clone(&backend)),
            temporary: TemporaryActionRepository::new(Arc::clone(&backend)),
            profiles: ProfileRepository::new(backend),
            cache,
            guilds,
            curse_words,
        })
    }

    /// Warm the guild mirror, declare temporary action expiry and seed the
    /// curse word list.
    pub async fn init(&self) -> StoreResult<InitSummary> {
        let guilds_loaded = self.guilds.warm().await?;
        let expiry_policy = self.temporary.ensure_expiry_policy().await;
        let curse_words_seeded = self.curse_words.ensure_seeded().await?;

        let summary = InitSummary {
            guilds_loaded,
            expiry_policy,
            curse_words_seeded,
        };
        info!("Moderation store ready: {:?}", summary);
        Ok(summary)
    }

    pub fn cache(&self) -> &CacheRegistry {
        &self.cache
    }

    // --- guilds ---

    /// Make sure the guild has a document, creating a default one if needed.
    pub async fn ensure_guild(&self, guild_id: &str) -> StoreResult<GuildConfig> {
        self.guilds.get(guild_id).await
    }

    pub async fn guild_config(&self, guild_id: &str) -> StoreResult<GuildConfig> {
        self.guilds.get(guild_id).await
    }

    pub async fn guild_exists(&self, guild_id: &str) -> StoreResult<bool> {
        self.guilds.exists(guild_id).await
    }

    pub async fn update_guild_config(&self, guild_id: &str, patch: GuildPatch) -> StoreResult<GuildConfig> {
        self.guilds.apply_patch(guild_id, patch).await
    }

    pub async fn set_muted_role(&self, guild_id: &str, role_id: u64) -> StoreResult<GuildConfig> {
        self.guilds.set_muted_role(guild_id, role_id).await
    }

    pub async fn set_log_channel(&self, guild_id: &str, channel_id: u64) -> StoreResult<GuildConfig> {
        self.guilds.set_log_channel(guild_id, channel_id).await
    }

    pub async fn add_mod_role(&self, guild_id: &str, role_id: u64) -> StoreResult<GuildConfig> {
        self.guilds.add_mod_role(guild_id, role_id).await
    }

    pub async fn remove_mod_role(&self, guild_id: &str, role_id: u64) -> StoreResult<GuildConfig> {
        self.guilds.remove_mod_role(guild_id, role_id).await
    }

    pub async fn record_mute(
        &self,
        guild_id: &str,
        user_id: &str,
        info: MuteInfo,
    ) -> StoreResult<GuildConfig> {
        self.guilds.record_mute(guild_id, user_id, info).await
    }

    pub async fn clear_mute(&self, guild_id: &str, user_id: &str) -> StoreResult<GuildConfig> {
        self.guilds.clear_mute(guild_id, user_id).await
    }

    pub async fn record_ban(
        &self,
        guild_id: &str,
        user_id: &str,
        info: BanInfo,
    ) -> StoreResult<GuildConfig> {
        self.guilds.record_ban(guild_id, user_id, info).await
    }

    pub async fn clear_ban(&self, guild_id: &str, user_id: &str) -> StoreResult<GuildConfig> {
        self.guilds.clear_ban(guild_id, user_id).await
    }

    /// Synchronous, mirror-only view for call sites that cannot await.
    pub fn guild_settings(&self) -> GuildSettingsView<'_> {
        GuildSettingsView {
            guilds: &self.guilds,
        }
    }

    // --- warnings ---

    pub async fn add_warning(&self, guild_id: &str, user_id: &str, word: &str) -> StoreResult<u32> {
        self.warns.add_warning(guild_id, user_id, word).await
    }

    pub async fn reset_warnings(&self, guild_id: &str, user_id: &str) -> StoreResult<bool> {
        self.warns.reset_warnings(guild_id, user_id).await
    }

    pub async fn warnings(&self, guild_id: &str, user_id: &str) -> StoreResult<Option<WarningRecord>> {
        self.warns.get_warnings(guild_id, user_id).await
    }

    /// Timeout in seconds for a member's `count`-th warning.
    pub fn timeout_duration_for(&self, count: u32) -> u64 {
        timeout_duration_for(count)
    }

    // --- curse words ---

    pub async fn is_curse_word(&self, word: &str) -> StoreResult<bool> {
        self.curse_words.is_curse_word(word).await
    }

    pub async fn curse_word_details(&self, word: &str) -> StoreResult<Option<CurseWordEntry>> {
        self.curse_words.details(word).await
    }

    pub async fn add_curse_word(&self, word: &str, severity: Severity) -> StoreResult<bool> {
        self.curse_words.add(word, severity).await
    }

    pub async fn remove_curse_word(&self, word: &str) -> StoreResult<bool> {
        self.curse_words.remove(word).await
    }

    pub async fn curse_words(&self) -> StoreResult<Vec<String>> {
        self.curse_words.words().await
    }

    // --- moderation log ---

    pub async fn log_moderation_action(&self, record: &ModerationRecord) -> StoreResult<String> {
        self.moderation.log(record).await
    }

    pub async fn moderation_history(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> StoreResult<Vec<ModerationRecord>> {
        self.moderation.history(guild_id, user_id).await
    }

    // --- temporary actions ---

    pub async fn create_temporary_action(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
        ttl: Duration,
    ) -> StoreResult<String> {
        self.temporary.create(guild_id, target, kind, ttl).await
    }

    pub async fn active_temporary_actions(&self, guild_id: &str) -> StoreResult<Vec<TemporaryAction>> {
        self.temporary.active(guild_id).await
    }

    pub async fn temporary_action(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
    ) -> StoreResult<Option<TemporaryAction>> {
        self.temporary.find(guild_id, target, kind).await
    }

    pub async fn remove_temporary_action(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
    ) -> StoreResult<bool> {
        self.temporary.remove(guild_id, target, kind).await
    }

    // --- profiles ---

    pub async fn create_profile(
        &self,
        user_id: &str,
        username: &str,
        avatar_url: Option<&str>,
    ) -> StoreResult<UserProfile> {
        self.profiles.create(user_id, username, avatar_url).await
    }

    pub async fn profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        self.profiles.profile(user_id).await
    }

    /// Increment a stat by name (`messages_sent`, `commands_used`, `warnings_received`).
    pub async fn increment_stat(
        &self,
        user_id: &str,
        stat: &str,
        amount: i64,
    ) -> StoreResult<Option<UserProfile>> {
        self.profiles.increment_stat(user_id, parse_stat(stat)?, amount).await
    }

    pub async fn add_badge(
        &self,
        user_id: &str,
        name: &str,
        icon: Option<&str>,
    ) -> StoreResult<Option<UserProfile>> {
        self.profiles.add_badge(user_id, name, icon).await
    }

    pub async fn remove_badge(&self, user_id: &str, name: &str) -> StoreResult<Option<UserProfile>> {
        self.profiles.remove_badge(user_id, name).await
    }

    pub async fn set_preference(
        &self,
        user_id: &str,
        key: &str,
        value: Value,
    ) -> StoreResult<Option<UserProfile>> {
        self.profiles.set_preference(user_id, key, value).await
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        details: ProfileDetails,
    ) -> StoreResult<Option<UserProfile>> {
        self.profiles.update_details(user_id, details).await
    }

    pub async fn top_users(&self, stat: &str, limit: usize) -> StoreResult<Vec<UserProfile>> {
        self.profiles.top_users(parse_stat(stat)?, limit).await
    }
}

fn parse_stat(stat: &str) -> StoreResult<ProfileStat> {
    ProfileStat::from_str(stat)
        .ok_or_else(|| StoreError::validation("stat", format!("unknown stat '{stat}'")))
}

/// Read-only, synchronous view of the guild mirror.
///
/// Only sees guilds the store has already read or written.
pub struct GuildSettingsView<'a> {
    guilds: &'a GuildRepository,
}

impl GuildSettingsView<'_> {
    pub fn get(&self, guild_id: &str) -> Option<GuildConfig> {
        self.guilds.snapshot(guild_id)
    }

    pub fn contains(&self, guild_id: &str) -> bool {
        self.get(guild_id).is_some()
    }

    /// Every mirrored guild keyed by ID.
    pub fn guilds(&self) -> BTreeMap<String, GuildConfig> {
        self.guilds
            .snapshot_all()
            .into_iter()
            .map(|guild| (guild.guild_id.clone(), guild))
            .collect()
    }
}
