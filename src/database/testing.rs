//! Test backends.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::backend::StoreBackend;
use super::error::{StoreError, StoreResult};
use super::memory::MemoryBackend;
use super::models::{
    CurseWordEntry, GuildConfig, GuildUpdate, ModerationRecord, ProfileStat, ProfileUpdate,
    TemporaryAction, TemporaryActionKind, UserProfile,
};

/// [`MemoryBackend`] with injectable write failures.
#[derive(Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    fail_guild_inserts: AtomicBool,
    curse_insert_failures: AtomicUsize,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every guild insert fail.
    pub fn fail_guild_inserts(self) -> Self {
        self.fail_guild_inserts.store(true, Ordering::SeqCst);
        self
    }

    /// Make the next `count` curse word inserts fail.
    pub fn fail_curse_inserts(self, count: usize) -> Self {
        self.curse_insert_failures.store(count, Ordering::SeqCst);
        self
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("connection reset".to_string())
    }
}

#[async_trait]
impl StoreBackend for FlakyBackend {
    async fn find_guild(&self, id: &str) -> StoreResult<Option<GuildConfig>> {
        self.inner.find_guild(id).await
    }

    async fn all_guilds(&self) -> StoreResult<Vec<GuildConfig>> {
        self.inner.all_guilds().await
    }

    async fn guild_exists(&self, id: &str) -> StoreResult<bool> {
        self.inner.guild_exists(id).await
    }

    async fn insert_guild_if_absent(&self, guild: &GuildConfig) -> StoreResult<bool> {
        if self.fail_guild_inserts.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.insert_guild_if_absent(guild).await
    }

    async fn update_guild(&self, id: &str, update: &GuildUpdate) -> StoreResult<Option<GuildConfig>> {
        self.inner.update_guild(id, update).await
    }

    async fn insert_moderation_record(&self, record: &ModerationRecord) -> StoreResult<String> {
        self.inner.insert_moderation_record(record).await
    }

    async fn moderation_history(&self, guild_id: &str, user_id: &str) -> StoreResult<Vec<ModerationRecord>> {
        self.inner.moderation_history(guild_id, user_id).await
    }

    async fn count_curse_words(&self) -> StoreResult<u64> {
        self.inner.count_curse_words().await
    }

    async fn insert_curse_words(&self, entries: &[CurseWordEntry]) -> StoreResult<()> {
        let failed = self
            .curse_insert_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(Self::unavailable());
        }
        self.inner.insert_curse_words(entries).await
    }

    async fn find_curse_word(&self, word: &str) -> StoreResult<Option<CurseWordEntry>> {
        self.inner.find_curse_word(word).await
    }

    async fn list_curse_words(&self) -> StoreResult<Vec<CurseWordEntry>> {
        self.inner.list_curse_words().await
    }

    async fn delete_curse_word(&self, word: &str) -> StoreResult<bool> {
        self.inner.delete_curse_word(word).await
    }

    async fn ensure_expiry_policy(&self) -> StoreResult<()> {
        self.inner.ensure_expiry_policy().await
    }

    async fn insert_temporary_action(&self, action: &TemporaryAction) -> StoreResult<String> {
        self.inner.insert_temporary_action(action).await
    }

    async fn find_temporary_actions(&self, guild_id: &str, now: DateTime<Utc>) -> StoreResult<Vec<TemporaryAction>> {
        self.inner.find_temporary_actions(guild_id, now).await
    }

    async fn delete_temporary_actions(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
    ) -> StoreResult<u64> {
        self.inner.delete_temporary_actions(guild_id, target, kind).await
    }

    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        self.inner.find_profile(user_id).await
    }

    async fn insert_profile_if_absent(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        self.inner.insert_profile_if_absent(profile).await
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> StoreResult<Option<UserProfile>> {
        self.inner.update_profile(user_id, update).await
    }

    async fn top_profiles(&self, stat: ProfileStat, limit: usize) -> StoreResult<Vec<UserProfile>> {
        self.inner.top_profiles(stat, limit).await
    }
}
