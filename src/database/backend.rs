//! Backing store seam.
//!
//! Repositories talk to a [`StoreBackend`] rather than to MongoDB directly,
//! so the same moderation logic runs against the production database and
//! the in-process store used by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreResult;
use super::models::{
    CurseWordEntry, GuildConfig, GuildUpdate, ModerationRecord, ProfileStat, ProfileUpdate,
    TemporaryAction, TemporaryActionKind, UserProfile,
};

/// Collection names shared by every backend.
pub mod collections {
    pub const GUILDS: &str = "guilds";
    pub const MODERATION: &str = "moderation";
    pub const TEMPORARY_ACTIONS: &str = "temporary_actions";
    pub const CURSE_WORDS: &str = "curse_words";
    pub const USER_PROFILES: &str = "user_profiles";
}

#[async_trait]
pub trait StoreBackend: Send + Sync {
    // --- guilds ---

    async fn find_guild(&self, guild_id: &str) -> StoreResult<Option<GuildConfig>>;

    async fn all_guilds(&self) -> StoreResult<Vec<GuildConfig>>;

    async fn guild_exists(&self, guild_id: &str) -> StoreResult<bool>;

    /// Insert `guild` unless a document with its ID exists.
    /// Returns whether a document was created.
    async fn insert_guild_if_absent(&self, guild: &GuildConfig) -> StoreResult<bool>;

    /// Apply one atomic update and return the post-update document.
    ///
    /// Returns `None` when the guild is missing and the update does not upsert.
    async fn update_guild(
        &self,
        guild_id: &str,
        update: &GuildUpdate,
    ) -> StoreResult<Option<GuildConfig>>;

    // --- moderation log ---

    /// Append a record, returning its store-assigned ID.
    async fn insert_moderation_record(&self, record: &ModerationRecord) -> StoreResult<String>;

    /// Records for a member, newest first; equal timestamps newest insert first.
    async fn moderation_history(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> StoreResult<Vec<ModerationRecord>>;

    // --- curse words ---

    async fn count_curse_words(&self) -> StoreResult<u64>;

    async fn insert_curse_words(&self, entries: &[CurseWordEntry]) -> StoreResult<()>;

    /// Lookup by normalized word.
    async fn find_curse_word(&self, word: &str) -> StoreResult<Option<CurseWordEntry>>;

    async fn list_curse_words(&self) -> StoreResult<Vec<CurseWordEntry>>;

    /// Delete by normalized word. Returns whether anything was removed.
    async fn delete_curse_word(&self, word: &str) -> StoreResult<bool>;

    // --- temporary actions ---

    /// Declare expiry of temporary actions at `expires_at`. Idempotent.
    async fn ensure_expiry_policy(&self) -> StoreResult<()>;

    async fn insert_temporary_action(&self, action: &TemporaryAction) -> StoreResult<String>;

    /// Unexpired actions for a guild as of `now`.
    async fn find_temporary_actions(
        &self,
        guild_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TemporaryAction>>;

    /// Delete every action matching guild, target and kind.
    async fn delete_temporary_actions(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
    ) -> StoreResult<u64>;

    // --- user profiles ---

    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>>;

    /// Insert `profile` unless one exists; returns the stored profile either way.
    async fn insert_profile_if_absent(&self, profile: &UserProfile) -> StoreResult<UserProfile>;

    /// Apply one atomic update and return the post-update profile, if it exists.
    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<UserProfile>>;

    /// Profiles ordered by `stat` descending.
    async fn top_profiles(&self, stat: ProfileStat, limit: usize) -> StoreResult<Vec<UserProfile>>;
}
