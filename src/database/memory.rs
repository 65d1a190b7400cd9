//! In-process backend.
//!
//! Mirrors the MongoDB backend's semantics on lock-sharded maps. Each
//! update runs under the shard lock of its document, which gives the same
//! per-document atomicity as MongoDB's update operators. Temporary action
//! expiry is emulated by a periodic sweep task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::backend::StoreBackend;
use super::error::StoreResult;
use super::models::{
    CurseWordEntry, GuildConfig, GuildUpdate, ModerationRecord, ProfileStat, ProfileUpdate,
    TemporaryAction, TemporaryActionKind, UserProfile,
};

/// Longest allowed pause between expiry sweeps.
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type TemporaryActions = DashMap<ObjectId, TemporaryAction>;

/// [`StoreBackend`] held entirely in memory.
pub struct MemoryBackend {
    guilds: DashMap<String, GuildConfig>,
    /// Insertion ordered
    moderation: RwLock<Vec<ModerationRecord>>,
    temporary_actions: Arc<TemporaryActions>,
    curse_words: DashMap<String, CurseWordEntry>,
    profiles: DashMap<String, UserProfile>,
    sweep_interval: Duration,
    sweeper_started: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend sweeping every 30 seconds.
    pub fn new() -> Self {
        Self::with_sweep_interval(Duration::from_secs(30))
    }

    /// Create an empty backend with a custom sweep interval (capped at 60s).
    pub fn with_sweep_interval(interval: Duration) -> Self {
        Self {
            guilds: DashMap::new(),
            moderation: RwLock::new(Vec::new()),
            temporary_actions: Arc::new(DashMap::new()),
            curse_words: DashMap::new(),
            profiles: DashMap::new(),
            sweep_interval: interval.clamp(Duration::from_millis(1), MAX_SWEEP_INTERVAL),
            sweeper_started: AtomicBool::new(false),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Delete every temporary action expired as of now.
    pub fn sweep_expired(&self) -> usize {
        sweep(&self.temporary_actions, Utc::now())
    }

    /// Number of stored temporary actions, expired or not.
    ///
    /// Bypasses the read-time filter, so it shows what the sweeper left behind.
    pub fn stored_temporary_actions(&self) -> usize {
        self.temporary_actions.len()
    }

    fn start_sweeper(&self) {
        if self.sweeper_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let actions = Arc::downgrade(&self.temporary_actions);
        let period = self.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                // Stop once the backend is gone.
                let Some(actions) = actions.upgrade() else {
                    break;
                };
                let removed = sweep(&actions, Utc::now());
                if removed > 0 {
                    debug!("Expiry sweep removed {} temporary actions", removed);
                }
            }
        });

        info!("Temporary action sweeper started (every {:?})", period);
    }
}

fn sweep(actions: &TemporaryActions, now: DateTime<Utc>) -> usize {
    let before = actions.len();
    actions.retain(|_, action| !action.is_expired_at(now));
    before.saturating_sub(actions.len())
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn find_guild(&self, guild_id: &str) -> StoreResult<Option<GuildConfig>> {
        Ok(self.guilds.get(guild_id).map(|g| g.clone()))
    }

    async fn all_guilds(&self) -> StoreResult<Vec<GuildConfig>> {
        Ok(self.guilds.iter().map(|g| g.value().clone()).collect())
    }

    async fn guild_exists(&self, guild_id: &str) -> StoreResult<bool> {
        Ok(self.guilds.contains_key(guild_id))
    }

    async fn insert_guild_if_absent(&self, guild: &GuildConfig) -> StoreResult<bool> {
        let mut created = false;
        self.guilds.entry(guild.guild_id.clone()).or_insert_with(|| {
            created = true;
            guild.clone()
        });
        Ok(created)
    }

    async fn update_guild(
        &self,
        guild_id: &str,
        update: &GuildUpdate,
    ) -> StoreResult<Option<GuildConfig>> {
        // Reject whatever MongoDB would reject.
        update.to_document()?;

        if update.upserts() {
            let mut guild = self
                .guilds
                .entry(guild_id.to_string())
                .or_insert_with(|| GuildConfig::new(guild_id, 0));
            update.apply_to(&mut guild);
            return Ok(Some(guild.clone()));
        }

        Ok(self.guilds.get_mut(guild_id).map(|mut guild| {
            update.apply_to(&mut guild);
            guild.clone()
        }))
    }

    async fn insert_moderation_record(&self, record: &ModerationRecord) -> StoreResult<String> {
        let id = ObjectId::new();
        let mut stored = record.clone();
        stored.id = Some(id);
        self.moderation.write().push(stored);
        Ok(id.to_hex())
    }

    async fn moderation_history(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> StoreResult<Vec<ModerationRecord>> {
        let mut records: Vec<ModerationRecord> = self
            .moderation
            .read()
            .iter()
            .rev()
            .filter(|r| r.guild_id == guild_id && r.user_id == user_id)
            .cloned()
            .collect();

        // Stable sort keeps newest-insert-first among equal timestamps.
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    async fn count_curse_words(&self) -> StoreResult<u64> {
        Ok(self.curse_words.len() as u64)
    }

    async fn insert_curse_words(&self, entries: &[CurseWordEntry]) -> StoreResult<()> {
        for entry in entries {
            self.curse_words
                .entry(entry.word.clone())
                .or_insert_with(|| CurseWordEntry {
                    id: Some(ObjectId::new()),
                    ..entry.clone()
                });
        }
        Ok(())
    }

    async fn find_curse_word(&self, word: &str) -> StoreResult<Option<CurseWordEntry>> {
        Ok(self.curse_words.get(word).map(|e| e.clone()))
    }

    async fn list_curse_words(&self) -> StoreResult<Vec<CurseWordEntry>> {
        let mut words: Vec<CurseWordEntry> =
            self.curse_words.iter().map(|e| e.value().clone()).collect();
        words.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.word.cmp(&b.word)));
        Ok(words)
    }

    async fn delete_curse_word(&self, word: &str) -> StoreResult<bool> {
        Ok(self.curse_words.remove(word).is_some())
    }

    async fn ensure_expiry_policy(&self) -> StoreResult<()> {
        self.start_sweeper();
        Ok(())
    }

    async fn insert_temporary_action(&self, action: &TemporaryAction) -> StoreResult<String> {
        let id = ObjectId::new();
        let mut stored = action.clone();
        stored.id = Some(id);
        self.temporary_actions.insert(id, stored);
        Ok(id.to_hex())
    }

    async fn find_temporary_actions(
        &self,
        guild_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TemporaryAction>> {
        let mut actions: Vec<TemporaryAction> = self
            .temporary_actions
            .iter()
            .filter(|a| a.guild_id == guild_id && !a.is_expired_at(now))
            .map(|a| a.value().clone())
            .collect();
        actions.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(actions)
    }

    async fn delete_temporary_actions(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
    ) -> StoreResult<u64> {
        let before = self.temporary_actions.len();
        self.temporary_actions
            .retain(|_, a| !(a.guild_id == guild_id && a.target == target && a.kind == kind));
        Ok(before.saturating_sub(self.temporary_actions.len()) as u64)
    }

    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn insert_profile_if_absent(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        let stored = self
            .profiles
            .entry(profile.user_id.clone())
            .or_insert_with(|| profile.clone());
        Ok(stored.clone())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<UserProfile>> {
        let now = Utc::now();
        Ok(self.profiles.get_mut(user_id).map(|mut profile| {
            update.apply_to(&mut profile, now);
            profile.clone()
        }))
    }

    async fn top_profiles(&self, stat: ProfileStat, limit: usize) -> StoreResult<Vec<UserProfile>> {
        let mut profiles: Vec<UserProfile> =
            self.profiles.iter().map(|p| p.value().clone()).collect();
        profiles.sort_by(|a, b| b.stats.get(stat).cmp(&a.stats.get(stat)));
        profiles.truncate(limit);
        Ok(profiles)
    }
}
