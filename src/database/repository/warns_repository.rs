//! Warning escalation.
//!
//! Warnings live inside the guild document. Each warning is one atomic
//! store update, so concurrent warnings for the same member never lose an
//! increment, and the returned count is the store's post-update value.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::database::error::{validate_snowflake, StoreError, StoreResult};
use crate::database::models::{GuildUpdate, WarningRecord};

use super::GuildRepository;

/// Timeout in seconds for the first six warnings; later warnings stay at
/// the last step.
pub const TIMEOUT_LADDER: [u64; 6] = [0, 60, 1800, 3600, 7200, 10800];

/// Timeout, in seconds, for a member's `count`-th warning.
///
/// The first warning carries no timeout. Zero warnings map to zero.
pub fn timeout_duration_for(count: u32) -> u64 {
    match count {
        0 => 0,
        n => {
            let step = (n as usize).min(TIMEOUT_LADDER.len()) - 1;
            TIMEOUT_LADDER[step]
        }
    }
}

/// Repository for member warnings.
pub struct WarnsRepository {
    guilds: Arc<GuildRepository>,
}

impl WarnsRepository {
    pub fn new(guilds: Arc<GuildRepository>) -> Self {
        Self { guilds }
    }

    /// Record a warning for `word` and return the member's new count.
    pub async fn add_warning(&self, guild_id: &str, user_id: &str, word: &str) -> StoreResult<u32> {
        validate_snowflake("guild_id", guild_id)?;
        validate_snowflake("user_id", user_id)?;
        let word = word.trim();
        if word.is_empty() {
            return Err(StoreError::validation("word", "must not be empty"));
        }

        let update = GuildUpdate::RecordWarning {
            user_id: user_id.to_string(),
            word: word.to_string(),
            at: Utc::now().timestamp(),
        };
        let guild = self.guilds.update_existing(guild_id, &update).await?;

        let count = guild
            .warnings_for(user_id)
            .map(|record| record.count)
            .ok_or_else(|| {
                StoreError::NotFound(format!("warning record for {user_id} in guild {guild_id}"))
            })?;

        info!(
            "Warning {} for user {} in guild {} (timeout {}s)",
            count,
            user_id,
            guild_id,
            timeout_duration_for(count)
        );
        Ok(count)
    }

    /// Drop a member's warning record. Returns whether one existed.
    pub async fn reset_warnings(&self, guild_id: &str, user_id: &str) -> StoreResult<bool> {
        validate_snowflake("user_id", user_id)?;

        let current = self.guilds.refresh(guild_id).await?;
        if current.warnings_for(user_id).is_none() {
            debug!("No warnings to reset for user {} in guild {}", user_id, guild_id);
            return Ok(false);
        }

        let update = GuildUpdate::ClearWarnings {
            user_id: user_id.to_string(),
        };
        self.guilds.update_existing(guild_id, &update).await?;
        info!("Reset warnings for user {} in guild {}", user_id, guild_id);
        Ok(true)
    }

    /// A member's warning record, if any.
    pub async fn get_warnings(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<WarningRecord>> {
        validate_snowflake("user_id", user_id)?;
        let guild = self.guilds.get(guild_id).await?;
        Ok(guild.warnings_for(user_id).cloned())
    }
}
