//! User profile repository.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::database::backend::StoreBackend;
use crate::database::error::{validate_snowflake, StoreError, StoreResult};
use crate::database::models::{Badge, ProfileDetails, ProfileStat, ProfileUpdate, UserProfile};

/// Largest page `top_users` will return.
const MAX_TOP_USERS: usize = 100;

/// Repository for user profiles.
pub struct ProfileRepository {
    backend: Arc<dyn StoreBackend>,
}

impl ProfileRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Get a profile, creating it with defaults if missing.
    pub async fn create(
        &self,
        user_id: &str,
        username: &str,
        avatar_url: Option<&str>,
    ) -> StoreResult<UserProfile> {
        validate_snowflake("user_id", user_id)?;

        if let Some(profile) = self.backend.find_profile(user_id).await? {
            return Ok(profile);
        }

        let profile = UserProfile::new(user_id, username, avatar_url.map(str::to_string));
        let stored = self.backend.insert_profile_if_absent(&profile).await?;
        debug!("Created profile for user {}", user_id);
        Ok(stored)
    }

    pub async fn profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        validate_snowflake("user_id", user_id)?;
        self.backend.find_profile(user_id).await
    }

    pub async fn increment_stat(
        &self,
        user_id: &str,
        stat: ProfileStat,
        amount: i64,
    ) -> StoreResult<Option<UserProfile>> {
        self.apply(user_id, ProfileUpdate::IncrementStat { stat, amount }).await
    }

    pub async fn add_badge(
        &self,
        user_id: &str,
        name: &str,
        icon: Option<&str>,
    ) -> StoreResult<Option<UserProfile>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::validation("badge", "name must not be empty"));
        }

        let badge = Badge {
            name: name.to_string(),
            icon: icon.map(str::to_string),
            awarded_at: Utc::now(),
        };
        self.apply(user_id, ProfileUpdate::AddBadge(badge)).await
    }

    pub async fn remove_badge(&self, user_id: &str, name: &str) -> StoreResult<Option<UserProfile>> {
        self.apply(user_id, ProfileUpdate::RemoveBadge(name.trim().to_string()))
            .await
    }

    pub async fn set_preference(
        &self,
        user_id: &str,
        key: &str,
        value: Value,
    ) -> StoreResult<Option<UserProfile>> {
        let update = ProfileUpdate::SetPreference {
            key: key.to_string(),
            value,
        };
        self.apply(user_id, update).await
    }

    /// Update username, avatar or bio. Returns `None` for unknown users.
    pub async fn update_details(
        &self,
        user_id: &str,
        details: ProfileDetails,
    ) -> StoreResult<Option<UserProfile>> {
        self.apply(user_id, ProfileUpdate::Details(details)).await
    }

    /// Profiles with the highest `stat`, at most `limit` (capped at 100).
    pub async fn top_users(&self, stat: ProfileStat, limit: usize) -> StoreResult<Vec<UserProfile>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.backend
            .top_profiles(stat, limit.min(MAX_TOP_USERS))
            .await
    }

    async fn apply(&self, user_id: &str, update: ProfileUpdate) -> StoreResult<Option<UserProfile>> {
        validate_snowflake("user_id", user_id)?;
        update.validate()?;

        let result = self.backend.update_profile(user_id, &update).await?;
        if result.is_none() {
            debug!("No profile for user {}", user_id);
        }
        Ok(result)
    }
}
