//! Temporary actions that expire on their own.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::database::backend::StoreBackend;
use crate::database::error::{validate_snowflake, StoreError, StoreResult};
use crate::database::models::{TemporaryAction, TemporaryActionKind};

/// Repository for temporary actions (raid locks, channel locks, timed mutes).
///
/// Expiry is enforced by the backend; reads also hide anything past its
/// expiry that the backend has not removed yet.
pub struct TemporaryActionRepository {
    backend: Arc<dyn StoreBackend>,
}

impl TemporaryActionRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Declare the expiry policy. Failures are logged, not returned.
    pub async fn ensure_expiry_policy(&self) -> bool {
        match self.backend.ensure_expiry_policy().await {
            Ok(()) => {
                debug!("Temporary action expiry policy in place");
                true
            }
            Err(e) => {
                warn!("Failed to set up temporary action expiry: {}", e);
                false
            }
        }
    }

    /// Record an action living for `ttl`, replacing any existing action for
    /// the same guild, target and kind. Returns the new action's ID.
    pub async fn create(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
        ttl: Duration,
    ) -> StoreResult<String> {
        validate_snowflake("guild_id", guild_id)?;
        validate_snowflake("target", target)?;
        if ttl <= Duration::zero() {
            return Err(StoreError::validation("ttl", "must be positive"));
        }

        let replaced = self.backend.delete_temporary_actions(guild_id, target, kind).await?;
        if replaced > 0 {
            debug!("Replaced {} {} action(s) on {}", replaced, kind.as_str(), target);
        }

        let action = TemporaryAction::new(guild_id, target, kind, ttl);
        let id = self.backend.insert_temporary_action(&action).await?;
        info!(
            "Created {} on {} in guild {} until {}",
            kind.as_str(),
            target,
            guild_id,
            action.expires_at
        );
        Ok(id)
    }

    /// Unexpired actions for a guild.
    pub async fn active(&self, guild_id: &str) -> StoreResult<Vec<TemporaryAction>> {
        validate_snowflake("guild_id", guild_id)?;
        self.backend.find_temporary_actions(guild_id, Utc::now()).await
    }

    /// The unexpired action for a target, if any.
    pub async fn find(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
    ) -> StoreResult<Option<TemporaryAction>> {
        Ok(self
            .active(guild_id)
            .await?
            .into_iter()
            .find(|action| action.target == target && action.kind == kind))
    }

    /// Lift an action early. Returns whether anything was removed.
    pub async fn remove(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
    ) -> StoreResult<bool> {
        validate_snowflake("guild_id", guild_id)?;
        validate_snowflake("target", target)?;
        Ok(self.backend.delete_temporary_actions(guild_id, target, kind).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryBackend;

    #[tokio::test]
    async fn test_create_replaces_existing() {
        let backend = Arc::new(MemoryBackend::new());
        let actions = TemporaryActionRepository::new(backend.clone());

        actions
            .create("100", "300", TemporaryActionKind::ChannelLock, Duration::minutes(5))
            .await
            .unwrap();
        let id = actions
            .create("100", "300", TemporaryActionKind::ChannelLock, Duration::minutes(10))
            .await
            .unwrap();
        actions
            .create("100", "300", TemporaryActionKind::RaidLock, Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(actions.active("100").await.unwrap().len(), 2);
        let lock = actions
            .find("100", "300", TemporaryActionKind::ChannelLock)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lock.id.map(|id| id.to_hex()), Some(id));
        assert_eq!(backend.stored_temporary_actions(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let actions = TemporaryActionRepository::new(Arc::new(MemoryBackend::new()));
        actions
            .create("100", "200", TemporaryActionKind::Mute, Duration::minutes(5))
            .await
            .unwrap();

        assert!(actions.remove("100", "200", TemporaryActionKind::Mute).await.unwrap());
        assert!(!actions.remove("100", "200", TemporaryActionKind::Mute).await.unwrap());
        assert!(actions.active("100").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_ttl_is_rejected() {
        let actions = TemporaryActionRepository::new(Arc::new(MemoryBackend::new()));
        let result = actions
            .create("100", "200", TemporaryActionKind::Timeout, Duration::zero())
            .await;
        assert!(matches!(result, Err(StoreError::Validation { field: "ttl", .. })));
    }

    #[tokio::test]
    async fn test_expired_actions_are_swept() {
        let backend = Arc::new(MemoryBackend::with_sweep_interval(
            std::time::Duration::from_millis(20),
        ));
        let actions = TemporaryActionRepository::new(backend.clone());
        assert!(actions.ensure_expiry_policy().await);

        actions
            .create("100", "300", TemporaryActionKind::RaidLock, Duration::milliseconds(50))
            .await
            .unwrap();
        actions
            .create("100", "301", TemporaryActionKind::RaidLock, Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(actions.active("100").await.unwrap().len(), 2);

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        let active = actions.active("100").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].target, "301");
        assert_eq!(backend.stored_temporary_actions(), 1);
    }
}
