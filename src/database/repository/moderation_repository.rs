//! Append-only moderation log.

use std::sync::Arc;

use tracing::debug;

use crate::database::backend::StoreBackend;
use crate::database::error::{validate_snowflake, StoreError, StoreResult};
use crate::database::models::ModerationRecord;

/// Repository for moderation records. Records are never cached.
pub struct ModerationRepository {
    backend: Arc<dyn StoreBackend>,
}

impl ModerationRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Append a record and return its store-assigned ID.
    pub async fn log(&self, record: &ModerationRecord) -> StoreResult<String> {
        validate_snowflake("guild_id", &record.guild_id)?;
        validate_snowflake("user_id", &record.user_id)?;
        validate_snowflake("moderator_id", &record.moderator_id)?;
        if record.action_type.as_str().trim().is_empty() {
            return Err(StoreError::validation("action_type", "must not be empty"));
        }

        let id = self.backend.insert_moderation_record(record).await?;
        debug!(
            "Logged {} of {} in guild {} as {}",
            record.action_type.as_str(),
            record.user_id,
            record.guild_id,
            id
        );
        Ok(id)
    }

    /// A member's records, newest first.
    pub async fn history(&self, guild_id: &str, user_id: &str) -> StoreResult<Vec<ModerationRecord>> {
        validate_snowflake("guild_id", guild_id)?;
        validate_snowflake("user_id", user_id)?;
        self.backend.moderation_history(guild_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryBackend;
    use crate::database::models::{ModerationAction, DEFAULT_REASON};
    use serde_json::json;

    fn repo() -> ModerationRepository {
        ModerationRepository::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let log = repo();
        let actions = [ModerationAction::Warning, ModerationAction::Timeout, ModerationAction::Ban];
        for action in actions {
            log.log(&ModerationRecord::new(action, "100", "200", "1"))
                .await
                .unwrap();
        }
        log.log(&ModerationRecord::new(ModerationAction::Kick, "100", "201", "1"))
            .await
            .unwrap();

        let history = log.history("100", "200").await.unwrap();
        let kinds: Vec<_> = history.iter().map(|r| r.action_type.clone()).collect();
        assert_eq!(
            kinds,
            vec![ModerationAction::Ban, ModerationAction::Timeout, ModerationAction::Warning]
        );
        assert!(history.iter().all(|r| r.id.is_some()));
    }

    #[tokio::test]
    async fn test_record_fields_round_trip() {
        let log = repo();
        let record = ModerationRecord::new(ModerationAction::Timeout, "100", "200", "1")
            .reason(Some("flooding"))
            .duration(Some(60))
            .extra([("channel".to_string(), json!("general"))]);

        let id = log.log(&record).await.unwrap();
        let stored = log.history("100", "200").await.unwrap().remove(0);

        assert_eq!(stored.id_hex(), Some(id));
        assert_eq!(stored.reason, "flooding");
        assert_eq!(stored.duration, Some(60));
        assert_eq!(stored.extra.get("channel"), Some(&json!("general")));
    }

    #[tokio::test]
    async fn test_default_reason() {
        let log = repo();
        log.log(&ModerationRecord::new(ModerationAction::Kick, "100", "200", "1").reason(None))
            .await
            .unwrap();

        let stored = log.history("100", "200").await.unwrap().remove(0);
        assert_eq!(stored.reason, DEFAULT_REASON);
        assert_eq!(stored.duration, None);
    }

    #[tokio::test]
    async fn test_custom_action_kind_round_trips() {
        let log = repo();
        let softban = ModerationAction::Other("softban".to_string());
        log.log(&ModerationRecord::new(softban.clone(), "100", "200", "1"))
            .await
            .unwrap();
        log.log(&ModerationRecord::new(ModerationAction::Warning, "100", "200", "1"))
            .await
            .unwrap();

        let history = log.history("100", "200").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action_type, softban);

        let blank = ModerationRecord::new(ModerationAction::Other(" ".to_string()), "100", "200", "1");
        assert!(matches!(
            log.log(&blank).await,
            Err(StoreError::Validation { field: "action_type", .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_moderator_is_rejected() {
        let log = repo();
        let record = ModerationRecord::new(ModerationAction::Ban, "100", "200", "");
        assert!(matches!(
            log.log(&record).await,
            Err(StoreError::Validation { field: "moderator_id", .. })
        ));
    }
}
