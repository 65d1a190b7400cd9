//! Moderation action log models.

use std::collections::BTreeMap;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason stored when the moderator gave none.
pub const DEFAULT_REASON: &str = "No reason provided";

/// Kind of punitive action taken against a member.
///
/// Kinds written by other tools decode as [`ModerationAction::Other`], so an
/// unfamiliar entry never hides the rest of a history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Warning,
    Timeout,
    Mute,
    Unmute,
    Kick,
    Ban,
    Unban,
    #[serde(untagged)]
    Other(String),
}

impl ModerationAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Warning => "warning",
            Self::Timeout => "timeout",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Other(kind) => kind,
        }
    }
}

/// Append-only audit entry for one moderation action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModerationRecord {
    /// MongoDB document ID, assigned on insert
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub action_type: ModerationAction,
    pub guild_id: String,
    pub user_id: String,
    pub moderator_id: String,
    pub reason: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,

    /// Action duration in seconds, when the action is time-bounded
    #[serde(default)]
    pub duration: Option<u64>,

    /// Caller supplied fields. Kept apart from the fixed schema so they can
    /// never shadow it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ModerationRecord {
    pub fn new(
        action_type: ModerationAction,
        guild_id: impl Into<String>,
        user_id: impl Into<String>,
        moderator_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            action_type,
            guild_id: guild_id.into(),
            user_id: user_id.into(),
            moderator_id: moderator_id.into(),
            reason: DEFAULT_REASON.to_string(),
            timestamp: Utc::now(),
            duration: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the reason. Blank reasons keep the default.
    #[must_use]
    pub fn reason(mut self, reason: Option<&str>) -> Self {
        if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
            self.reason = reason.to_string();
        }
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Option<u64>) -> Self {
        self.duration = duration;
        self
    }

    /// Merge extra fields. On duplicate keys the later value wins.
    #[must_use]
    pub fn extra<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        self.extra.extend(fields);
        self
    }

    /// Hex form of the store-assigned ID.
    pub fn id_hex(&self) -> Option<String> {
        self.id.map(|id| id.to_hex())
    }
}
