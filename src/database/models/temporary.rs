//! Self-expiring moderation records (raid locks and similar).

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of time-bounded restriction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemporaryActionKind {
    RaidLock,
    ChannelLock,
    Mute,
    Timeout,
}

impl TemporaryActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RaidLock => "raid_lock",
            Self::ChannelLock => "channel_lock",
            Self::Mute => "mute",
            Self::Timeout => "timeout",
        }
    }
}

/// A restriction that stops existing at `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporaryAction {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub guild_id: String,

    /// User, channel or guild the restriction applies to
    pub target: String,

    pub kind: TemporaryActionKind,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    /// Stored as a BSON date so the TTL index can act on it.
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

impl TemporaryAction {
    /// Create an action that lives for `ttl` from now.
    pub fn new(
        guild_id: impl Into<String>,
        target: impl Into<String>,
        kind: TemporaryActionKind,
        ttl: chrono::Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            guild_id: guild_id.into(),
            target: target.into(),
            kind,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
