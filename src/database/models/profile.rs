//! User profile models.
//!
//! Profiles are global (not per guild) and created on first reference.

use std::collections::BTreeMap;

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::database::error::{StoreError, StoreResult};

/// Counter fields under `stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileStat {
    MessagesSent,
    CommandsUsed,
    WarningsReceived,
}

impl ProfileStat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "messages_sent" => Some(Self::MessagesSent),
            "commands_used" => Some(Self::CommandsUsed),
            "warnings_received" => Some(Self::WarningsReceived),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessagesSent => "messages_sent",
            Self::CommandsUsed => "commands_used",
            Self::WarningsReceived => "warnings_received",
        }
    }

    /// Dotted document path of the counter.
    pub fn path(&self) -> String {
        format!("stats.{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    #[serde(default)]
    pub messages_sent: i64,
    #[serde(default)]
    pub commands_used: i64,
    #[serde(default)]
    pub warnings_received: i64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub last_active: DateTime<Utc>,
}

impl UserStats {
    pub fn get(&self, stat: ProfileStat) -> i64 {
        match stat {
            ProfileStat::MessagesSent => self.messages_sent,
            ProfileStat::CommandsUsed => self.commands_used,
            ProfileStat::WarningsReceived => self.warnings_received,
        }
    }

    fn get_mut(&mut self, stat: ProfileStat) -> &mut i64 {
        match stat {
            ProfileStat::MessagesSent => &mut self.messages_sent,
            ProfileStat::CommandsUsed => &mut self.commands_used,
            ProfileStat::WarningsReceived => &mut self.warnings_received,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Badge {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub awarded_at: DateTime<Utc>,
}

/// Global profile of a chat user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub preferences: BTreeMap<String, Value>,
    pub stats: UserStats,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, Value>,
}

impl UserProfile {
    /// Profile with default preferences and zeroed stats.
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, avatar_url: Option<String>) -> Self {
        let now = Utc::now();
        let preferences = BTreeMap::from([
            ("dm_notifications".to_string(), Value::Bool(true)),
            ("theme".to_string(), Value::String("dark".to_string())),
            ("language".to_string(), Value::String("en".to_string())),
        ]);

        Self {
            user_id: user_id.into(),
            username: username.into(),
            avatar_url,
            created_at: now,
            updated_at: now,
            bio: String::new(),
            preferences,
            stats: UserStats {
                messages_sent: 0,
                commands_used: 0,
                warnings_received: 0,
                last_active: now,
            },
            badges: Vec::new(),
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn has_badge(&self, name: &str) -> bool {
        self.badges.iter().any(|b| b.name == name)
    }

    /// Document form used for insert-if-absent, without the `_id` key.
    pub fn to_insert_document(&self) -> StoreResult<Document> {
        let mut document = bson::to_document(self)?;
        document.remove("_id");
        Ok(document)
    }
}

/// Editable profile details. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDetails {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// A single write against a profile. Every variant also stamps `updated_at`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileUpdate {
    Details(ProfileDetails),
    /// `$inc` a counter and refresh `stats.last_active`.
    IncrementStat { stat: ProfileStat, amount: i64 },
    /// `$push` a badge.
    AddBadge(Badge),
    /// `$pull` every badge with this name.
    RemoveBadge(String),
    SetPreference { key: String, value: Value },
}

impl ProfileUpdate {
    /// Reject preference keys that would escape their sub-document.
    pub fn validate(&self) -> StoreResult<()> {
        if let Self::SetPreference { key, .. } = self
            && (key.is_empty() || key.contains('.') || key.starts_with('$'))
        {
            return Err(StoreError::validation("preference", format!("bad key '{key}'")));
        }
        Ok(())
    }

    /// MongoDB update document.
    pub fn to_document(&self, now: DateTime<Utc>) -> StoreResult<Document> {
        let stamp = bson::DateTime::from_chrono(now);
        let document = match self {
            Self::Details(details) => {
                let mut set = doc! { "updated_at": stamp };
                if let Some(username) = &details.username {
                    set.insert("username", username.as_str());
                }
                if let Some(avatar) = &details.avatar_url {
                    set.insert("avatar_url", avatar.as_str());
                }
                if let Some(bio) = &details.bio {
                    set.insert("bio", bio.as_str());
                }
                doc! { "$set": set }
            }
            Self::IncrementStat { stat, amount } => doc! {
                "$inc": { stat.path(): *amount },
                "$set": { "stats.last_active": stamp, "updated_at": stamp },
            },
            Self::AddBadge(badge) => doc! {
                "$push": { "badges": bson::to_bson(badge)? },
                "$set": { "updated_at": stamp },
            },
            Self::RemoveBadge(name) => doc! {
                "$pull": { "badges": { "name": name.as_str() } },
                "$set": { "updated_at": stamp },
            },
            Self::SetPreference { key, value } => doc! {
                "$set": {
                    format!("preferences.{key}"): bson::to_bson(value)?,
                    "updated_at": stamp,
                },
            },
        };
        Ok(document)
    }

    /// Apply the same write to an in-memory profile.
    pub fn apply_to(&self, profile: &mut UserProfile, now: DateTime<Utc>) {
        match self {
            Self::Details(details) => {
                if let Some(username) = &details.username {
                    profile.username = username.clone();
                }
                if let Some(avatar) = &details.avatar_url {
                    profile.avatar_url = Some(avatar.clone());
                }
                if let Some(bio) = &details.bio {
                    profile.bio = bio.clone();
                }
            }
            Self::IncrementStat { stat, amount } => {
                *profile.stats.get_mut(*stat) += amount;
                profile.stats.last_active = now;
            }
            Self::AddBadge(badge) => profile.badges.push(badge.clone()),
            Self::RemoveBadge(name) => profile.badges.retain(|b| &b.name != name),
            Self::SetPreference { key, value } => {
                profile.preferences.insert(key.clone(), value.clone());
            }
        }
        profile.updated_at = now;
    }
}
