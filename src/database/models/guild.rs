//! Guild configuration document and its update operations.

use std::collections::BTreeMap;

use bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

use super::warning::WarningRecord;
use crate::database::error::{StoreError, StoreResult};

/// Mute bookkeeping for a muted member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MuteInfo {
    pub moderator_id: String,
    #[serde(default)]
    pub reason: String,
    /// Unix timestamp when the mute was applied
    pub muted_at: i64,
    /// Unix timestamp when the mute lifts (None = until unmuted)
    #[serde(default)]
    pub until: Option<i64>,
}

/// Ban bookkeeping for a banned member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BanInfo {
    pub moderator_id: String,
    #[serde(default)]
    pub reason: String,
    /// Unix timestamp when the ban was applied
    pub banned_at: i64,
}

/// Per-guild moderation configuration, one document per guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuildConfig {
    /// Guild snowflake, also the document key
    #[serde(rename = "_id")]
    pub guild_id: String,

    #[serde(default)]
    pub muted_role_id: u64,

    #[serde(default)]
    pub log_channel_id: u64,

    /// Moderator role IDs, insertion ordered and duplicate free
    #[serde(default)]
    pub mod_roles: Vec<u64>,

    #[serde(default)]
    pub muted_users: BTreeMap<String, MuteInfo>,

    #[serde(default)]
    pub banned_users: BTreeMap<String, BanInfo>,

    #[serde(default)]
    pub warning_users: BTreeMap<String, WarningRecord>,

    /// Bumped by the store on every write.
    #[serde(default)]
    pub revision: u64,
}

impl GuildConfig {
    /// Create a default guild document.
    pub fn new(guild_id: impl Into<String>, log_channel_id: u64) -> Self {
        Self {
            guild_id: guild_id.into(),
            muted_role_id: 0,
            log_channel_id,
            mod_roles: Vec::new(),
            muted_users: BTreeMap::new(),
            banned_users: BTreeMap::new(),
            warning_users: BTreeMap::new(),
            revision: 0,
        }
    }

    /// Warning record for a user, if any.
    pub fn warnings_for(&self, user_id: &str) -> Option<&WarningRecord> {
        self.warning_users.get(user_id)
    }

    /// Document form used for insert-if-absent, without the `_id` key.
    pub fn to_insert_document(&self) -> StoreResult<Document> {
        let mut document = bson::to_document(self)?;
        document.remove("_id");
        Ok(document)
    }
}

/// Merge patch for a guild document. Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GuildPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted_role_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_channel_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_roles: Option<Vec<u64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted_users: Option<BTreeMap<String, MuteInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_users: Option<BTreeMap<String, BanInfo>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_users: Option<BTreeMap<String, WarningRecord>>,
}

impl GuildPatch {
    #[must_use]
    pub fn muted_role(mut self, role_id: u64) -> Self {
        self.muted_role_id = Some(role_id);
        self
    }

    #[must_use]
    pub fn log_channel(mut self, channel_id: u64) -> Self {
        self.log_channel_id = Some(channel_id);
        self
    }

    #[must_use]
    pub fn mod_roles(mut self, roles: Vec<u64>) -> Self {
        let mut unique = Vec::with_capacity(roles.len());
        for role in roles {
            if !unique.contains(&role) {
                unique.push(role);
            }
        }
        self.mod_roles = Some(unique);
        self
    }

    #[must_use]
    pub fn muted_users(mut self, users: BTreeMap<String, MuteInfo>) -> Self {
        self.muted_users = Some(users);
        self
    }

    #[must_use]
    pub fn banned_users(mut self, users: BTreeMap<String, BanInfo>) -> Self {
        self.banned_users = Some(users);
        self
    }

    #[must_use]
    pub fn warning_users(mut self, users: BTreeMap<String, WarningRecord>) -> Self {
        self.warning_users = Some(users);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the patched fields of `guild`.
    pub fn apply_to(&self, guild: &mut GuildConfig) {
        if let Some(role) = self.muted_role_id {
            guild.muted_role_id = role;
        }
        if let Some(channel) = self.log_channel_id {
            guild.log_channel_id = channel;
        }
        if let Some(roles) = &self.mod_roles {
            guild.mod_roles = roles.clone();
        }
        if let Some(users) = &self.muted_users {
            guild.muted_users = users.clone();
        }
        if let Some(users) = &self.banned_users {
            guild.banned_users = users.clone();
        }
        if let Some(users) = &self.warning_users {
            guild.warning_users = users.clone();
        }
    }
}

/// A single write against a guild document.
///
/// Every variant maps onto one atomic update operator set, so concurrent
/// writers never lose each other's changes.
#[derive(Debug, Clone, PartialEq)]
pub enum GuildUpdate {
    /// `$set` of the patched fields. Upserts.
    Patch(GuildPatch),
    /// `$inc` the count, `$set` the last curse, `$push` onto the history.
    RecordWarning {
        user_id: String,
        word: String,
        at: i64,
    },
    /// `$unset` the user's warning entry.
    ClearWarnings { user_id: String },
    /// `$addToSet` a moderator role.
    AddModRole(u64),
    /// `$pull` a moderator role.
    RemoveModRole(u64),
    SetMute { user_id: String, info: MuteInfo },
    ClearMute { user_id: String },
    SetBan { user_id: String, info: BanInfo },
    ClearBan { user_id: String },
}

impl GuildUpdate {
    /// Whether the write may create a missing guild document.
    pub fn upserts(&self) -> bool {
        matches!(self, Self::Patch(_))
    }

    /// MongoDB update document. Always bumps `revision`.
    pub fn to_document(&self) -> StoreResult<Document> {
        let mut update = match self {
            Self::Patch(patch) => {
                let set = bson::to_document(patch)?;
                if set.is_empty() {
                    Document::new()
                } else {
                    doc! { "$set": set }
                }
            }
            Self::RecordWarning { user_id, word, at } => {
                let path = format!("warning_users.{user_id}");
                doc! {
                    "$inc": { format!("{path}.count"): 1_i64 },
                    "$set": {
                        format!("{path}.last_curse"): word.as_str(),
                        format!("{path}.last_warning_time"): *at,
                    },
                    "$push": { format!("{path}.curse_words"): word.as_str() },
                }
            }
            Self::ClearWarnings { user_id } => {
                doc! { "$unset": { format!("warning_users.{user_id}"): "" } }
            }
            Self::AddModRole(role) => {
                doc! { "$addToSet": { "mod_roles": role_to_bson(*role)? } }
            }
            Self::RemoveModRole(role) => {
                doc! { "$pull": { "mod_roles": role_to_bson(*role)? } }
            }
            Self::SetMute { user_id, info } => {
                doc! { "$set": { format!("muted_users.{user_id}"): bson::to_bson(info)? } }
            }
            Self::ClearMute { user_id } => {
                doc! { "$unset": { format!("muted_users.{user_id}"): "" } }
            }
            Self::SetBan { user_id, info } => {
                doc! { "$set": { format!("banned_users.{user_id}"): bson::to_bson(info)? } }
            }
            Self::ClearBan { user_id } => {
                doc! { "$unset": { format!("banned_users.{user_id}"): "" } }
            }
        };

        match update.get_document_mut("$inc") {
            Ok(inc) => {
                inc.insert("revision", 1_i64);
            }
            Err(_) => {
                update.insert("$inc", doc! { "revision": 1_i64 });
            }
        }
        Ok(update)
    }

    /// Apply the same write to an in-memory document.
    pub fn apply_to(&self, guild: &mut GuildConfig) {
        match self {
            Self::Patch(patch) => patch.apply_to(guild),
            Self::RecordWarning { user_id, word, at } => {
                let record = guild
                    .warning_users
                    .entry(user_id.clone())
                    .or_insert_with(WarningRecord::empty);
                record.record(word, *at);
            }
            Self::ClearWarnings { user_id } => {
                guild.warning_users.remove(user_id);
            }
            Self::AddModRole(role) => {
                if !guild.mod_roles.contains(role) {
                    guild.mod_roles.push(*role);
                }
            }
            Self::RemoveModRole(role) => guild.mod_roles.retain(|r| r != role),
            Self::SetMute { user_id, info } => {
                guild.muted_users.insert(user_id.clone(), info.clone());
            }
            Self::ClearMute { user_id } => {
                guild.muted_users.remove(user_id);
            }
            Self::SetBan { user_id, info } => {
                guild.banned_users.insert(user_id.clone(), info.clone());
            }
            Self::ClearBan { user_id } => {
                guild.banned_users.remove(user_id);
            }
        }
        guild.revision += 1;
    }
}

// Snowflakes fit in 63 bits; bson has no unsigned integers.
fn role_to_bson(role_id: u64) -> StoreResult<Bson> {
    i64::try_from(role_id)
        .map(Bson::Int64)
        .map_err(|_| StoreError::validation("role_id", format!("{role_id} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ids_beyond_i64_are_rejected() {
        let err = GuildUpdate::AddModRole(u64::MAX).to_document().unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "role_id", .. }));
        assert!(GuildUpdate::RemoveModRole(1 << 63).to_document().is_err());

        let update = GuildUpdate::AddModRole(i64::MAX as u64).to_document().unwrap();
        assert_eq!(
            update.get_document("$addToSet").unwrap().get_i64("mod_roles").unwrap(),
            i64::MAX
        );
    }

    #[test]
    fn test_patch_serializes_only_supplied_fields() {
        let patch = GuildPatch::default().log_channel(42).mod_roles(vec![7, 8, 7]);
        let update = GuildUpdate::Patch(patch).to_document().unwrap();

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_i64("log_channel_id").unwrap(), 42);
        assert_eq!(set.get_array("mod_roles").unwrap().len(), 2);
        assert_eq!(update.get_document("$inc").unwrap().get_i64("revision").unwrap(), 1);
    }

    #[test]
    fn test_empty_patch_only_bumps_revision() {
        let update = GuildUpdate::Patch(GuildPatch::default()).to_document().unwrap();
        assert!(update.get("$set").is_none());
        assert_eq!(update.get_document("$inc").unwrap().get_i64("revision").unwrap(), 1);
    }

    #[test]
    fn test_record_warning_uses_atomic_operators() {
        let update = GuildUpdate::RecordWarning {
            user_id: "200".to_string(),
            word: "fuck".to_string(),
            at: 1_700_000_000,
        }
        .to_document()
        .unwrap();

        let inc = update.get_document("$inc").unwrap();
        assert_eq!(inc.get_i64("warning_users.200.count").unwrap(), 1);
        assert_eq!(inc.get_i64("revision").unwrap(), 1);

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("warning_users.200.last_curse").unwrap(), "fuck");
        assert_eq!(set.get_i64("warning_users.200.last_warning_time").unwrap(), 1_700_000_000);

        let push = update.get_document("$push").unwrap();
        assert_eq!(push.get_str("warning_users.200.curse_words").unwrap(), "fuck");
    }

    #[test]
    fn test_apply_patch_leaves_absent_fields() {
        let mut guild = GuildConfig::new("100", 5);
        guild.mod_roles.push(9);

        GuildUpdate::Patch(GuildPatch::default().muted_role(3)).apply_to(&mut guild);

        assert_eq!(guild.muted_role_id, 3);
        assert_eq!(guild.log_channel_id, 5);
        assert_eq!(guild.mod_roles, vec![9]);
        assert_eq!(guild.revision, 1);
    }

    #[test]
    fn test_mod_roles_stay_duplicate_free() {
        let mut guild = GuildConfig::new("100", 0);
        GuildUpdate::AddModRole(1).apply_to(&mut guild);
        GuildUpdate::AddModRole(2).apply_to(&mut guild);
        GuildUpdate::AddModRole(1).apply_to(&mut guild);
        assert_eq!(guild.mod_roles, vec![1, 2]);

        GuildUpdate::RemoveModRole(1).apply_to(&mut guild);
        assert_eq!(guild.mod_roles, vec![2]);
    }

    #[test]
    fn test_partial_document_reads_with_defaults() {
        let document = doc! { "_id": "100", "log_channel_id": 12_i64 };
        let guild: GuildConfig = bson::from_document(document).unwrap();
        assert_eq!(guild.log_channel_id, 12);
        assert!(guild.warning_users.is_empty());
        assert_eq!(guild.revision, 0);
    }
}
