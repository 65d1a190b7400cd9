//! MongoDB connection and backend.

use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use super::backend::{collections, StoreBackend};
use super::error::StoreResult;
use super::models::{
    CurseWordEntry, GuildConfig, GuildUpdate, ModerationRecord, ProfileStat, ProfileUpdate,
    TemporaryAction, TemporaryActionKind, UserProfile,
};

/// Name of the TTL index on `temporary_actions.expires_at`.
const EXPIRY_INDEX_NAME: &str = "expires_at_ttl";

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// `timeout` bounds server selection and connection establishment.
    ///
    /// # Errors
    /// Returns error if connection or the initial ping fails.
    pub async fn connect(uri: &str, db_name: &str, timeout: Duration) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);
        options.app_name.get_or_insert_with(|| "guildwarden".to_string());

        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        let db = client.database(db_name);

        Ok(Self { db })
    }

    /// Get a typed collection from the database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}

/// [`StoreBackend`] over a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoBackend {
    guilds: Collection<GuildConfig>,
    moderation: Collection<ModerationRecord>,
    temporary_actions: Collection<TemporaryAction>,
    curse_words: Collection<CurseWordEntry>,
    profiles: Collection<UserProfile>,
}

impl MongoBackend {
    pub fn new(db: &Database) -> Self {
        Self {
            guilds: db.collection(collections::GUILDS),
            moderation: db.collection(collections::MODERATION),
            temporary_actions: db.collection(collections::TEMPORARY_ACTIONS),
            curse_words: db.collection(collections::CURSE_WORDS),
            profiles: db.collection(collections::USER_PROFILES),
        }
    }
}

fn after_update(upsert: bool) -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .upsert(upsert)
        .return_document(ReturnDocument::After)
        .build()
}

fn inserted_id_string(id: &bson::Bson) -> String {
    match id.as_object_id() {
        Some(oid) => oid.to_hex(),
        None => id.to_string(),
    }
}

#[async_trait]
impl StoreBackend for MongoBackend {
    async fn find_guild(&self, guild_id: &str) -> StoreResult<Option<GuildConfig>> {
        let result = self.guilds.find_one(doc! { "_id": guild_id }).await?;
        debug!("DB get guild {}: {:?}", guild_id, result.is_some());
        Ok(result)
    }

    async fn all_guilds(&self) -> StoreResult<Vec<GuildConfig>> {
        let cursor = self.guilds.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn guild_exists(&self, guild_id: &str) -> StoreResult<bool> {
        let count = self
            .guilds
            .count_documents(doc! { "_id": guild_id })
            .await?;
        Ok(count > 0)
    }

    async fn insert_guild_if_absent(&self, guild: &GuildConfig) -> StoreResult<bool> {
        let raw: Collection<Document> = self.guilds.clone_with_type();
        let options = mongodb::options::UpdateOptions::builder()
            .upsert(true)
            .build();

        let result = raw
            .update_one(
                doc! { "_id": guild.guild_id.as_str() },
                doc! { "$setOnInsert": guild.to_insert_document()? },
            )
            .with_options(options)
            .await?;

        let created = result.upserted_id.is_some();
        debug!("Insert guild {} (created: {})", guild.guild_id, created);
        Ok(created)
    }

    async fn update_guild(
        &self,
        guild_id: &str,
        update: &GuildUpdate,
    ) -> StoreResult<Option<GuildConfig>> {
        let result = self
            .guilds
            .find_one_and_update(doc! { "_id": guild_id }, update.to_document()?)
            .with_options(after_update(update.upserts()))
            .await?;

        debug!("Updated guild {} (matched: {})", guild_id, result.is_some());
        Ok(result)
    }

    async fn insert_moderation_record(&self, record: &ModerationRecord) -> StoreResult<String> {
        let result = self.moderation.insert_one(record).await?;
        Ok(inserted_id_string(&result.inserted_id))
    }

    async fn moderation_history(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> StoreResult<Vec<ModerationRecord>> {
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": -1, "_id": -1 })
            .build();

        let cursor = self
            .moderation
            .find(doc! { "guild_id": guild_id, "user_id": user_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_curse_words(&self) -> StoreResult<u64> {
        Ok(self.curse_words.count_documents(doc! {}).await?)
    }

    async fn insert_curse_words(&self, entries: &[CurseWordEntry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.curse_words.insert_many(entries).await?;
        debug!("Inserted {} curse words", entries.len());
        Ok(())
    }

    async fn find_curse_word(&self, word: &str) -> StoreResult<Option<CurseWordEntry>> {
        Ok(self.curse_words.find_one(doc! { "word": word }).await?)
    }

    async fn list_curse_words(&self) -> StoreResult<Vec<CurseWordEntry>> {
        let cursor = self.curse_words.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_curse_word(&self, word: &str) -> StoreResult<bool> {
        let result = self.curse_words.delete_one(doc! { "word": word }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn ensure_expiry_policy(&self) -> StoreResult<()> {
        let options = IndexOptions::builder()
            .name(EXPIRY_INDEX_NAME.to_string())
            .expire_after(Duration::ZERO)
            .build();
        let index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(options)
            .build();

        // Re-creating an identical index is a no-op on the server.
        self.temporary_actions.create_index(index).await?;
        info!("TTL index on {}.expires_at ready", collections::TEMPORARY_ACTIONS);
        Ok(())
    }

    async fn insert_temporary_action(&self, action: &TemporaryAction) -> StoreResult<String> {
        let result = self.temporary_actions.insert_one(action).await?;
        Ok(inserted_id_string(&result.inserted_id))
    }

    async fn find_temporary_actions(
        &self,
        guild_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TemporaryAction>> {
        // The TTL monitor runs about once a minute; hide the stragglers.
        let filter = doc! {
            "guild_id": guild_id,
            "expires_at": { "$gt": bson::DateTime::from_chrono(now) },
        };
        let cursor = self.temporary_actions.find(filter).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_temporary_actions(
        &self,
        guild_id: &str,
        target: &str,
        kind: TemporaryActionKind,
    ) -> StoreResult<u64> {
        let filter = doc! {
            "guild_id": guild_id,
            "target": target,
            "kind": kind.as_str(),
        };
        let result = self.temporary_actions.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.profiles.find_one(doc! { "_id": user_id }).await?)
    }

    async fn insert_profile_if_absent(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        let stored = self
            .profiles
            .find_one_and_update(
                doc! { "_id": profile.user_id.as_str() },
                doc! { "$setOnInsert": profile.to_insert_document()? },
            )
            .with_options(after_update(true))
            .await?;

        // An upsert with ReturnDocument::After always yields a document.
        Ok(stored.unwrap_or_else(|| profile.clone()))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<UserProfile>> {
        let result = self
            .profiles
            .find_one_and_update(doc! { "_id": user_id }, update.to_document(Utc::now())?)
            .with_options(after_update(false))
            .await?;
        Ok(result)
    }

    async fn top_profiles(&self, stat: ProfileStat, limit: usize) -> StoreResult<Vec<UserProfile>> {
        // A zero limit means "no limit" to MongoDB.
        if limit == 0 {
            return Ok(Vec::new());
        }

        let options = FindOptions::builder()
            .sort(doc! { stat.path(): -1 })
            .limit(limit as i64)
            .build();

        let cursor = self.profiles.find(doc! {}).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }
}
