//! Storage traits for users and connection levels
//!
//! The service layer talks to these traits only, so the MongoDB store and the
//! in-memory store are interchangeable.

use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{ConnectionStatus, UserDoc, LEVEL_COLLECTION, USER_COLLECTION};
use crate::level::{pair_key, ConnectionLevel};
use crate::types::{PromittoError, Result};

/// User lookups and connection-state updates
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>>;

    async fn insert_user(&self, user: UserDoc) -> Result<ObjectId>;

    /// Overwrite a user's connection status, partner and connection time
    async fn set_connection(
        &self,
        id: &ObjectId,
        status: ConnectionStatus,
        partner: Option<ObjectId>,
        connected_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

/// Connection level persistence with optimistic concurrency
#[async_trait::async_trait]
pub trait LevelStore: Send + Sync {
    /// Record for the unordered pair `{a, b}`
    async fn find_level(&self, a: &ObjectId, b: &ObjectId) -> Result<Option<ConnectionLevel>>;

    /// Insert a new record. Fails with `Conflict` if the pair already has one.
    async fn insert_level(&self, record: ConnectionLevel) -> Result<ConnectionLevel>;

    /// Save `record` if nobody else saved since it was loaded.
    ///
    /// On success the record's version is bumped in place. A stale version
    /// yields `Conflict` and leaves the record untouched.
    async fn save_level(&self, record: &mut ConnectionLevel) -> Result<()>;

    /// Hard delete every record for the pair, returning how many were removed
    async fn delete_levels(&self, a: &ObjectId, b: &ObjectId) -> Result<u64>;
}

/// Everything the level service needs
pub trait Store: UserStore + LevelStore {}

impl<T: UserStore + LevelStore> Store for T {}

/// MongoDB-backed store
pub struct MongoStore {
    users: MongoCollection<UserDoc>,
    levels: MongoCollection<ConnectionLevel>,
}

impl MongoStore {
    /// Open both collections and ensure their indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            users: mongo.collection::<UserDoc>(USER_COLLECTION).await?,
            levels: mongo.collection::<ConnectionLevel>(LEVEL_COLLECTION).await?,
        })
    }
}

#[async_trait::async_trait]
impl UserStore for MongoStore {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "_id": id }).await
    }

    async fn insert_user(&self, user: UserDoc) -> Result<ObjectId> {
        self.users.insert_one(user).await
    }

    async fn set_connection(
        &self,
        id: &ObjectId,
        status: ConnectionStatus,
        partner: Option<ObjectId>,
        connected_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let update = doc! {
            "$set": {
                "connection_status": bson::to_bson(&status)?,
                "connected_to": partner,
                "connected_at": bson::to_bson(&connected_at)?,
                "metadata.updated_at": bson::DateTime::now(),
            }
        };

        let result = self.users.update_one(doc! { "_id": id }, update).await?;
        if result.matched_count == 0 {
            return Err(PromittoError::NotFound("User not found".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LevelStore for MongoStore {
    async fn find_level(&self, a: &ObjectId, b: &ObjectId) -> Result<Option<ConnectionLevel>> {
        self.levels.find_one(doc! { "pair_key": pair_key(a, b) }).await
    }

    async fn insert_level(&self, mut record: ConnectionLevel) -> Result<ConnectionLevel> {
        record.version = 0;
        let id = self.levels.insert_one(record.clone()).await?;
        record._id = Some(id);
        Ok(record)
    }

    async fn save_level(&self, record: &mut ConnectionLevel) -> Result<()> {
        let id = record
            ._id
            .ok_or_else(|| PromittoError::Internal("Cannot save an unsaved connection level".into()))?;
        let expected = record.version;

        let mut next = record.clone();
        next.version = expected + 1;

        let matched = self
            .levels
            .replace_one(doc! { "_id": id, "version": expected }, next)
            .await?;

        if !matched {
            debug!(pair = %record.pair_key, version = expected, "Stale connection level save");
            return Err(PromittoError::Conflict(format!(
                "connection level {} changed since version {}",
                record.pair_key, expected
            )));
        }

        record.version = expected + 1;
        record.metadata.touch();
        Ok(())
    }

    async fn delete_levels(&self, a: &ObjectId, b: &ObjectId) -> Result<u64> {
        self.levels
            .delete_many(doc! { "pair_key": pair_key(a, b) })
            .await
    }
}
