//! In-memory store
//!
//! Used in dev mode when MongoDB is unreachable, and by tests. Applies the
//! same pair uniqueness and version checks as the MongoDB store.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::db::schemas::{ConnectionStatus, UserDoc};
use crate::db::store::{LevelStore, UserStore};
use crate::level::{pair_key, ConnectionLevel};
use crate::types::{PromittoError, Result};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<ObjectId, UserDoc>,
    /// Keyed by pair key
    levels: DashMap<String, ConnectionLevel>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        Ok(self.users.get(id).map(|user| user.clone()))
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<ObjectId> {
        let id = *user._id.get_or_insert_with(ObjectId::new);
        match self.users.entry(id) {
            Entry::Occupied(_) => Err(PromittoError::Conflict("Document already exists".into())),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(id)
            }
        }
    }

    async fn set_connection(
        &self,
        id: &ObjectId,
        status: ConnectionStatus,
        partner: Option<ObjectId>,
        connected_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| PromittoError::NotFound("User not found".into()))?;
        user.connection_status = status;
        user.connected_to = partner;
        user.connected_at = connected_at;
        user.metadata.touch();
        Ok(())
    }
}

#[async_trait::async_trait]
impl LevelStore for MemoryStore {
    async fn find_level(&self, a: &ObjectId, b: &ObjectId) -> Result<Option<ConnectionLevel>> {
        Ok(self.levels.get(&pair_key(a, b)).map(|record| record.clone()))
    }

    async fn insert_level(&self, mut record: ConnectionLevel) -> Result<ConnectionLevel> {
        match self.levels.entry(record.pair_key.clone()) {
            Entry::Occupied(_) => Err(PromittoError::Conflict("Document already exists".into())),
            Entry::Vacant(slot) => {
                record._id = Some(ObjectId::new());
                record.version = 0;
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn save_level(&self, record: &mut ConnectionLevel) -> Result<()> {
        let mut stored = self
            .levels
            .get_mut(&record.pair_key)
            .ok_or_else(|| PromittoError::NotFound("Connection level not found".into()))?;

        if stored._id != record._id || stored.version != record.version {
            return Err(PromittoError::Conflict(format!(
                "connection level {} changed since version {}",
                record.pair_key, record.version
            )));
        }

        record.version += 1;
        record.metadata.touch();
        *stored = record.clone();
        Ok(())
    }

    async fn delete_levels(&self, a: &ObjectId, b: &ObjectId) -> Result<u64> {
        Ok(self.levels.remove(&pair_key(a, b)).map_or(0, |_| 1))
    }
}
