//! Level service
//!
//! Loads a pair's record, applies one engine operation and saves it in a
//! single versioned write. A concurrent save from the partner surfaces as a
//! conflict; the whole load-mutate-save cycle is then replayed against the
//! fresh record.

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::{Clock, Moment};
use crate::db::schemas::{ConnectionStatus, UserDoc};
use crate::db::{LevelStore, Store, UserStore};
use crate::level::{AwardOutcome, ConnectionLevel, MessageOutcome, RitualKind, RitualOutcome};
use crate::types::{PromittoError, Result};

/// Default number of replays after a version conflict
pub const DEFAULT_SAVE_RETRIES: u32 = 3;

/// Reason recorded for manual awards without one
const MANUAL_REASON: &str = "Manual points";

pub struct LevelService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    save_retries: u32,
}

impl LevelService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            save_retries: DEFAULT_SAVE_RETRIES,
        }
    }

    pub fn with_save_retries(mut self, retries: u32) -> Self {
        self.save_retries = retries;
        self
    }

    pub fn now(&self) -> Moment {
        self.clock.now()
    }

    /// The user's record, starting a new ritual day if one has begun
    pub async fn current_level(&self, user_id: &ObjectId) -> Result<ConnectionLevel> {
        let (_, record) = self
            .update(user_id, |record, now| Ok(((), record.reset_daily_rituals(now))))
            .await?
            .ok_or_else(level_not_found)?;
        Ok(record)
    }

    /// Mark a ritual done for the user today.
    ///
    /// `ritual` is only checked once the pair's record is known to exist, so
    /// a missing record wins over an unknown ritual name.
    pub async fn complete_ritual(
        &self,
        user_id: &ObjectId,
        ritual: &str,
    ) -> Result<(RitualOutcome, ConnectionLevel)> {
        self.update(user_id, |record, now| {
            let role = record.role_of(user_id).ok_or_else(level_not_found)?;
            let kind: RitualKind = ritual.parse()?;
            let outcome = record.complete_ritual(kind, role, now)?;
            Ok((outcome, true))
        })
        .await?
        .ok_or_else(level_not_found)
    }

    /// Award points by hand. `points` must be at least 1.
    pub async fn add_points(
        &self,
        user_id: &ObjectId,
        points: i64,
        reason: Option<&str>,
    ) -> Result<(AwardOutcome, ConnectionLevel)> {
        if points < 1 {
            return Err(PromittoError::Validation("Points must be positive".into()));
        }
        let reason = reason.unwrap_or(MANUAL_REASON);

        self.update(user_id, |record, now| {
            Ok((record.award_points(points, reason, now), true))
        })
        .await?
        .ok_or_else(level_not_found)
    }

    /// Account for a message the user just sent to their partner.
    ///
    /// `recent_messages` is the pair's message count over the trailing hour,
    /// including this one. Returns `None` when the pair has no record.
    pub async fn record_message(
        &self,
        sender: &ObjectId,
        recent_messages: u64,
    ) -> Result<Option<MessageOutcome>> {
        let outcome = self
            .update(sender, |record, now| {
                Ok((record.record_message(recent_messages, now), true))
            })
            .await?;
        Ok(outcome.map(|(outcome, _)| outcome))
    }

    /// Connect two users and create their record with the connection bonus.
    ///
    /// `sender` becomes `user1`, `recipient` becomes `user2`.
    pub async fn establish_connection(
        &self,
        sender: &ObjectId,
        recipient: &ObjectId,
    ) -> Result<ConnectionLevel> {
        if sender == recipient {
            return Err(PromittoError::Validation("Cannot connect to yourself".into()));
        }

        let sender_doc = self.require_user(sender).await?;
        let recipient_doc = self.require_user(recipient).await?;
        if sender_doc.partner().is_some() || recipient_doc.partner().is_some() {
            return Err(PromittoError::BadRequest("Already connected".into()));
        }

        let now = self.clock.now();
        let mut record = ConnectionLevel::new(*sender, *recipient, now.at);
        record.establish(now);
        let record = self.store.insert_level(record).await?;

        self.store
            .set_connection(sender, ConnectionStatus::Connected, Some(*recipient), Some(now.at))
            .await?;
        self.store
            .set_connection(recipient, ConnectionStatus::Connected, Some(*sender), Some(now.at))
            .await?;

        info!(pair = %record.pair_key, "Connection established");
        Ok(record)
    }

    /// Break the user's connection, deleting all shared progress
    pub async fn break_connection(&self, user_id: &ObjectId) -> Result<()> {
        let user = self.require_user(user_id).await?;
        if user.connection_status != ConnectionStatus::Connected {
            return Err(PromittoError::Validation("You are not connected to anyone".into()));
        }

        let mut deleted = 0;
        if let Some(partner) = user.connected_to {
            deleted = self.store.delete_levels(user_id, &partner).await?;

            match self
                .store
                .set_connection(&partner, ConnectionStatus::None, None, None)
                .await
            {
                Ok(()) | Err(PromittoError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.store
            .set_connection(user_id, ConnectionStatus::None, None, None)
            .await?;

        warn!(user = %user_id, deleted, "Connection broken, progress deleted");
        Ok(())
    }

    async fn require_user(&self, user_id: &ObjectId) -> Result<UserDoc> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| PromittoError::NotFound("User not found".into()))
    }

    /// Run `op` against the user's record and persist the result.
    ///
    /// `op` returns its output plus whether the record changed; unchanged
    /// records are not written. Returns `None` if the pair has no record.
    async fn update<R, F>(&self, user_id: &ObjectId, mut op: F) -> Result<Option<(R, ConnectionLevel)>>
    where
        F: FnMut(&mut ConnectionLevel, Moment) -> Result<(R, bool)> + Send,
        R: Send,
    {
        let user = self.require_user(user_id).await?;
        let partner = user.partner().ok_or(PromittoError::NotConnected)?;

        let mut attempt = 0;
        loop {
            let Some(mut record) = self.store.find_level(user_id, &partner).await? else {
                return Ok(None);
            };

            let (output, changed) = op(&mut record, self.clock.now())?;
            if !changed {
                return Ok(Some((output, record)));
            }

            match self.store.save_level(&mut record).await {
                Ok(()) => return Ok(Some((output, record))),
                Err(PromittoError::Conflict(detail)) if attempt < self.save_retries => {
                    attempt += 1;
                    warn!(pair = %record.pair_key, attempt, %detail, "Retrying after concurrent update");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn level_not_found() -> PromittoError {
    PromittoError::NotFound("Connection level not found".into())
}
