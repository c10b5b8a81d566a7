//! Connection level engine
//!
//! Gamification state for one connected pair: points and the leveling curve,
//! feature unlocks, consecutive-day streaks and the four daily rituals.
//!
//! Every operation here mutates a [`ConnectionLevel`] in memory and returns an
//! outcome describing what changed. Nothing in this module performs I/O;
//! loading and saving the record is the job of [`crate::services`].

mod activity;
mod points;
mod rituals;
mod streak;

pub use activity::{MessageOutcome, CONNECTION_BONUS, FIRST_MESSAGE_BONUS, QUALITY_CONVERSATION_BONUS};
pub use points::{points_to_next_level, AwardOutcome, FEATURE_UNLOCKS, MAX_LEVEL};
pub use rituals::{DailyRituals, RitualKind, RitualOutcome, RitualPair, Role, ALL_RITUALS_BONUS, RITUAL_PAIR_BONUS};
pub use streak::{streak_bonus, StreakChange};

use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::Moment;
use crate::db::schemas::Metadata;

/// Features unlocked by reaching level thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    VoiceMessages,
    PhotoSharing,
    VoiceCalls,
    VideoCalls,
    SharedJournal,
    TimeCapsules,
    CoupleChallenges,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoiceMessages => "voice_messages",
            Self::PhotoSharing => "photo_sharing",
            Self::VoiceCalls => "voice_calls",
            Self::VideoCalls => "video_calls",
            Self::SharedJournal => "shared_journal",
            Self::TimeCapsules => "time_capsules",
            Self::CoupleChallenges => "couple_challenges",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named achievement entry (stored, not yet produced by any engine rule)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub name: String,
    #[serde(default)]
    pub achieved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub points: i64,
}

/// Gamification record for one connected pair.
///
/// `user1`/`user2` are arbitrary role assignments; the pair itself is
/// unordered and identified by `pair_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionLevel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Sorted `user:user` key, unique per pair
    pub pair_key: String,

    /// Optimistic concurrency counter, bumped on every save
    #[serde(default)]
    pub version: i64,

    pub user1: ObjectId,
    pub user2: ObjectId,

    pub level: u32,
    pub points: i64,
    pub points_to_next_level: i64,

    #[serde(default)]
    pub milestones: Vec<Milestone>,

    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub last_activity_date: Option<NaiveDate>,

    #[serde(default)]
    pub daily_rituals: DailyRituals,

    #[serde(default)]
    pub unlocked_features: Vec<Feature>,

    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub quality_conversations: u64,
    #[serde(default)]
    pub emotions_shared: u64,
    #[serde(default)]
    pub activities_completed: u64,

    pub connected_at: DateTime<Utc>,
    #[serde(default)]
    pub last_level_up: Option<DateTime<Utc>>,
}

impl ConnectionLevel {
    /// Fresh record for a newly connected pair (level 1, no points)
    pub fn new(user1: ObjectId, user2: ObjectId, connected_at: DateTime<Utc>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            pair_key: pair_key(&user1, &user2),
            version: 0,
            user1,
            user2,
            level: 1,
            points: 0,
            points_to_next_level: points_to_next_level(1),
            milestones: Vec::new(),
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            daily_rituals: DailyRituals::default(),
            unlocked_features: Vec::new(),
            total_messages: 0,
            quality_conversations: 0,
            emotions_shared: 0,
            activities_completed: 0,
            connected_at,
            last_level_up: None,
        }
    }

    /// Role of `user` in this record, if they belong to the pair
    pub fn role_of(&self, user: &ObjectId) -> Option<Role> {
        if *user == self.user1 {
            Some(Role::User1)
        } else if *user == self.user2 {
            Some(Role::User2)
        } else {
            None
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.unlocked_features.contains(&feature)
    }

    /// Lazily start a new ritual day. Returns true if the rituals were reset.
    pub fn reset_daily_rituals(&mut self, now: Moment) -> bool {
        self.daily_rituals.reset_if_stale(now.day)
    }
}

/// Canonical key for an unordered pair of users
pub fn pair_key(a: &ObjectId, b: &ObjectId) -> String {
    let (a, b) = (a.to_hex(), b.to_hex());
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn moment(y: i32, m: u32, d: u32) -> Moment {
        let at = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        Moment::with_offset(at, chrono::FixedOffset::east_opt(0).unwrap())
    }

    pub fn fresh_record() -> ConnectionLevel {
        ConnectionLevel::new(ObjectId::new(), ObjectId::new(), moment(2026, 5, 1).at)
    }
}
