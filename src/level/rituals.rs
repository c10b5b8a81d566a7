//! Daily rituals
//!
//! Four check-ins per calendar day, each completed independently by both
//! partners. Both partners completing a ritual pays a pair bonus; all eight
//! completions in one day pay a one-time capstone bonus.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use super::{AwardOutcome, ConnectionLevel};
use crate::clock::Moment;
use crate::types::{PromittoError, Result};

/// Points for both partners completing the same ritual
pub const RITUAL_PAIR_BONUS: i64 = 15;
/// Points for completing every ritual by both partners in one day
pub const ALL_RITUALS_BONUS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RitualKind {
    MorningCheckIn,
    AfternoonCheckIn,
    EveningGratitude,
    EmotionShare,
}

impl RitualKind {
    pub const ALL: [RitualKind; 4] = [
        Self::MorningCheckIn,
        Self::AfternoonCheckIn,
        Self::EveningGratitude,
        Self::EmotionShare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MorningCheckIn => "morningCheckIn",
            Self::AfternoonCheckIn => "afternoonCheckIn",
            Self::EveningGratitude => "eveningGratitude",
            Self::EmotionShare => "emotionShare",
        }
    }
}

impl fmt::Display for RitualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RitualKind {
    type Err = PromittoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PromittoError::Validation("Invalid ritual type".into()))
    }
}

/// Which side of the pair is acting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User1,
    User2,
}

/// Completion flags for one ritual, one per role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualPair {
    #[serde(default)]
    pub user1: bool,
    #[serde(default)]
    pub user2: bool,
}

impl RitualPair {
    pub fn get(&self, role: Role) -> bool {
        match role {
            Role::User1 => self.user1,
            Role::User2 => self.user2,
        }
    }

    fn set(&mut self, role: Role) {
        match role {
            Role::User1 => self.user1 = true,
            Role::User2 => self.user2 = true,
        }
    }

    pub fn both(&self) -> bool {
        self.user1 && self.user2
    }
}

/// Ritual state for a single calendar day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRituals {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub morning_check_in: RitualPair,
    #[serde(default)]
    pub afternoon_check_in: RitualPair,
    #[serde(default)]
    pub evening_gratitude: RitualPair,
    #[serde(default)]
    pub emotion_share: RitualPair,
    #[serde(default)]
    pub all_completed: bool,
}

impl DailyRituals {
    /// Blank rituals for `day`
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            date: Some(day),
            ..Self::default()
        }
    }

    pub fn pair(&self, kind: RitualKind) -> &RitualPair {
        match kind {
            RitualKind::MorningCheckIn => &self.morning_check_in,
            RitualKind::AfternoonCheckIn => &self.afternoon_check_in,
            RitualKind::EveningGratitude => &self.evening_gratitude,
            RitualKind::EmotionShare => &self.emotion_share,
        }
    }

    fn pair_mut(&mut self, kind: RitualKind) -> &mut RitualPair {
        match kind {
            RitualKind::MorningCheckIn => &mut self.morning_check_in,
            RitualKind::AfternoonCheckIn => &mut self.afternoon_check_in,
            RitualKind::EveningGratitude => &mut self.evening_gratitude,
            RitualKind::EmotionShare => &mut self.emotion_share,
        }
    }

    /// Every ritual completed by both roles
    pub fn all_done(&self) -> bool {
        RitualKind::ALL.iter().all(|kind| self.pair(*kind).both())
    }

    /// Replace with a blank day if unset or older than `today`
    pub(super) fn reset_if_stale(&mut self, today: NaiveDate) -> bool {
        match self.date {
            Some(date) if date >= today => false,
            _ => {
                *self = Self::for_day(today);
                true
            }
        }
    }
}

/// Result of completing a ritual
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RitualOutcome {
    pub kind: RitualKind,
    /// Set when this completion made the ritual done by both roles
    pub pair_bonus: Option<AwardOutcome>,
    /// Set when this completion finished the whole day
    pub capstone_bonus: Option<AwardOutcome>,
}

impl ConnectionLevel {
    /// Mark `kind` done for `role` today.
    ///
    /// Starts a new ritual day first if needed. Fails with
    /// [`PromittoError::AlreadyCompleted`] if the role already did it today;
    /// nothing is awarded in that case.
    pub fn complete_ritual(
        &mut self,
        kind: RitualKind,
        role: Role,
        now: Moment,
    ) -> Result<RitualOutcome> {
        self.reset_daily_rituals(now);

        let pair = self.daily_rituals.pair_mut(kind);
        if pair.get(role) {
            return Err(PromittoError::AlreadyCompleted(kind));
        }
        pair.set(role);
        let both = pair.both();

        info!(pair = %self.pair_key, ritual = %kind, ?role, "Ritual completed");

        let pair_bonus = if both {
            Some(self.award_points(RITUAL_PAIR_BONUS, &format!("Both completed {}", kind), now))
        } else {
            None
        };

        let capstone_bonus = self.check_daily_completion(now);

        Ok(RitualOutcome {
            kind,
            pair_bonus,
            capstone_bonus,
        })
    }

    /// Pay the capstone bonus once per day when every ritual is double-completed
    pub fn check_daily_completion(&mut self, now: Moment) -> Option<AwardOutcome> {
        if !self.daily_rituals.all_done() || self.daily_rituals.all_completed {
            return None;
        }
        self.daily_rituals.all_completed = true;
        Some(self.award_points(ALL_RITUALS_BONUS, "All daily rituals completed", now))
    }
}
