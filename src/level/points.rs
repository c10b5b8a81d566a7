//! Points, the leveling curve and feature unlocks

use serde::Serialize;
use tracing::info;

use super::{ConnectionLevel, Feature};
use crate::clock::Moment;

/// Highest reachable level; points keep accumulating past it
pub const MAX_LEVEL: u32 = 100;

/// Level thresholds that unlock a feature, checked on every level reached
pub const FEATURE_UNLOCKS: [(u32, Feature); 7] = [
    (5, Feature::VoiceMessages),
    (10, Feature::PhotoSharing),
    (15, Feature::VoiceCalls),
    (20, Feature::VideoCalls),
    (25, Feature::SharedJournal),
    (30, Feature::TimeCapsules),
    (50, Feature::CoupleChallenges),
];

/// Points required to go from `level` to `level + 1`: `floor(100 * 1.5^(level - 1))`.
///
/// Saturates at `i64::MAX` for levels where the curve leaves the integer range.
pub fn points_to_next_level(level: u32) -> i64 {
    let exponent = level.saturating_sub(1) as i32;
    (100.0 * 1.5_f64.powi(exponent)).floor() as i64
}

/// Result of a point award
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardOutcome {
    /// Level after the award (not a flag: the final level)
    pub leveled_up: u32,
    /// Points toward the next level after the award
    pub new_points: i64,
    #[serde(skip)]
    pub levels_gained: u32,
    #[serde(skip)]
    pub unlocked: Vec<Feature>,
}

impl ConnectionLevel {
    /// Add points and resolve every level-up they pay for.
    ///
    /// A single award can cross several levels. At [`MAX_LEVEL`] the points
    /// are kept but no further level-ups happen. Non-positive amounts change
    /// nothing.
    pub fn award_points(&mut self, amount: i64, reason: &str, now: Moment) -> AwardOutcome {
        let start_level = self.level;
        let mut unlocked = Vec::new();

        if amount > 0 {
            self.points = self.points.saturating_add(amount);
        }

        while self.points >= self.points_to_next_level && self.level < MAX_LEVEL {
            self.points -= self.points_to_next_level;
            self.level += 1;
            self.last_level_up = Some(now.at);
            self.points_to_next_level = points_to_next_level(self.level);

            if let Some(feature) = self.unlock_for_level() {
                unlocked.push(feature);
            }
        }

        let outcome = AwardOutcome {
            leveled_up: self.level,
            new_points: self.points,
            levels_gained: self.level - start_level,
            unlocked,
        };

        info!(
            pair = %self.pair_key,
            amount,
            reason,
            level = self.level,
            points = self.points,
            "Points awarded"
        );
        if outcome.levels_gained > 0 {
            info!(pair = %self.pair_key, from = start_level, to = self.level, "Level up");
        }
        for feature in &outcome.unlocked {
            info!(pair = %self.pair_key, %feature, "Feature unlocked");
        }

        outcome
    }

    /// Unlock the feature tied to the current level, if any and not already held
    fn unlock_for_level(&mut self) -> Option<Feature> {
        let feature = FEATURE_UNLOCKS
            .iter()
            .find(|(threshold, _)| *threshold == self.level)
            .map(|(_, feature)| *feature)?;

        if self.has_feature(feature) {
            return None;
        }
        self.unlocked_features.push(feature);
        Some(feature)
    }
}
