//! Consecutive-day activity streaks

use tracing::info;

use super::{AwardOutcome, ConnectionLevel};
use crate::clock::Moment;

/// One-time bonus for reaching exactly this streak length
pub fn streak_bonus(streak: u32) -> Option<(i64, &'static str)> {
    match streak {
        7 => Some((100, "7-day streak")),
        30 => Some((500, "30-day streak")),
        100 => Some((2000, "100-day streak")),
        _ => None,
    }
}

/// What a streak update did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreakChange {
    /// First qualifying activity ever
    Started,
    /// Already counted today
    Unchanged,
    /// Activity on the day after the last one
    Extended {
        streak: u32,
        bonus: Option<AwardOutcome>,
    },
    /// Gap of more than one day; the streak starts over at 1
    Reset { previous: u32 },
}

impl ConnectionLevel {
    /// Count today's activity toward the streak.
    ///
    /// Calling more than once per day has no effect.
    pub fn update_streak(&mut self, now: Moment) -> StreakChange {
        let today = now.day;

        let Some(last) = self.last_activity_date else {
            self.current_streak = 1;
            self.last_activity_date = Some(today);
            info!(pair = %self.pair_key, "Streak started");
            return StreakChange::Started;
        };

        match (today - last).num_days() {
            0 => StreakChange::Unchanged,
            1 => {
                self.current_streak += 1;
                self.last_activity_date = Some(today);
                self.longest_streak = self.longest_streak.max(self.current_streak);

                let streak = self.current_streak;
                info!(pair = %self.pair_key, streak, "Streak extended");

                let bonus = streak_bonus(streak)
                    .map(|(points, reason)| self.award_points(points, reason, now));
                StreakChange::Extended { streak, bonus }
            }
            _ => {
                let previous = self.current_streak;
                self.current_streak = 1;
                self.last_activity_date = Some(today);
                info!(pair = %self.pair_key, previous, "Streak broken");
                StreakChange::Reset { previous }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use chrono::Duration;

    fn day(offset: i64) -> Moment {
        let base = moment(2026, 7, 1);
        Moment {
            at: base.at + Duration::days(offset),
            day: base.day + Duration::days(offset),
        }
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let mut record = fresh_record();
        assert_eq!(record.update_streak(day(0)), StreakChange::Started);
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.last_activity_date, Some(day(0).day));
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let mut record = fresh_record();
        record.update_streak(day(0));
        assert_eq!(record.update_streak(day(0)), StreakChange::Unchanged);
        assert_eq!(record.current_streak, 1);
    }

    #[test]
    fn test_consecutive_days_extend() {
        let mut record = fresh_record();
        for offset in 0..4 {
            record.update_streak(day(offset));
        }
        assert_eq!(record.current_streak, 4);
        assert_eq!(record.longest_streak, 4);
    }

    #[test]
    fn test_gap_resets_to_one() {
        let mut record = fresh_record();
        for offset in 0..5 {
            record.update_streak(day(offset));
        }
        let change = record.update_streak(day(7));

        assert_eq!(change, StreakChange::Reset { previous: 5 });
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.longest_streak, 5);
    }

    #[test]
    fn test_clock_going_backwards_resets() {
        let mut record = fresh_record();
        record.update_streak(day(3));
        record.update_streak(day(4));
        assert_eq!(record.update_streak(day(2)), StreakChange::Reset { previous: 2 });
        assert_eq!(record.current_streak, 1);
    }

    #[test]
    fn test_seven_day_bonus_awarded_once() {
        let mut record = fresh_record();
        let mut bonuses = 0;
        for offset in 0..7 {
            if let StreakChange::Extended { bonus: Some(_), .. } = record.update_streak(day(offset)) {
                bonuses += 1;
            }
            // same-day repeat never re-awards
            record.update_streak(day(offset));
        }

        assert_eq!(record.current_streak, 7);
        assert_eq!(bonuses, 1);
        assert_eq!(record.level, 2);
        assert_eq!(record.points, 0);

        record.update_streak(day(7));
        assert_eq!(record.current_streak, 8);
        assert_eq!(record.level, 2);
        assert_eq!(record.points, 0);
    }

    #[test]
    fn test_hundred_day_run_pays_every_milestone() {
        let mut record = fresh_record();
        let mut paid = Vec::new();
        for offset in 0..100 {
            if let StreakChange::Extended { streak, bonus: Some(_) } = record.update_streak(day(offset)) {
                paid.push(streak);
            }
            if offset == 29 {
                // 100 + 500 = 600: level 4 with 125
                assert_eq!(record.level, 4);
                assert_eq!(record.points, 125);
            }
        }

        assert_eq!(paid, vec![7, 30, 100]);
        assert_eq!(record.current_streak, 100);
        assert_eq!(record.longest_streak, 100);
        // Same as a single 2600-point award: level 7 with 523
        assert_eq!(record.level, 7);
        assert_eq!(record.points, 523);
        assert_eq!(record.points_to_next_level, 1139);
    }

    #[test]
    fn test_streak_bonus_table() {
        assert_eq!(streak_bonus(7), Some((100, "7-day streak")));
        assert_eq!(streak_bonus(30), Some((500, "30-day streak")));
        assert_eq!(streak_bonus(100), Some((2000, "100-day streak")));
        assert_eq!(streak_bonus(8), None);
        assert_eq!(streak_bonus(31), None);
    }
}
