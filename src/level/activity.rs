//! Activity triggers: connection established and messages sent

use tracing::info;

use super::{AwardOutcome, ConnectionLevel, StreakChange};
use crate::clock::Moment;

/// Points for a newly accepted connection
pub const CONNECTION_BONUS: i64 = 50;
/// Points for the pair's very first message
pub const FIRST_MESSAGE_BONUS: i64 = 10;
/// Points for every fifth message within the trailing hour
pub const QUALITY_CONVERSATION_BONUS: i64 = 20;

/// Messages in the trailing hour that count as a quality conversation
const QUALITY_CONVERSATION_EVERY: u64 = 5;

/// Result of recording a sent message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    pub first_message_bonus: Option<AwardOutcome>,
    pub streak: StreakChange,
    pub quality_bonus: Option<AwardOutcome>,
}

impl ConnectionLevel {
    /// Award the bonus for a freshly established connection
    pub fn establish(&mut self, now: Moment) -> AwardOutcome {
        self.award_points(CONNECTION_BONUS, "Connection established", now)
    }

    /// Account for a message sent between the pair.
    ///
    /// `recent_messages` is the number of messages the pair exchanged in the
    /// trailing 60 minutes, including this one.
    pub fn record_message(&mut self, recent_messages: u64, now: Moment) -> MessageOutcome {
        self.total_messages += 1;

        let first_message_bonus = if self.total_messages == 1 {
            Some(self.award_points(FIRST_MESSAGE_BONUS, "First message", now))
        } else {
            None
        };

        let streak = self.update_streak(now);

        let quality_bonus = if recent_messages >= QUALITY_CONVERSATION_EVERY
            && recent_messages % QUALITY_CONVERSATION_EVERY == 0
        {
            self.quality_conversations += 1;
            info!(
                pair = %self.pair_key,
                recent_messages,
                total = self.quality_conversations,
                "Quality conversation"
            );
            Some(self.award_points(QUALITY_CONVERSATION_BONUS, "Quality conversation", now))
        } else {
            None
        };

        MessageOutcome {
            first_message_bonus,
            streak,
            quality_bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_establish_awards_fifty() {
        let mut record = fresh_record();
        let outcome = record.establish(moment(2026, 8, 1));
        assert_eq!(outcome.new_points, 50);
        assert_eq!(record.level, 1);
    }

    #[test]
    fn test_first_message_bonus_only_once() {
        let mut record = fresh_record();
        let now = moment(2026, 8, 1);

        let first = record.record_message(1, now);
        assert!(first.first_message_bonus.is_some());
        assert_eq!(first.streak, StreakChange::Started);

        let second = record.record_message(2, now);
        assert!(second.first_message_bonus.is_none());
        assert_eq!(second.streak, StreakChange::Unchanged);

        assert_eq!(record.total_messages, 2);
        assert_eq!(record.points, FIRST_MESSAGE_BONUS);
    }

    #[test]
    fn test_quality_conversation_on_multiples_of_five() {
        let mut record = fresh_record();
        let now = moment(2026, 8, 1);
        record.total_messages = 10;

        for recent in 1..=10 {
            record.record_message(recent, now);
        }

        assert_eq!(record.quality_conversations, 2);
        assert_eq!(record.points, 2 * QUALITY_CONVERSATION_BONUS);
    }

    #[test]
    fn test_counters_not_touched_by_messages() {
        let mut record = fresh_record();
        record.record_message(5, moment(2026, 8, 1));
        assert_eq!(record.emotions_shared, 0);
        assert_eq!(record.activities_completed, 0);
        assert!(record.milestones.is_empty());
    }
}
