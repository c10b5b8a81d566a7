//! Time source for the leveling engine
//!
//! Streaks and rituals work on calendar days, level-ups record an instant.
//! A [`Moment`] carries both so engine operations never read the system clock.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// An instant together with the calendar day it falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    /// Wall-clock instant (stored timestamps use this)
    pub at: DateTime<Utc>,
    /// Calendar day in the service's day zone (streak/ritual comparisons use this)
    pub day: NaiveDate,
}

impl Moment {
    /// Build a moment whose day is computed in the given UTC offset
    pub fn with_offset(at: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            at,
            day: at.with_timezone(&offset).date_naive(),
        }
    }

    /// Build a moment whose day is the server's local calendar day
    pub fn local(at: DateTime<Utc>) -> Self {
        Self {
            at,
            day: at.with_timezone(&Local).date_naive(),
        }
    }
}

/// Source of the current [`Moment`]
pub trait Clock: Send + Sync {
    fn now(&self) -> Moment;
}

/// System clock, optionally pinned to a fixed UTC offset
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    /// Use the server's local timezone for day boundaries
    pub fn local() -> Self {
        Self { offset: None }
    }

    /// Use a fixed offset (in minutes east of UTC) for day boundaries
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes * 60).map(|offset| Self {
            offset: Some(offset),
        })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Moment {
        let at = Utc::now();
        match self.offset {
            Some(offset) => Moment::with_offset(at, offset),
            None => Moment::local(at),
        }
    }
}

/// Manually driven clock for tests and replay tooling.
///
/// Days are computed in UTC.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    /// Move the clock forward (or backward, with a negative duration)
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Moment {
        let millis = self.millis.load(Ordering::SeqCst);
        let at = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
        Moment::with_offset(at, Utc.fix())
    }
}
