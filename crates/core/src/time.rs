use chrono::{DateTime, Duration, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Returns true if this clock is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Measures how long a lesson view stayed open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonTimer {
    opened_at: DateTime<Utc>,
}

impl LessonTimer {
    #[must_use]
    pub fn start(at: DateTime<Utc>) -> Self {
        Self { opened_at: at }
    }

    #[must_use]
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Whole minutes spent, rounded up, never less than one.
    ///
    /// A clock that went backwards counts as the minimum.
    #[must_use]
    pub fn minutes_spent(&self, now: DateTime<Utc>) -> u32 {
        let seconds = (now - self.opened_at).num_seconds().max(0);
        let minutes = (seconds + 59) / 60;
        u32::try_from(minutes).unwrap_or(u32::MAX).max(1)
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_a_fixed_clock_moves_now() {
        let mut clock = fixed_clock();
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), fixed_now() + Duration::minutes(5));
    }

    #[test]
    fn timer_rounds_up_to_whole_minutes() {
        let timer = LessonTimer::start(fixed_now());
        assert_eq!(timer.minutes_spent(fixed_now()), 1);
        assert_eq!(timer.minutes_spent(fixed_now() + Duration::seconds(61)), 2);
        assert_eq!(timer.minutes_spent(fixed_now() + Duration::minutes(10)), 10);
        assert_eq!(timer.minutes_spent(fixed_now() - Duration::minutes(3)), 1);
    }
}
