use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Wall-clock milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn from_millis(value: u64) -> Self {
        Self(value)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed between `self` and `now`. Saturates to zero for future timestamps.
    pub fn age_at(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.0.saturating_sub(self.0))
    }

    pub fn saturating_add(&self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

/// Stable identifier of a strategy implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrategyName(&'static str);

impl StrategyName {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_saturates_for_future_timestamps() {
        let fix = Timestamp::from_millis(10_000);

        assert_eq!(fix.age_at(Timestamp::from_millis(12_500)), Duration::from_millis(2_500));
        assert_eq!(fix.age_at(Timestamp::from_millis(5_000)), Duration::ZERO);
    }

    #[test]
    fn saturating_add_clamps_at_max() {
        let near_end = Timestamp::from_millis(u64::MAX - 1);
        assert_eq!(
            near_end.saturating_add(Duration::from_secs(1)),
            Timestamp::from_millis(u64::MAX)
        );
    }
}
