use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::primitives::Timestamp;

/// A single obtained fix.
///
/// Produced by a strategy, cached by the orchestrator and persisted across
/// restarts as an opaque JSON record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// When the fix was acquired.
    pub time: Timestamp,
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f32,
    /// Altitude above WGS84 in meters.
    pub altitude: f64,
    /// Bearing in degrees (0-360).
    pub bearing: f32,
    /// Ground speed in meters per second.
    pub speed: f32,
    /// Identifier of the provider that produced the fix ("gps", "network", "fused").
    pub provider: String,
}

impl Position {
    pub fn new(provider: impl Into<String>, time: Timestamp, latitude: f64, longitude: f64) -> Self {
        Self {
            time,
            latitude,
            longitude,
            accuracy: 0.0,
            altitude: 0.0,
            bearing: 0.0,
            speed: 0.0,
            provider: provider.into(),
        }
    }

    pub fn with_accuracy(mut self, accuracy: f32) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_bearing(mut self, bearing: f32) -> Self {
        self.bearing = bearing;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn age_at(&self, now: Timestamp) -> Duration {
        self.time.age_at(now)
    }

    /// A fix is stale once its age strictly exceeds `threshold`.
    pub fn is_stale(&self, now: Timestamp, threshold: Duration) -> bool {
        self.age_at(now) > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staleness_boundary_is_exclusive() {
        let threshold = Duration::from_secs(60);
        let fix = Position::new("gps", Timestamp::from_millis(1_000), 45.5, -73.6);

        assert!(!fix.is_stale(Timestamp::from_millis(61_000), threshold));
        assert!(fix.is_stale(Timestamp::from_millis(61_001), threshold));
    }

    #[test]
    fn survives_json_encoding() {
        let fix = Position::new("fused", Timestamp::from_millis(1_700_000_000_000), 48.85, 2.35)
            .with_accuracy(12.5)
            .with_altitude(35.0)
            .with_bearing(270.0)
            .with_speed(1.4);

        let encoded = serde_json::to_string(&fix).expect("encode");
        let decoded: Position = serde_json::from_str(&encoded).expect("decode");

        assert_eq!(decoded, fix);
    }
}
