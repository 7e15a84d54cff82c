use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Cached fixes older than this are announced as initial, not updated.
    pub staleness_threshold: Duration,
    /// Upper bound on an outstanding resolution. `None` waits indefinitely.
    pub resolution_timeout: Option<Duration>,
}

impl OrchestratorConfig {
    pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_secs(60);

    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    pub fn with_resolution_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.resolution_timeout = timeout;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            staleness_threshold: Self::DEFAULT_STALENESS_THRESHOLD,
            resolution_timeout: None,
        }
    }
}
