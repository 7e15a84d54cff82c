use crate::types::{position::Position, state::OrchestratorState};

pub enum EventResult {
    Continue,
    /// Shutdown was requested; the caller should tear down.
    Finished,
}

/// What an orchestrator leaves behind when it is torn down.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub state: OrchestratorState,
    pub last_position: Option<Position>,
    pub stats: SessionStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub initial_fixes: u32,
    pub updated_fixes: u32,
    pub fallbacks: u32,
    pub resolutions: u32,
}
