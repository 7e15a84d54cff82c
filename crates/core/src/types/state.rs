use std::{fmt, str::FromStr};

use crate::error::PersistenceError;

/// States of the acquisition state machine.
///
/// Persisted by variant name so a restart resumes mid-flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    #[default]
    Idle,
    WaitingInitialFix,
    WaitingUpdatedFix,
    RecoveringFromError,
    AbortingUpdate,
    UnrecoverableError,
    Done,
}

impl OrchestratorState {
    pub const ALL: [Self; 7] = [
        Self::Idle,
        Self::WaitingInitialFix,
        Self::WaitingUpdatedFix,
        Self::RecoveringFromError,
        Self::AbortingUpdate,
        Self::UnrecoverableError,
        Self::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::WaitingInitialFix => "WaitingInitialFix",
            Self::WaitingUpdatedFix => "WaitingUpdatedFix",
            Self::RecoveringFromError => "RecoveringFromError",
            Self::AbortingUpdate => "AbortingUpdate",
            Self::UnrecoverableError => "UnrecoverableError",
            Self::Done => "Done",
        }
    }

    /// Whether the next fix is announced as the initial one.
    pub fn awaits_initial_fix(&self) -> bool {
        matches!(self, Self::Idle | Self::WaitingInitialFix)
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrchestratorState {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| PersistenceError::UnknownState(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_its_own_names() {
        for state in OrchestratorState::ALL {
            assert_eq!(state.to_string().parse::<OrchestratorState>().ok(), Some(state));
        }
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "WAITING_INITIAL_LOCATION".parse::<OrchestratorState>();
        assert!(matches!(err, Err(PersistenceError::UnknownState(_))));
    }
}
