use crate::{
    error::StrategyError,
    resolver::ResolutionOutcome,
    types::{position::Position, primitives::StrategyName, selector::StrategySelector},
};

/// Everything that mutates an orchestrator arrives as one of these, in
/// order, through its queue.
#[derive(Debug)]
pub enum Event {
    Start(StrategySelector),
    Stop,
    /// Tear down, persist, and leave the run loop.
    Shutdown,
    LocationObtained {
        strategy: StrategyName,
        position: Position,
    },
    StrategyFailed(StrategyError),
    Resolution {
        ticket: u64,
        outcome: ResolutionOutcome,
    },
}
