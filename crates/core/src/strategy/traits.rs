use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    error::StrategyError,
    orchestrator::Event,
    types::{position::Position, primitives::StrategyName},
};

/// A pluggable source of fixes.
///
/// `start` delivers any trivially available last-known fix through the
/// reporter before subscribing to continuous updates. `stop` must be
/// idempotent and safe to call on a strategy that was never started.
pub trait Strategy: Send {
    fn name(&self) -> StrategyName;

    fn start(&mut self, reporter: StrategyReporter);

    fn stop(&mut self);
}

/// Upward callback sink handed to a strategy on every start.
///
/// Calls are marshalled into the orchestrator's queue, so they are safe from
/// any task or thread.
#[derive(Debug, Clone)]
pub struct StrategyReporter {
    strategy: StrategyName,
    queue: mpsc::UnboundedSender<Event>,
}

impl StrategyReporter {
    pub fn new(strategy: StrategyName, queue: mpsc::UnboundedSender<Event>) -> Self {
        Self { strategy, queue }
    }

    pub fn strategy(&self) -> StrategyName {
        self.strategy
    }

    pub fn location_obtained(&self, position: Position) {
        self.send(Event::LocationObtained {
            strategy: self.strategy,
            position,
        });
    }

    pub fn strategy_error(&self, error: StrategyError) {
        self.send(Event::StrategyFailed(error));
    }

    fn send(&self, event: Event) {
        if self.queue.send(event).is_err() {
            debug!(strategy = %self.strategy, "orchestrator gone, dropping strategy callback");
        }
    }
}
