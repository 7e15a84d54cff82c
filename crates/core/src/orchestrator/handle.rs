use tokio::sync::mpsc;

use crate::{error::ChannelError, orchestrator::Event, types::selector::StrategySelector};

/// Control surface for a running orchestrator. Every call is a non-blocking
/// send; outcomes arrive through the event channel.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    queue: mpsc::UnboundedSender<Event>,
}

impl OrchestratorHandle {
    pub(crate) fn new(queue: mpsc::UnboundedSender<Event>) -> Self {
        Self { queue }
    }

    pub fn start(&self, selector: StrategySelector) -> Result<(), ChannelError> {
        self.send(Event::Start(selector))
    }

    pub fn stop(&self) -> Result<(), ChannelError> {
        self.send(Event::Stop)
    }

    pub fn shutdown(&self) -> Result<(), ChannelError> {
        self.send(Event::Shutdown)
    }

    fn send(&self, event: Event) -> Result<(), ChannelError> {
        self.queue.send(event).map_err(|_| ChannelError::Closed)
    }
}
