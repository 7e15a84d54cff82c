use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    error::StrategyErrorKind,
    types::{position::Position, primitives::StrategyName},
};

/// Observation delivered to the registered listener.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// First fix of a session, possibly stale.
    InitialFix(Position),
    UpdatedFix(Position),
    /// Terminal failure. Sticky until the next start.
    FatalError(FatalReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatalReason {
    pub strategy: StrategyName,
    pub kind: StrategyErrorKind,
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.kind, self.strategy)
    }
}

pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Ordered outbound channel scoped to one orchestrator instance.
#[derive(Debug, Clone)]
pub struct EventChannel {
    sender: mpsc::UnboundedSender<Notification>,
}

impl EventChannel {
    pub fn new() -> (Self, NotificationReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Returns false when no listener is attached anymore.
    pub fn publish(&self, notification: Notification) -> bool {
        match self.sender.send(notification) {
            Ok(()) => true,
            Err(mpsc::error::SendError(notification)) => {
                debug!(?notification, "no listener attached, notification dropped");
                false
            }
        }
    }

    pub fn has_listener(&self) -> bool {
        !self.sender.is_closed()
    }
}
