pub mod core;
pub mod event;
pub mod handle;
pub mod result;

pub use core::Orchestrator;
pub use event::Event;
pub use handle::OrchestratorHandle;
pub use result::{EventResult, SessionStats, SessionSummary};
