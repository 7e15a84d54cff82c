pub mod clock;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod persistence;
pub mod resolver;
pub mod strategy;
pub mod types;

pub use clock::*;
pub use error::*;
pub use events::*;
pub use orchestrator::{
    Event, EventResult, Orchestrator, OrchestratorHandle, SessionStats, SessionSummary,
};
pub use persistence::*;
pub use resolver::*;
pub use strategy::*;
pub use types::*;
