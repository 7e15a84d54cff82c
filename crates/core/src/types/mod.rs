pub mod config;
pub mod position;
pub mod primitives;
pub mod selector;
pub mod state;

pub use config::*;
pub use position::*;
pub use primitives::*;
pub use selector::*;
pub use state::*;
