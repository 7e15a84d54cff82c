pub mod noop;
pub mod traits;

pub use noop::DecliningResolver;
pub use traits::{ResolutionOutcome, Resolver};
