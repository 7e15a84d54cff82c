pub mod file;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use snapshot::{POSITION_KEY, STATE_KEY, Snapshot};
pub use traits::StateStore;
