use async_trait::async_trait;

use crate::error::PersistenceError;

/// Durable key/value storage for orchestrator state across restarts.
///
/// # Implementations
///
/// - `MemoryStore`: in-process map, shared between clones
/// - `FileStore`: one file per key under a directory
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Upserts `value` under `key`.
    async fn save(&self, key: &str, value: String) -> Result<(), PersistenceError>;

    /// Returns `None` if nothing was ever saved under `key`.
    async fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;
}
