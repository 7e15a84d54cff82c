use std::{fmt, path::Path};

use eyre::Result;
use serde_json::json;

use locus_core::{FileStore, OrchestratorState, Position, Snapshot};

#[derive(Debug, Clone, PartialEq)]
pub struct StatusOutput {
    pub state: OrchestratorState,
    pub position: Option<Position>,
}

impl StatusOutput {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "state": self.state.as_str(),
            "position": self.position,
        })
    }
}

impl fmt::Display for StatusOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "state: {}", self.state)?;
        match &self.position {
            Some(position) => write!(
                f,
                "last position: {:.6}, {:.6} (±{} m, {} at {} ms)",
                position.latitude,
                position.longitude,
                position.accuracy,
                position.provider,
                position.time.as_millis()
            ),
            None => write!(f, "last position: none"),
        }
    }
}

pub async fn status(store_dir: &Path) -> Result<StatusOutput> {
    let store = FileStore::new(store_dir);
    let snapshot = Snapshot::load(&store).await?;

    Ok(StatusOutput {
        state: snapshot.state,
        position: snapshot.position,
    })
}
