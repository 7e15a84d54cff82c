use tracing::warn;

use crate::{
    error::PersistenceError,
    persistence::traits::StateStore,
    types::{position::Position, state::OrchestratorState},
};

pub const STATE_KEY: &str = "orchestrator_state";
pub const POSITION_KEY: &str = "last_position";

/// The part of the orchestrator that survives a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub state: OrchestratorState,
    pub position: Option<Position>,
}

impl Snapshot {
    /// Unreadable records are logged and treated as absent; store failures propagate.
    pub async fn load(store: &dyn StateStore) -> Result<Self, PersistenceError> {
        let state = match store.load(STATE_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => {
                raw.trim().parse::<OrchestratorState>().unwrap_or_else(|err| {
                    warn!(error = %err, "ignoring persisted orchestrator state");
                    OrchestratorState::Idle
                })
            }
            _ => OrchestratorState::Idle,
        };

        let position = match store.load(POSITION_KEY).await? {
            Some(raw) => match serde_json::from_str::<Position>(&raw) {
                Ok(position) => Some(position),
                Err(source) => {
                    let err = PersistenceError::Decode {
                        key: POSITION_KEY.to_string(),
                        source,
                    };
                    warn!(error = %err, "ignoring persisted position");
                    None
                }
            },
            None => None,
        };

        Ok(Self { state, position })
    }

    /// Always writes the state; writes the position only when one exists.
    pub async fn save(&self, store: &dyn StateStore) -> Result<(), PersistenceError> {
        store.save(STATE_KEY, self.state.to_string()).await?;

        if let Some(position) = &self.position {
            let encoded =
                serde_json::to_string(position).map_err(|source| PersistenceError::Encode {
                    key: POSITION_KEY.to_string(),
                    source,
                })?;
            store.save(POSITION_KEY, encoded).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{persistence::MemoryStore, types::primitives::Timestamp};

    #[tokio::test]
    async fn empty_store_restores_idle_without_position() {
        let store = MemoryStore::new();

        let snapshot = Snapshot::load(&store).await.expect("load");

        assert_eq!(snapshot, Snapshot::default());
    }

    #[tokio::test]
    async fn restores_what_was_saved() {
        let store = MemoryStore::new();
        let snapshot = Snapshot {
            state: OrchestratorState::WaitingUpdatedFix,
            position: Some(
                Position::new("network", Timestamp::from_millis(42), -33.86, 151.2)
                    .with_accuracy(40.0),
            ),
        };

        snapshot.save(&store).await.expect("save");

        assert_eq!(Snapshot::load(&store).await.expect("load"), snapshot);
    }

    #[tokio::test]
    async fn corrupt_records_are_treated_as_absent() {
        let store = MemoryStore::new();
        store.insert(STATE_KEY, "WAITING_SOMETHING");
        store.insert(POSITION_KEY, "{\"latitude\":");

        let snapshot = Snapshot::load(&store).await.expect("load");

        assert_eq!(snapshot.state, OrchestratorState::Idle);
        assert!(snapshot.position.is_none());
    }

    #[tokio::test]
    async fn missing_position_leaves_previous_record_untouched() {
        let store = MemoryStore::new();
        store.insert(POSITION_KEY, "previous");

        Snapshot {
            state: OrchestratorState::Done,
            position: None,
        }
        .save(&store)
        .await
        .expect("save");

        assert_eq!(store.get(STATE_KEY).as_deref(), Some("Done"));
        assert_eq!(store.get(POSITION_KEY).as_deref(), Some("previous"));
    }
}
