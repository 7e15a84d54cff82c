use std::{any::Any, fmt, path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::types::primitives::StrategyName;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access state store at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },

    #[error("unknown orchestrator state {0:?}")]
    UnknownState(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("orchestrator is no longer running")]
    Closed,
}

/// Classification of a strategy failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyErrorKind {
    /// The data source is turned off or unauthorized.
    Disabled,
    /// Transient failure. Recoverable through a resolver when a payload is attached.
    ConnectionFailure,
    /// No known resolution.
    Unrecoverable,
}

impl fmt::Display for StrategyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("strategy disabled"),
            Self::ConnectionFailure => f.write_str("connection failure"),
            Self::Unrecoverable => f.write_str("unrecoverable error"),
        }
    }
}

/// Opaque resolution data produced by a data source.
///
/// The orchestrator never inspects it; resolvers downcast to the concrete
/// type their data source attaches.
#[derive(Clone)]
pub struct ResolutionPayload(Arc<dyn Any + Send + Sync>);

impl ResolutionPayload {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for ResolutionPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResolutionPayload(..)")
    }
}

/// A failure reported by a strategy. Failures travel as data, never as `Err`.
#[derive(Debug, Clone, Error)]
#[error("{kind} reported by {strategy}")]
pub struct StrategyError {
    pub kind: StrategyErrorKind,
    pub strategy: StrategyName,
    pub payload: Option<ResolutionPayload>,
}

impl StrategyError {
    pub fn disabled(strategy: StrategyName) -> Self {
        Self {
            kind: StrategyErrorKind::Disabled,
            strategy,
            payload: None,
        }
    }

    pub fn connection_failure(strategy: StrategyName, payload: Option<ResolutionPayload>) -> Self {
        Self {
            kind: StrategyErrorKind::ConnectionFailure,
            strategy,
            payload,
        }
    }

    pub fn unrecoverable(strategy: StrategyName) -> Self {
        Self {
            kind: StrategyErrorKind::Unrecoverable,
            strategy,
            payload: None,
        }
    }

    /// Only connection failures carrying a payload can be handed to a resolver.
    pub fn is_resolvable(&self) -> bool {
        self.kind == StrategyErrorKind::ConnectionFailure && self.payload.is_some()
    }
}
