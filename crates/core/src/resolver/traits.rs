use async_trait::async_trait;

use crate::error::StrategyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Solved,
    NotSolved,
}

/// Out-of-band resolution of a strategy failure, typically through user
/// interaction. Invoked with resolvable connection failures and with
/// disablements that cannot fall back.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, error: StrategyError) -> ResolutionOutcome;
}
