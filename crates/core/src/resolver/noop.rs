use async_trait::async_trait;

use crate::{
    error::StrategyError,
    resolver::traits::{ResolutionOutcome, Resolver},
};

/// Resolver for hosts without any resolution surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecliningResolver;

#[async_trait]
impl Resolver for DecliningResolver {
    async fn resolve(&self, _error: StrategyError) -> ResolutionOutcome {
        ResolutionOutcome::NotSolved
    }
}
