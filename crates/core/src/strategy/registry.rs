use crate::{
    strategy::traits::Strategy,
    types::{primitives::StrategyName, selector::StrategyRole},
};

/// One strategy instance per role, owned by the orchestrator.
pub struct StrategyRegistry {
    primary: Box<dyn Strategy>,
    fallback: Box<dyn Strategy>,
}

impl StrategyRegistry {
    pub fn new<P, F>(primary: P, fallback: F) -> Self
    where
        P: Strategy + 'static,
        F: Strategy + 'static,
    {
        Self {
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    }

    pub fn get_mut(&mut self, role: StrategyRole) -> &mut dyn Strategy {
        match role {
            StrategyRole::Primary => self.primary.as_mut(),
            StrategyRole::Fallback => self.fallback.as_mut(),
        }
    }

    pub fn name(&self, role: StrategyRole) -> StrategyName {
        match role {
            StrategyRole::Primary => self.primary.name(),
            StrategyRole::Fallback => self.fallback.name(),
        }
    }

    pub fn is_primary(&self, strategy: StrategyName) -> bool {
        self.primary.name() == strategy
    }
}
