use std::sync::Arc;

use polyquery_core::AccessMode;
use polyquery_strategy::StrategyRegistry;

use crate::traits::QueryGenerator;

/// Dependencies shared by every step of a query saga.
pub struct QueryContext<G> {
    registry: Arc<StrategyRegistry>,
    generator: Arc<G>,
    access: AccessMode,
}

impl<G> Clone for QueryContext<G> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            generator: Arc::clone(&self.generator),
            access: self.access,
        }
    }
}

impl<G> QueryContext<G>
where
    G: QueryGenerator,
{
    pub fn new(registry: Arc<StrategyRegistry>, generator: Arc<G>, access: AccessMode) -> Self {
        Self {
            registry,
            generator,
            access,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    #[must_use]
    pub fn access(&self) -> AccessMode {
        self.access
    }
}
