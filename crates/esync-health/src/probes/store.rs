use std::sync::Arc;

use esync_store::{OffchainStore, OrderFilter};

use crate::{HealthProbe, ProbeError, ProbeReport};

/// Trivial bounded query against the off-chain store.
pub struct DatabaseProbe {
    store: Arc<dyn OffchainStore>,
}

impl DatabaseProbe {
    pub fn new(store: Arc<dyn OffchainStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl HealthProbe for DatabaseProbe {
    fn component(&self) -> &str {
        "database"
    }

    async fn probe(&self) -> Result<ProbeReport, ProbeError> {
        let rows = self
            .store
            .query_orders(&OrderFilter::active().with_limit(1))
            .await?;
        Ok(ProbeReport::healthy().detail("sampled_orders", rows.len()))
    }
}
