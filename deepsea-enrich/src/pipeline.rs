//! Resolve + aggregate in one pass
//!
//! Produces a fully-formed bundle or nothing; callers only ever see the final
//! bundle, never an intermediate state.

use crate::aggregator::Aggregator;
use crate::resolver::Resolver;
use crate::sources::SourceSet;
use crate::types::{EnrichmentBundle, LocalRecord};
use tracing::{debug, info};

/// Resolver followed by aggregator over one set of adapters
pub struct EnrichmentPipeline {
    resolver: Resolver,
    aggregator: Aggregator,
}

impl EnrichmentPipeline {
    pub fn new(sources: SourceSet) -> Self {
        Self {
            resolver: Resolver::new(sources.clone()),
            aggregator: Aggregator::new(sources),
        }
    }

    pub async fn run(&self, record: &LocalRecord) -> EnrichmentBundle {
        debug!(record_id = %record.id, phase = "resolving", "Enrichment started");
        let resolved = self.resolver.resolve(record).await;

        debug!(record_id = %record.id, phase = "aggregating", "Fetching source payloads");
        let bundle = self.aggregator.aggregate(&resolved).await;

        info!(
            record_id = %record.id,
            payloads = bundle.payload_count(),
            completeness = ?bundle.completeness(),
            "Enrichment finished"
        );

        bundle
    }
}
