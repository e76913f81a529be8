//! Concurrent fetch-and-merge
//!
//! Issues one fetch per resolved identifier, all in flight together, and waits
//! for every one of them to settle before assembling the bundle. A source
//! without an identifier contributes an absent payload without any network
//! call. One source failing never affects another's payload.

use crate::sources::SourceSet;
use crate::types::{
    EnrichmentBundle, Payload, ResolvedIdentifiers, SourceAdapter, SourceEntry, SourceIdentifier,
};
use deepsea_common::api::SourceKind;
use tracing::debug;

/// All-settled fetch aggregator
pub struct Aggregator {
    sources: SourceSet,
}

impl Aggregator {
    pub fn new(sources: SourceSet) -> Self {
        Self { sources }
    }

    pub async fn aggregate(&self, resolved: &ResolvedIdentifiers) -> EnrichmentBundle {
        let encyclopedia_id = resolved.get(SourceKind::Encyclopedia);
        let knowledge_base_id = resolved.get(SourceKind::KnowledgeBase);
        let observation_id = resolved.get(SourceKind::Observation);

        let (encyclopedia, knowledge_base, observation) = tokio::join!(
            fetch_optional(self.sources.encyclopedia.as_ref(), encyclopedia_id),
            fetch_optional(self.sources.knowledge_base.as_ref(), knowledge_base_id),
            fetch_optional(self.sources.observation.as_ref(), observation_id),
        );

        let bundle = EnrichmentBundle {
            encyclopedia: entry(encyclopedia_id, encyclopedia),
            knowledge_base: entry(knowledge_base_id, knowledge_base),
            observation: entry(observation_id, observation),
        };

        debug!(
            payloads = bundle.payload_count(),
            completeness = ?bundle.completeness(),
            "Aggregation settled"
        );

        bundle
    }
}

async fn fetch_optional<A: SourceAdapter + ?Sized>(
    adapter: &A,
    id: Option<&SourceIdentifier>,
) -> Option<Payload> {
    match id {
        Some(id) => adapter.fetch(id).await,
        None => None,
    }
}

fn entry(id: Option<&SourceIdentifier>, payload: Option<Payload>) -> SourceEntry {
    SourceEntry {
        id: id.cloned(),
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::MockSource;
    use crate::types::{Completeness, IdentifierOrigin, Resolution};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn resolved(encyclopedia: Option<&str>, knowledge_base: Option<&str>, observation: Option<&str>) -> ResolvedIdentifiers {
        let known = |id: Option<&str>| id.map(|id| Resolution::new(SourceIdentifier::new(id), IdentifierOrigin::Known));
        ResolvedIdentifiers {
            encyclopedia: known(encyclopedia),
            knowledge_base: known(knowledge_base),
            observation: known(observation),
        }
    }

    fn sources(encyclopedia: MockSource, knowledge_base: MockSource, observation: MockSource) -> (SourceSet, [Arc<MockSource>; 3]) {
        let encyclopedia = Arc::new(encyclopedia);
        let knowledge_base = Arc::new(knowledge_base);
        let observation = Arc::new(observation);
        let set = SourceSet {
            encyclopedia: encyclopedia.clone(),
            knowledge_base: knowledge_base.clone(),
            observation: observation.clone(),
        };
        (set, [encyclopedia, knowledge_base, observation])
    }

    #[tokio::test]
    async fn test_all_fetches_succeed() {
        let (set, _) = sources(
            MockSource::new(SourceKind::Encyclopedia).with_payload("Giant squid", json!({"extract": "Deep."})),
            MockSource::new(SourceKind::KnowledgeBase).with_payload("Q188470", json!({"id": "Q188470"})),
            MockSource::new(SourceKind::Observation).with_payload("47459", json!({"id": 47459})),
        );

        let bundle = Aggregator::new(set)
            .aggregate(&resolved(Some("Giant squid"), Some("Q188470"), Some("47459")))
            .await;

        assert_eq!(bundle.completeness(), Completeness::Complete);
        assert_eq!(bundle.encyclopedia.id.as_ref().unwrap().as_str(), "Giant squid");
        assert_eq!(bundle.knowledge_base.payload, Some(json!({"id": "Q188470"})));
    }

    #[tokio::test]
    async fn test_one_failure_leaves_others_intact() {
        let (set, _) = sources(
            MockSource::new(SourceKind::Encyclopedia).with_payload("Giant squid", json!({"extract": "Deep."})),
            // No payload scripted: fetch answers absent
            MockSource::new(SourceKind::KnowledgeBase),
            MockSource::new(SourceKind::Observation).with_payload("47459", json!({"id": 47459})),
        );

        let bundle = Aggregator::new(set)
            .aggregate(&resolved(Some("Giant squid"), Some("Q188470"), Some("47459")))
            .await;

        assert_eq!(bundle.completeness(), Completeness::Partial);
        assert!(bundle.encyclopedia.payload.is_some());
        assert!(bundle.observation.payload.is_some());
        // Identifier is kept even though the payload is absent
        assert_eq!(bundle.knowledge_base.id.as_ref().unwrap().as_str(), "Q188470");
        assert!(bundle.knowledge_base.payload.is_none());
    }

    #[tokio::test]
    async fn test_absent_identifier_makes_no_call() {
        let (set, [encyclopedia, knowledge_base, observation]) = sources(
            MockSource::new(SourceKind::Encyclopedia),
            MockSource::new(SourceKind::KnowledgeBase),
            MockSource::new(SourceKind::Observation).with_payload("47459", json!({"id": 47459})),
        );

        let bundle = Aggregator::new(set)
            .aggregate(&resolved(None, None, Some("47459")))
            .await;

        assert!(encyclopedia.calls().is_empty());
        assert!(knowledge_base.calls().is_empty());
        assert_eq!(observation.calls(), vec!["fetch:47459"]);
        assert_eq!(bundle.payload_count(), 1);
    }

    #[tokio::test]
    async fn test_fetches_are_in_flight_together() {
        // Each fetch blocks until all three have started; sequential fetching
        // would never get past the first one.
        let barrier = Arc::new(Barrier::new(3));
        let (set, _) = sources(
            MockSource::new(SourceKind::Encyclopedia).with_fetch_barrier(barrier.clone()),
            MockSource::new(SourceKind::KnowledgeBase).with_fetch_barrier(barrier.clone()),
            MockSource::new(SourceKind::Observation).with_fetch_barrier(barrier),
        );
        let aggregator = Aggregator::new(set);
        let ids = resolved(Some("a"), Some("b"), Some("c"));

        let result = tokio::time::timeout(Duration::from_secs(5), aggregator.aggregate(&ids)).await;

        assert!(result.is_ok(), "fetches must be issued concurrently");
    }
}
