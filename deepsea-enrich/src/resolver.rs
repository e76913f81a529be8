//! Identifier resolution
//!
//! Determines, per source, the identifier used for fetching:
//! 1. Encyclopedia: known title, else encyclopedia search on the common name
//! 2. Knowledge base: known id, else translated from the step 1 title, else absent
//! 3. Observation catalog: known id, else observation search on the common name
//!
//! Step 2 strictly follows step 1 because the knowledge base can only be
//! discovered through an encyclopedia title. Known identifiers are never
//! replaced by discovered ones.

use crate::sources::SourceSet;
use crate::types::{IdentifierOrigin, LocalRecord, Resolution, ResolvedIdentifiers};
use deepsea_common::api::SourceKind;
use tracing::debug;

/// Sequential per-source identifier resolver
pub struct Resolver {
    sources: SourceSet,
}

impl Resolver {
    pub fn new(sources: SourceSet) -> Self {
        Self { sources }
    }

    pub async fn resolve(&self, record: &LocalRecord) -> ResolvedIdentifiers {
        let encyclopedia = match record.known_identifier(SourceKind::Encyclopedia) {
            Some(id) => Some(Resolution::new(id.clone(), IdentifierOrigin::Known)),
            None => self
                .sources
                .encyclopedia
                .search(&record.common_name)
                .await
                .map(|id| Resolution::new(id, IdentifierOrigin::Searched)),
        };

        let knowledge_base = match record.known_identifier(SourceKind::KnowledgeBase) {
            Some(id) => Some(Resolution::new(id.clone(), IdentifierOrigin::Known)),
            None => match &encyclopedia {
                Some(title) => self
                    .sources
                    .knowledge_base
                    .from_encyclopedia(&title.id)
                    .await
                    .map(|id| Resolution::new(id, IdentifierOrigin::Derived)),
                None => None,
            },
        };

        let observation = match record.known_identifier(SourceKind::Observation) {
            Some(id) => Some(Resolution::new(id.clone(), IdentifierOrigin::Known)),
            None => self
                .sources
                .observation
                .search(&record.common_name)
                .await
                .map(|id| Resolution::new(id, IdentifierOrigin::Searched)),
        };

        let resolved = ResolvedIdentifiers {
            encyclopedia,
            knowledge_base,
            observation,
        };

        debug!(
            record_id = %record.id,
            encyclopedia = ?resolved.encyclopedia,
            knowledge_base = ?resolved.knowledge_base,
            observation = ?resolved.observation,
            "Identifiers resolved"
        );

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::MockSource;
    use crate::types::SourceIdentifier;
    use std::sync::Arc;

    fn giant_squid() -> LocalRecord {
        LocalRecord {
            id: "x".into(),
            common_name: "Giant squid".into(),
            ..Default::default()
        }
    }

    struct Fixture {
        encyclopedia: Arc<MockSource>,
        knowledge_base: Arc<MockSource>,
        observation: Arc<MockSource>,
    }

    impl Fixture {
        fn new(encyclopedia: MockSource, knowledge_base: MockSource, observation: MockSource) -> Self {
            Self {
                encyclopedia: Arc::new(encyclopedia),
                knowledge_base: Arc::new(knowledge_base),
                observation: Arc::new(observation),
            }
        }

        fn resolver(&self) -> Resolver {
            Resolver::new(SourceSet {
                encyclopedia: self.encyclopedia.clone(),
                knowledge_base: self.knowledge_base.clone(),
                observation: self.observation.clone(),
            })
        }
    }

    fn searching_fixture() -> Fixture {
        Fixture::new(
            MockSource::new(SourceKind::Encyclopedia).with_search("Giant squid", "Giant squid"),
            MockSource::new(SourceKind::KnowledgeBase).with_cross_ref("Giant squid", "Q188470"),
            MockSource::new(SourceKind::Observation).with_search("Giant squid", "47459"),
        )
    }

    #[tokio::test]
    async fn test_discovers_all_identifiers() {
        let fixture = searching_fixture();
        let resolved = fixture.resolver().resolve(&giant_squid()).await;

        let encyclopedia = resolved.encyclopedia.unwrap();
        assert_eq!(encyclopedia.id.as_str(), "Giant squid");
        assert_eq!(encyclopedia.origin, IdentifierOrigin::Searched);

        let knowledge_base = resolved.knowledge_base.unwrap();
        assert_eq!(knowledge_base.id.as_str(), "Q188470");
        assert_eq!(knowledge_base.origin, IdentifierOrigin::Derived);

        assert_eq!(resolved.observation.unwrap().id.as_str(), "47459");
    }

    #[tokio::test]
    async fn test_known_identifiers_skip_discovery() {
        let fixture = searching_fixture();
        let record = LocalRecord {
            wikipedia: Some(SourceIdentifier::new("Architeuthis")),
            wikidata: Some(SourceIdentifier::new("Q1")),
            inat_id: Some(SourceIdentifier::from(1)),
            ..giant_squid()
        };

        let resolved = fixture.resolver().resolve(&record).await;

        assert_eq!(resolved.get(SourceKind::Encyclopedia).unwrap().as_str(), "Architeuthis");
        assert_eq!(resolved.get(SourceKind::KnowledgeBase).unwrap().as_str(), "Q1");
        assert_eq!(resolved.get(SourceKind::Observation).unwrap().as_str(), "1");
        assert!(fixture.encyclopedia.calls().is_empty());
        assert!(fixture.knowledge_base.calls().is_empty());
        assert!(fixture.observation.calls().is_empty());
    }

    #[tokio::test]
    async fn test_knowledge_base_derived_from_known_encyclopedia_title() {
        let fixture = Fixture::new(
            MockSource::new(SourceKind::Encyclopedia),
            MockSource::new(SourceKind::KnowledgeBase).with_cross_ref("Architeuthis", "Q188470"),
            MockSource::new(SourceKind::Observation),
        );
        let record = LocalRecord {
            wikipedia: Some(SourceIdentifier::new("Architeuthis")),
            ..giant_squid()
        };

        let resolved = fixture.resolver().resolve(&record).await;

        assert_eq!(resolved.get(SourceKind::KnowledgeBase).unwrap().as_str(), "Q188470");
        assert_eq!(fixture.knowledge_base.calls(), vec!["from_encyclopedia:Architeuthis"]);
    }

    #[tokio::test]
    async fn test_knowledge_base_absent_without_encyclopedia_title() {
        let fixture = Fixture::new(
            MockSource::new(SourceKind::Encyclopedia),
            MockSource::new(SourceKind::KnowledgeBase).with_cross_ref("Giant squid", "Q188470"),
            MockSource::new(SourceKind::Observation).with_search("Giant squid", "47459"),
        );

        let resolved = fixture.resolver().resolve(&giant_squid()).await;

        assert!(resolved.encyclopedia.is_none());
        assert!(resolved.knowledge_base.is_none());
        // Knowledge base is never searched by name
        assert!(fixture.knowledge_base.calls().is_empty());
        // Observation resolution is independent of the encyclopedia
        assert_eq!(resolved.get(SourceKind::Observation).unwrap().as_str(), "47459");
    }

    #[tokio::test]
    async fn test_all_searches_failing_resolves_nothing() {
        let fixture = Fixture::new(
            MockSource::new(SourceKind::Encyclopedia),
            MockSource::new(SourceKind::KnowledgeBase),
            MockSource::new(SourceKind::Observation),
        );

        let resolved = fixture.resolver().resolve(&giant_squid()).await;

        assert_eq!(resolved, ResolvedIdentifiers::default());
    }
}
