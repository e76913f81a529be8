//! In-memory source adapters for unit tests

use crate::types::{KnowledgeBaseAdapter, Payload, SourceAdapter, SourceIdentifier};
use async_trait::async_trait;
use deepsea_common::api::SourceKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

/// Scriptable adapter: answers from maps, records every call
pub struct MockSource {
    kind: SourceKind,
    searches: Mutex<HashMap<String, SourceIdentifier>>,
    payloads: Mutex<HashMap<SourceIdentifier, Payload>>,
    cross_refs: Mutex<HashMap<SourceIdentifier, SourceIdentifier>>,
    calls: Mutex<Vec<String>>,
    fetch_barrier: Option<Arc<Barrier>>,
}

impl MockSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            searches: Mutex::new(HashMap::new()),
            payloads: Mutex::new(HashMap::new()),
            cross_refs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fetch_barrier: None,
        }
    }

    pub fn with_search(self, query: &str, id: &str) -> Self {
        self.searches
            .lock()
            .unwrap()
            .insert(query.to_string(), SourceIdentifier::new(id));
        self
    }

    pub fn with_payload(self, id: &str, payload: Payload) -> Self {
        self.set_payload(id, payload);
        self
    }

    pub fn with_cross_ref(self, encyclopedia_id: &str, id: &str) -> Self {
        self.cross_refs
            .lock()
            .unwrap()
            .insert(SourceIdentifier::new(encyclopedia_id), SourceIdentifier::new(id));
        self
    }

    /// Make every fetch wait on a shared barrier before answering
    pub fn with_fetch_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.fetch_barrier = Some(barrier);
        self
    }

    /// Replace a payload between pipeline runs
    pub fn set_payload(&self, id: &str, payload: Payload) {
        self.payloads
            .lock()
            .unwrap()
            .insert(SourceIdentifier::new(id), payload);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(&self, query: &str) -> Option<SourceIdentifier> {
        self.record(format!("search:{}", query));
        self.searches.lock().unwrap().get(query).cloned()
    }

    async fn fetch(&self, id: &SourceIdentifier) -> Option<Payload> {
        self.record(format!("fetch:{}", id));
        if let Some(barrier) = &self.fetch_barrier {
            barrier.wait().await;
        }
        self.payloads.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl KnowledgeBaseAdapter for MockSource {
    async fn from_encyclopedia(
        &self,
        encyclopedia_id: &SourceIdentifier,
    ) -> Option<SourceIdentifier> {
        self.record(format!("from_encyclopedia:{}", encyclopedia_id));
        self.cross_refs.lock().unwrap().get(encyclopedia_id).cloned()
    }
}
