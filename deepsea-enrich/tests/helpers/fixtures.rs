//! Records, viewers and app state for tests

use deepsea_common::events::EventBus;
use deepsea_enrich::cache::EnrichmentCache;
use deepsea_enrich::catalog::SpeciesCatalog;
use deepsea_enrich::config::SourceSettings;
use deepsea_enrich::pipeline::EnrichmentPipeline;
use deepsea_enrich::presenter::{Presenter, SourcePages};
use deepsea_enrich::sources::SourceSet;
use deepsea_enrich::types::LocalRecord;
use deepsea_enrich::viewer::{RenderEvent, RenderSink, SpeciesViewer};
use deepsea_enrich::AppState;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// `{id: "x", common_name: "Giant squid"}` with local fallbacks
pub fn giant_squid_record() -> LocalRecord {
    LocalRecord {
        id: "x".into(),
        common_name: "Giant squid".into(),
        summary: Some("A very large squid (local text).".into()),
        depth_min_m: 300.0,
        depth_max_m: 1000.0,
        image: Some("img/giant-squid.jpg".into()),
        ..Default::default()
    }
}

/// Viewer over HTTP adapters and the given cache
pub fn memory_viewer(
    settings: &SourceSettings,
    records: Vec<LocalRecord>,
    cache: Arc<EnrichmentCache>,
) -> SpeciesViewer {
    let sources = SourceSet::from_settings(settings).unwrap();
    SpeciesViewer::new(
        Arc::new(SpeciesCatalog::from_records(records)),
        Arc::new(EnrichmentPipeline::new(sources)),
        cache,
        Presenter::new(SourcePages::from_settings(settings)),
    )
}

/// App state over an in-memory cache
pub fn test_app_state(settings: &SourceSettings, records: Vec<LocalRecord>) -> AppState {
    let viewer = memory_viewer(settings, records, Arc::new(EnrichmentCache::in_memory()));
    AppState::new(viewer, EventBus::new(100))
}

/// Write records as a dataset file
pub fn write_dataset(records: &[LocalRecord]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(records).unwrap().as_bytes())
        .unwrap();
    file
}

/// Sink recording every delivered render
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RenderEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl RenderSink for RecordingSink {
    fn render(&self, event: RenderEvent) {
        self.events.lock().unwrap().push(event);
    }
}
