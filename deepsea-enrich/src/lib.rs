//! deepsea-enrich library interface
//!
//! Enriches local species records with three external catalogs (Wikipedia,
//! Wikidata, iNaturalist) behind a stale-while-revalidate cache, and serves
//! the resulting views over HTTP + SSE.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod presenter;
pub mod resolver;
pub mod sources;
pub mod types;
pub mod viewer;

pub use crate::error::{ApiError, ApiResult};

use crate::viewer::{SpeciesViewer, ViewTracker};
use axum::Router;
use chrono::{DateTime, Utc};
use deepsea_common::events::EventBus;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Event bus capacity (renders buffered per SSE subscriber)
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Most kiosk displays tracked at once
pub const MAX_DISPLAYS: usize = 64;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub viewer: SpeciesViewer,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// View tracker per kiosk display
    pub displays: Arc<RwLock<HashMap<String, Arc<ViewTracker>>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(viewer: SpeciesViewer, event_bus: EventBus) -> Self {
        Self {
            viewer,
            event_bus,
            displays: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Tracker for a display, created on first use
    ///
    /// Returns `None` when `MAX_DISPLAYS` displays are tracked and all of
    /// them have a view in flight.
    pub async fn tracker(&self, display: &str) -> Option<Arc<ViewTracker>> {
        if let Some(tracker) = self.displays.read().await.get(display) {
            return Some(tracker.clone());
        }

        let mut displays = self.displays.write().await;
        if !displays.contains_key(display) && displays.len() >= MAX_DISPLAYS {
            // A tracker held only by this map has no request or task using it
            let before = displays.len();
            displays.retain(|_, tracker| Arc::strong_count(tracker) > 1);
            debug!(evicted = before - displays.len(), "Evicted idle display trackers");
            if displays.len() >= MAX_DISPLAYS {
                return None;
            }
        }

        Some(
            displays
                .entry(display.to_string())
                .or_insert_with(|| Arc::new(ViewTracker::new()))
                .clone(),
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::species_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
