//! Species view endpoint
//!
//! `GET /species/:id?display=NAME` opens a view of one record on a display
//! and answers with the first render (cached when a cache entry exists,
//! otherwise fresh). The live refresh keeps running after the response; its
//! render reaches clients through `/events`.

use crate::error::{ApiError, ApiResult, UNAVAILABLE_MESSAGE};
use crate::viewer::{RenderEvent, RenderSink};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use deepsea_common::api::{RenderPhase, SpeciesView};
use deepsea_common::events::{DeepseaEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

/// Display used when a request names none
pub const DEFAULT_DISPLAY: &str = "default";

const MAX_DISPLAY_NAME_LEN: usize = 64;

/// Query parameters for GET /species/:id
#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub display: Option<String>,
}

/// First render of a view
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeciesViewResponse {
    pub view_id: Uuid,
    pub record_id: String,
    pub phase: RenderPhase,
    pub view: SpeciesView,
}

impl From<RenderEvent> for SpeciesViewResponse {
    fn from(event: RenderEvent) -> Self {
        Self {
            view_id: event.view_id,
            record_id: event.record_id,
            phase: event.phase,
            view: event.view,
        }
    }
}

/// Sink publishing every render on the event bus and handing the first one
/// back to the waiting request
struct DisplaySink {
    display: String,
    event_bus: EventBus,
    first: Mutex<Option<oneshot::Sender<RenderEvent>>>,
}

impl RenderSink for DisplaySink {
    fn render(&self, event: RenderEvent) {
        self.event_bus.emit_lossy(DeepseaEvent::SpeciesViewRendered {
            display: self.display.clone(),
            view_id: event.view_id,
            record_id: event.record_id.clone(),
            phase: event.phase,
            view: Box::new(event.view.clone()),
            timestamp: chrono::Utc::now(),
        });

        let first = self
            .first
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(tx) = first {
            // Receiver is gone when the client disconnected; nothing to do
            let _ = tx.send(event);
        }
    }
}

/// GET /species/:id
pub async fn get_species(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<SpeciesViewResponse>> {
    let display_name = parse_display(query.display)?;
    let tracker = state.tracker(&display_name).await.ok_or_else(|| {
        warn!(display = %display_name, "Display limit reached");
        ApiError::ServiceUnavailable(format!(
            "Too many displays; {} is not tracked",
            display_name
        ))
    })?;

    let (tx, rx) = oneshot::channel();
    let sink = Arc::new(DisplaySink {
        display: display_name.clone(),
        event_bus: state.event_bus.clone(),
        first: Mutex::new(Some(tx)),
    });

    let task = match state.viewer.open(&tracker, &record_id, sink) {
        Ok(task) => task,
        Err(e) => {
            info!(display = %display_name, record_id = %record_id, "{}", UNAVAILABLE_MESSAGE);
            state.event_bus.emit_lossy(DeepseaEvent::SpeciesViewUnavailable {
                display: display_name,
                record_id,
                timestamp: chrono::Utc::now(),
            });
            return Err(e.into());
        }
    };
    let view_id = task.view_id();

    // Sender is dropped unsent when the view was superseded before rendering
    match rx.await {
        Ok(event) => Ok(Json(event.into())),
        Err(_) => {
            warn!(display = %display_name, view_id = %view_id, record_id = %record_id, "View superseded before first render");
            Err(ApiError::Conflict(format!(
                "View of {} on display {} was superseded",
                record_id, display_name
            )))
        }
    }
}

fn parse_display(requested: Option<String>) -> ApiResult<String> {
    let name = match requested {
        None => return Ok(DEFAULT_DISPLAY.to_string()),
        Some(name) => name.trim().to_string(),
    };

    let valid = !name.is_empty()
        && name.len() <= MAX_DISPLAY_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(name)
    } else {
        Err(ApiError::BadRequest(format!("Invalid display name: {:?}", name)))
    }
}

/// Build species view routes
pub fn species_routes() -> Router<AppState> {
    Router::new().route("/species/:id", get(get_species))
}
