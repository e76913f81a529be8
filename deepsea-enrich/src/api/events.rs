//! Server-Sent Events for species renders

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events
///
/// Streams every `SpeciesViewRendered` and `SpeciesViewUnavailable` event,
/// so kiosk screens can follow both the cached and the fresh render.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    deepsea_common::sse::event_bus_sse_stream("deepsea-enrich", &state.event_bus)
}
