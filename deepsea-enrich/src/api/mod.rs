//! HTTP API handlers for deepsea-enrich
//!
//! Views over HTTP + render events over SSE.

pub mod events;
pub mod health;
pub mod species;

pub use events::event_stream;
pub use health::health_routes;
pub use species::species_routes;
