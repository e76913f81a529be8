//! API module for types shared with rendering clients
//!
//! Contains ONLY plain serializable types. Each service wraps them in its own
//! HTTP handlers.

pub mod types;

pub use types::{AttributionLink, HeroImage, RenderPhase, SourceKind, SpeciesView};
