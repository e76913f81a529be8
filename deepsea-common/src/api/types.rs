//! Shared view types
//!
//! The species view model is the output boundary of the enrichment
//! service: rendering code consumes it as-is, either from the HTTP response
//! or from `SpeciesViewRendered` events.

use serde::{Deserialize, Serialize};
use std::fmt;

// ========================================
// Sources
// ========================================

/// One of the three external catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Encyclopedia (Wikipedia)
    Encyclopedia,
    /// Structured knowledge base (Wikidata)
    KnowledgeBase,
    /// Naturalist observation catalog (iNaturalist)
    Observation,
}

impl SourceKind {
    /// All sources, in attribution order
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Encyclopedia,
        SourceKind::KnowledgeBase,
        SourceKind::Observation,
    ];

    /// Human-readable name of the backing service
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Encyclopedia => "Wikipedia",
            SourceKind::KnowledgeBase => "Wikidata",
            SourceKind::Observation => "iNaturalist",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Encyclopedia => "encyclopedia",
            SourceKind::KnowledgeBase => "knowledge_base",
            SourceKind::Observation => "observation",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ========================================
// View model
// ========================================

/// Which render of a view produced a view model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPhase {
    /// Rendered from the cached enrichment bundle
    Cached,
    /// Rendered from a bundle fetched during this view request
    Fresh,
}

/// Hero image selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum HeroImage {
    /// Photo supplied by the observation catalog
    Observation(String),
    /// Image shipped with the local dataset
    Local(String),
    /// No image known
    Placeholder,
}

/// Link to a source's canonical page for the resolved identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionLink {
    pub source: SourceKind,
    pub label: String,
    pub url: String,
}

/// Renderable species view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesView {
    pub record_id: String,
    /// Common name of the species
    pub title: String,
    pub hero_image: HeroImage,
    /// Image caption ("Also called ... Depth ... m.")
    pub caption: String,
    /// Encyclopedia summary, local summary, or empty
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub look_for: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    pub attribution: Vec<AttributionLink>,
}
