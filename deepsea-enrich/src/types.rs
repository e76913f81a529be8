//! Core Types and Trait Definitions for deepsea-enrich
//!
//! Defines the data flowing through the enrichment pipeline:
//! - **LocalRecord:** species record from the kiosk dataset
//! - **SourceIdentifier:** identifier meaningful to one catalog
//! - **EnrichmentBundle:** result of one resolution + aggregation pass
//!
//! and the adapter traits every external catalog implements.

use async_trait::async_trait;
use deepsea_common::api::SourceKind;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque structured data returned by a catalog's fetch call
pub type Payload = serde_json::Value;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier meaningful only to one specific source
///
/// Wikipedia titles, Wikidata Q-ids and iNaturalist taxon ids all end up here.
/// Deserializes from either a JSON string or a JSON number since the dataset
/// stores iNaturalist ids as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SourceIdentifier(String);

impl SourceIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank identifiers carry no information and are treated as absent
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for SourceIdentifier {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for SourceIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

// ============================================================================
// Local dataset record
// ============================================================================

/// Treats an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Species record from the local dataset
///
/// Only the fields the enrichment pipeline and the detail view consume are
/// modelled; unknown fields in the dataset are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord {
    /// Unique record identity
    pub id: String,
    pub common_name: String,

    /// Known encyclopedia (Wikipedia) title
    #[serde(default)]
    pub wikipedia: Option<SourceIdentifier>,
    /// Known knowledge-base (Wikidata) id
    #[serde(default)]
    pub wikidata: Option<SourceIdentifier>,
    /// Known observation-catalog (iNaturalist) taxon id
    #[serde(default, alias = "inatId")]
    pub inat_id: Option<SourceIdentifier>,

    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub depth_min_m: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub depth_max_m: f64,

    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub also_known_as: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub look_for: Vec<String>,
    #[serde(default)]
    pub display_note: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub regions: Vec<String>,
}

impl LocalRecord {
    /// Identifier already known for a source, ignoring blank values
    pub fn known_identifier(&self, source: SourceKind) -> Option<&SourceIdentifier> {
        let id = match source {
            SourceKind::Encyclopedia => self.wikipedia.as_ref(),
            SourceKind::KnowledgeBase => self.wikidata.as_ref(),
            SourceKind::Observation => self.inat_id.as_ref(),
        };
        id.filter(|id| !id.is_blank())
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Where a resolved identifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierOrigin {
    /// Present on the local record
    Known,
    /// Discovered through the source's own search
    Searched,
    /// Translated from another source's identifier
    Derived,
}

/// A resolved identifier with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: SourceIdentifier,
    pub origin: IdentifierOrigin,
}

impl Resolution {
    pub fn new(id: SourceIdentifier, origin: IdentifierOrigin) -> Self {
        Self { id, origin }
    }
}

/// Resolver output: one optional identifier per source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentifiers {
    pub encyclopedia: Option<Resolution>,
    pub knowledge_base: Option<Resolution>,
    pub observation: Option<Resolution>,
}

impl ResolvedIdentifiers {
    pub fn get(&self, source: SourceKind) -> Option<&SourceIdentifier> {
        let resolution = match source {
            SourceKind::Encyclopedia => self.encyclopedia.as_ref(),
            SourceKind::KnowledgeBase => self.knowledge_base.as_ref(),
            SourceKind::Observation => self.observation.as_ref(),
        };
        resolution.map(|r| &r.id)
    }
}

// ============================================================================
// Enrichment bundle
// ============================================================================

/// Per-source slot of an enrichment bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Resolved identifier (enough on its own for an attribution link)
    #[serde(default)]
    pub id: Option<SourceIdentifier>,
    /// Fetched payload; absent on any failure
    #[serde(default)]
    pub payload: Option<Payload>,
}

/// How many sources contributed a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// All three payloads present
    Complete,
    /// At least one payload absent
    Partial,
}

/// Result of one resolution + aggregation pass
///
/// Constructed fresh on every pipeline run and never mutated afterwards.
/// Absence is the failure representation; a bundle is never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentBundle {
    #[serde(default)]
    pub encyclopedia: SourceEntry,
    #[serde(default)]
    pub knowledge_base: SourceEntry,
    #[serde(default)]
    pub observation: SourceEntry,
}

impl EnrichmentBundle {
    pub fn entry(&self, source: SourceKind) -> &SourceEntry {
        match source {
            SourceKind::Encyclopedia => &self.encyclopedia,
            SourceKind::KnowledgeBase => &self.knowledge_base,
            SourceKind::Observation => &self.observation,
        }
    }

    pub fn payload(&self, source: SourceKind) -> Option<&Payload> {
        self.entry(source).payload.as_ref()
    }

    pub fn completeness(&self) -> Completeness {
        if SourceKind::ALL.iter().all(|s| self.payload(*s).is_some()) {
            Completeness::Complete
        } else {
            Completeness::Partial
        }
    }

    /// Number of sources that contributed a payload
    pub fn payload_count(&self) -> usize {
        SourceKind::ALL
            .iter()
            .filter(|s| self.payload(**s).is_some())
            .count()
    }
}

// ============================================================================
// Source adapter traits
// ============================================================================

/// Capability set shared by every external catalog
///
/// Implementations never return errors: transport failures, timeouts,
/// non-success statuses and malformed bodies all collapse to `None`.
/// No retries are performed.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which catalog this adapter talks to
    fn kind(&self) -> SourceKind;

    /// Best match for a free-text query
    async fn search(&self, query: &str) -> Option<SourceIdentifier>;

    /// Payload for a known identifier
    async fn fetch(&self, id: &SourceIdentifier) -> Option<Payload>;
}

/// Knowledge-base capability: translate an encyclopedia identifier
#[async_trait]
pub trait KnowledgeBaseAdapter: SourceAdapter {
    /// Knowledge-base identifier linked to an encyclopedia identifier
    async fn from_encyclopedia(&self, encyclopedia_id: &SourceIdentifier)
        -> Option<SourceIdentifier>;
}
