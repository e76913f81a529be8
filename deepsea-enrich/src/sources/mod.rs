//! Source Adapters
//!
//! One adapter per external catalog:
//! 1. **wikipedia** - encyclopedia: title search, page summary
//! 2. **wikidata** - knowledge base: entity search, entity data, enwiki title → Q-id
//! 3. **inaturalist** - observation catalog: taxon search, taxon record
//!
//! # Failure isolation
//! Adapters classify failures internally as `SourceError`, log them, and
//! return `None` from the trait methods. Nothing above this module ever sees
//! a transport error.

pub mod inaturalist;
pub mod wikidata;
pub mod wikipedia;

#[cfg(test)]
pub mod mock;

pub use inaturalist::INaturalistClient;
pub use wikidata::WikidataClient;
pub use wikipedia::WikipediaClient;

use crate::config::SourceSettings;
use crate::types::{KnowledgeBaseAdapter, SourceAdapter};
use deepsea_common::api::SourceKind;
use reqwest::{header, Client, Url};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Source adapter errors (never leave this module)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Response was well-formed but held no usable value
    #[error("No match: {0}")]
    NoMatch(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// The three adapters used by one pipeline
#[derive(Clone)]
pub struct SourceSet {
    pub encyclopedia: Arc<dyn SourceAdapter>,
    pub knowledge_base: Arc<dyn KnowledgeBaseAdapter>,
    pub observation: Arc<dyn SourceAdapter>,
}

impl SourceSet {
    /// Build HTTP adapters for the configured catalogs
    pub fn from_settings(settings: &SourceSettings) -> Result<Self, SourceError> {
        Ok(Self {
            encyclopedia: Arc::new(WikipediaClient::new(settings)?),
            knowledge_base: Arc::new(WikidataClient::new(settings)?),
            observation: Arc::new(INaturalistClient::new(settings)?),
        })
    }
}

// ============================================================================
// Shared HTTP plumbing
// ============================================================================

/// HTTP client shared by one adapter's calls
pub(crate) struct CatalogHttp {
    client: Client,
    source: SourceKind,
}

impl CatalogHttp {
    pub(crate) fn new(source: SourceKind, settings: &SourceSettings) -> Result<Self, SourceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self { client, source })
    }

    /// GET a URL and decode the JSON body
    ///
    /// Non-2xx statuses are errors; no retries.
    pub(crate) async fn get_json(&self, url: Url) -> Result<Value, SourceError> {
        debug!(source = %self.source, url = %url, "Querying catalog");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        Ok(body)
    }
}

/// Append path segments to a base URL, percent-encoding each segment
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, SourceError> {
    let mut url = Url::parse(base).map_err(|e| SourceError::InvalidUrl(format!("{}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| SourceError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Collapse an internal result to the adapter contract's `Option`
///
/// "No match" is routine and logged at debug; everything else at warn.
pub(crate) fn absent_on_error<T>(
    source: SourceKind,
    operation: &'static str,
    target: &str,
    result: Result<T, SourceError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(SourceError::NoMatch(what)) => {
            debug!(source = %source, operation, target, "No {} in response", what);
            None
        }
        Err(e) => {
            warn!(source = %source, operation, target, error = %e, "Catalog call failed, treating as absent");
            None
        }
    }
}

/// Identifier value that may be a JSON string or number
pub(crate) fn identifier_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
