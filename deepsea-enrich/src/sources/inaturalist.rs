//! iNaturalist client (observation-catalog source)
//!
//! - Search: `/v1/taxa?q=...&per_page=1`, first taxon id
//! - Fetch: `/v1/taxa/{id}`, first result (carries `default_photo`)
//!
//! # API Reference
//! - https://api.inaturalist.org/v1/docs/#/Taxa

use super::{absent_on_error, endpoint, identifier_value, CatalogHttp, SourceError};
use crate::config::SourceSettings;
use crate::types::{Payload, SourceAdapter, SourceIdentifier};
use async_trait::async_trait;
use deepsea_common::api::SourceKind;
use reqwest::Url;

/// iNaturalist API client
pub struct INaturalistClient {
    http: CatalogHttp,
    api_url: String,
}

impl INaturalistClient {
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        Ok(Self {
            http: CatalogHttp::new(SourceKind::Observation, settings)?,
            api_url: settings.inaturalist_api_url.clone(),
        })
    }

    async fn query_taxa(&self, query: &str) -> Result<SourceIdentifier, SourceError> {
        let mut url = endpoint(&self.api_url, &["v1", "taxa"])?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("per_page", "1");
        let body = self.http.get_json(url).await?;

        body.get("results")
            .and_then(|results| results.get(0))
            .and_then(|taxon| taxon.get("id"))
            .and_then(identifier_value)
            .map(SourceIdentifier::new)
            .ok_or(SourceError::NoMatch("taxon"))
    }

    async fn query_taxon(&self, id: &SourceIdentifier) -> Result<Payload, SourceError> {
        let url = endpoint(&self.api_url, &["v1", "taxa", id.as_str()])?;
        let body = self.http.get_json(url).await?;

        body.get("results")
            .and_then(|results| results.get(0))
            .cloned()
            .ok_or(SourceError::NoMatch("taxon record"))
    }
}

#[async_trait]
impl SourceAdapter for INaturalistClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Observation
    }

    async fn search(&self, query: &str) -> Option<SourceIdentifier> {
        absent_on_error(self.kind(), "search", query, self.query_taxa(query).await)
    }

    async fn fetch(&self, id: &SourceIdentifier) -> Option<Payload> {
        absent_on_error(self.kind(), "fetch", id.as_str(), self.query_taxon(id).await)
    }
}

/// Canonical taxon page URL on the public site
pub fn page_url(site_url: &str, id: &SourceIdentifier) -> Option<Url> {
    endpoint(site_url, &["taxa", id.as_str()]).ok()
}

/// Medium-size default photo of a taxon record
pub fn default_photo_url(taxon: &Payload) -> Option<&str> {
    taxon
        .get("default_photo")
        .and_then(|photo| photo.get("medium_url"))
        .and_then(|url| url.as_str())
        .filter(|url| !url.trim().is_empty())
}
