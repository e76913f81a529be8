//! Wikidata client (knowledge-base source)
//!
//! - Search: `wbsearchentities`, first entity id
//! - Fetch: `Special:EntityData/{id}.json`, the entity object
//! - Cross-reference: `wbgetentities` with `sites=enwiki` maps a Wikipedia
//!   title to its Q-id
//!
//! # API Reference
//! - https://www.wikidata.org/w/api.php?action=help&modules=wbgetentities
//! - https://www.wikidata.org/wiki/Wikidata:Data_access

use super::{absent_on_error, endpoint, identifier_value, CatalogHttp, SourceError};
use crate::config::SourceSettings;
use crate::types::{KnowledgeBaseAdapter, Payload, SourceAdapter, SourceIdentifier};
use async_trait::async_trait;
use deepsea_common::api::SourceKind;
use reqwest::Url;
use tracing::debug;

/// Wikidata API client
pub struct WikidataClient {
    http: CatalogHttp,
    base_url: String,
}

impl WikidataClient {
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        Ok(Self {
            http: CatalogHttp::new(SourceKind::KnowledgeBase, settings)?,
            base_url: settings.wikidata_url.clone(),
        })
    }

    fn api_url(&self, params: &[(&str, &str)]) -> Result<Url, SourceError> {
        let mut url = endpoint(&self.base_url, &["w", "api.php"])?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn query_search(&self, query: &str) -> Result<SourceIdentifier, SourceError> {
        let url = self.api_url(&[
            ("action", "wbsearchentities"),
            ("language", "en"),
            ("limit", "1"),
            ("format", "json"),
            ("search", query),
        ])?;
        let body = self.http.get_json(url).await?;

        body.get("search")
            .and_then(|hits| hits.get(0))
            .and_then(|hit| hit.get("id"))
            .and_then(identifier_value)
            .map(SourceIdentifier::new)
            .ok_or(SourceError::NoMatch("entity"))
    }

    async fn query_sitelink(&self, title: &SourceIdentifier) -> Result<SourceIdentifier, SourceError> {
        let url = self.api_url(&[
            ("action", "wbgetentities"),
            ("sites", "enwiki"),
            ("titles", title.as_str()),
            ("props", "info"),
            ("format", "json"),
        ])?;
        let body = self.http.get_json(url).await?;

        // Unknown titles come back keyed "-1" with a "missing" marker
        let id = body
            .get("entities")
            .and_then(|entities| entities.as_object())
            .and_then(|entities| {
                entities
                    .iter()
                    .find(|(key, entity)| !key.starts_with('-') && entity.get("missing").is_none())
                    .map(|(key, _)| key.clone())
            })
            .ok_or(SourceError::NoMatch("entity for title"))?;

        debug!(title = %title, id = %id, "Wikidata sitelink resolved");
        Ok(SourceIdentifier::new(id))
    }

    async fn query_entity(&self, id: &SourceIdentifier) -> Result<Payload, SourceError> {
        let file = format!("{}.json", id.as_str());
        let url = endpoint(&self.base_url, &["wiki", "Special:EntityData", &file])?;
        let body = self.http.get_json(url).await?;

        body.get("entities")
            .and_then(|entities| entities.get(id.as_str()))
            .cloned()
            .ok_or(SourceError::NoMatch("entity data"))
    }
}

#[async_trait]
impl SourceAdapter for WikidataClient {
    fn kind(&self) -> SourceKind {
        SourceKind::KnowledgeBase
    }

    async fn search(&self, query: &str) -> Option<SourceIdentifier> {
        absent_on_error(self.kind(), "search", query, self.query_search(query).await)
    }

    async fn fetch(&self, id: &SourceIdentifier) -> Option<Payload> {
        absent_on_error(self.kind(), "fetch", id.as_str(), self.query_entity(id).await)
    }
}

#[async_trait]
impl KnowledgeBaseAdapter for WikidataClient {
    async fn from_encyclopedia(
        &self,
        encyclopedia_id: &SourceIdentifier,
    ) -> Option<SourceIdentifier> {
        absent_on_error(
            self.kind(),
            "from_encyclopedia",
            encyclopedia_id.as_str(),
            self.query_sitelink(encyclopedia_id).await,
        )
    }
}

/// Canonical entity page URL
pub fn page_url(base_url: &str, id: &SourceIdentifier) -> Option<Url> {
    endpoint(base_url, &["wiki", id.as_str()]).ok()
}
