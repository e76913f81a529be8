//! Wikipedia client (encyclopedia source)
//!
//! - Search: MediaWiki `opensearch`, first title only
//! - Fetch: REST page summary (`extract`, thumbnails, ...)
//!
//! # API Reference
//! - https://www.mediawiki.org/wiki/API:Opensearch
//! - https://en.wikipedia.org/api/rest_v1/#/Page%20content/get_page_summary__title_

use super::{absent_on_error, endpoint, CatalogHttp, SourceError};
use crate::config::SourceSettings;
use crate::types::{Payload, SourceAdapter, SourceIdentifier};
use async_trait::async_trait;
use deepsea_common::api::SourceKind;
use reqwest::Url;
use tracing::debug;

/// Wikipedia API client
pub struct WikipediaClient {
    http: CatalogHttp,
    base_url: String,
}

impl WikipediaClient {
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        Ok(Self {
            http: CatalogHttp::new(SourceKind::Encyclopedia, settings)?,
            base_url: settings.wikipedia_url.clone(),
        })
    }

    fn search_url(&self, query: &str) -> Result<Url, SourceError> {
        let mut url = endpoint(&self.base_url, &["w", "api.php"])?;
        url.query_pairs_mut()
            .append_pair("action", "opensearch")
            .append_pair("limit", "1")
            .append_pair("namespace", "0")
            .append_pair("format", "json")
            .append_pair("search", query);
        Ok(url)
    }

    async fn query_title(&self, query: &str) -> Result<SourceIdentifier, SourceError> {
        let body = self.http.get_json(self.search_url(query)?).await?;

        // opensearch answers [query, [titles...], [descriptions...], [urls...]]
        let title = body
            .get(1)
            .and_then(|titles| titles.get(0))
            .and_then(|title| title.as_str())
            .filter(|title| !title.trim().is_empty())
            .ok_or(SourceError::NoMatch("title"))?;

        debug!(query = %query, title = %title, "Wikipedia search matched");
        Ok(SourceIdentifier::new(title))
    }

    async fn query_summary(&self, title: &SourceIdentifier) -> Result<Payload, SourceError> {
        let url = endpoint(
            &self.base_url,
            &["api", "rest_v1", "page", "summary", title.as_str()],
        )?;
        let body = self.http.get_json(url).await?;

        if !body.is_object() {
            return Err(SourceError::Parse("summary is not an object".to_string()));
        }
        Ok(body)
    }
}

#[async_trait]
impl SourceAdapter for WikipediaClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Encyclopedia
    }

    async fn search(&self, query: &str) -> Option<SourceIdentifier> {
        absent_on_error(self.kind(), "search", query, self.query_title(query).await)
    }

    async fn fetch(&self, id: &SourceIdentifier) -> Option<Payload> {
        absent_on_error(self.kind(), "fetch", id.as_str(), self.query_summary(id).await)
    }
}

/// Canonical article URL for a title
pub fn page_url(base_url: &str, title: &SourceIdentifier) -> Option<Url> {
    endpoint(base_url, &["wiki", title.as_str()]).ok()
}
