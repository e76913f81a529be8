//! In-process fake of the three external catalogs
//!
//! One axum server on `127.0.0.1:0` answers the Wikipedia, Wikidata and
//! iNaturalist endpoints the adapters call, so `SourceSettings::with_base_url`
//! can point every adapter at it. Responses are scripted through `data()`;
//! individual endpoints can be switched to fail, return garbage, or stall.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use deepsea_enrich::config::SourceSettings;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SQUID_PHOTO_URL: &str = "https://static.inaturalist.org/photos/1/medium.jpg";

/// How long a stalled endpoint waits before answering
const STALL: Duration = Duration::from_secs(3);

/// Catalog endpoints the fake serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    WikipediaSearch,
    WikipediaSummary,
    WikidataSitelink,
    WikidataSearch,
    WikidataEntity,
    TaxaSearch,
    Taxon,
}

/// Scripted catalog contents
#[derive(Default)]
pub struct CatalogData {
    /// opensearch query → title
    pub titles: HashMap<String, String>,
    /// title → page summary
    pub summaries: HashMap<String, Value>,
    /// enwiki title → Q-id
    pub sitelinks: HashMap<String, String>,
    /// wbsearchentities query → Q-id
    pub entity_search: HashMap<String, String>,
    /// Q-id → entity
    pub entities: HashMap<String, Value>,
    /// taxa query → taxon id
    pub taxa_search: HashMap<String, u64>,
    /// taxon id → taxon record
    pub taxa: HashMap<String, Value>,

    /// Endpoints answering 503
    pub failing: HashSet<Endpoint>,
    /// Endpoints answering 200 with a non-JSON body
    pub malformed: HashSet<Endpoint>,
    /// Endpoints that stall before answering
    pub stalled: HashSet<Endpoint>,

    /// Every request served, as "endpoint:argument"
    pub hits: Vec<String>,
}

type Shared = Arc<Mutex<CatalogData>>;

/// Running fake catalog server
pub struct FakeCatalogs {
    pub base_url: String,
    data: Shared,
    handle: JoinHandle<()>,
}

impl FakeCatalogs {
    pub async fn start() -> Self {
        let data: Shared = Arc::new(Mutex::new(CatalogData::default()));

        let app = Router::new()
            .route("/w/api.php", get(mediawiki_api))
            .route("/api/rest_v1/page/summary/:title", get(page_summary))
            .route("/wiki/*path", get(wiki_page))
            .route("/v1/taxa", get(taxa_search))
            .route("/v1/taxa/:id", get(taxon))
            .with_state(data.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            data,
            handle,
        }
    }

    /// Server scripted with the full Giant squid data set
    pub async fn with_giant_squid() -> Self {
        let catalogs = Self::start().await;
        catalogs.script_giant_squid("The giant squid is a deep-ocean dwelling squid.");
        catalogs
    }

    pub fn script_giant_squid(&self, extract: &str) {
        let mut data = self.data();
        data.titles.insert("Giant squid".into(), "Giant squid".into());
        data.summaries.insert(
            "Giant squid".into(),
            json!({"title": "Giant squid", "extract": extract}),
        );
        data.sitelinks.insert("Giant squid".into(), "Q188470".into());
        data.entity_search.insert("Giant squid".into(), "Q188470".into());
        data.entities.insert(
            "Q188470".into(),
            json!({"id": "Q188470", "labels": {"en": {"language": "en", "value": "giant squid"}}}),
        );
        data.taxa_search.insert("Giant squid".into(), 47459);
        data.taxa.insert(
            "47459".into(),
            json!({
                "id": 47459,
                "name": "Architeuthis dux",
                "default_photo": {"medium_url": SQUID_PHOTO_URL}
            }),
        );
    }

    pub fn settings(&self) -> SourceSettings {
        SourceSettings::with_base_url(&self.base_url)
    }

    pub fn data(&self) -> MutexGuard<'_, CatalogData> {
        self.data.lock().unwrap()
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.data().failing.insert(endpoint);
    }

    pub fn malform(&self, endpoint: Endpoint) {
        self.data().malformed.insert(endpoint);
    }

    pub fn stall(&self, endpoint: Endpoint) {
        self.data().stalled.insert(endpoint);
    }

    pub fn hits(&self) -> Vec<String> {
        self.data().hits.clone()
    }
}

impl Drop for FakeCatalogs {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Record the hit and apply any failure toggle for the endpoint
async fn intercept(data: &Shared, endpoint: Endpoint, argument: &str) -> Option<Response> {
    let (failing, malformed, stalled) = {
        let mut data = data.lock().unwrap();
        data.hits.push(format!("{:?}:{}", endpoint, argument));
        (
            data.failing.contains(&endpoint),
            data.malformed.contains(&endpoint),
            data.stalled.contains(&endpoint),
        )
    };

    if stalled {
        tokio::time::sleep(STALL).await;
    }
    if failing {
        return Some((StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response());
    }
    if malformed {
        return Some((StatusCode::OK, "<html>not json</html>").into_response());
    }
    None
}

async fn mediawiki_api(
    State(data): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let param = |name: &str| params.get(name).cloned().unwrap_or_default();

    match param("action").as_str() {
        "opensearch" => {
            let query = param("search");
            if let Some(r) = intercept(&data, Endpoint::WikipediaSearch, &query).await {
                return r;
            }
            let title = data.lock().unwrap().titles.get(&query).cloned();
            let body = match title {
                Some(title) => Json(json!([query, [title], [""], ["https://en.wikipedia.org/wiki/x"]])),
                None => Json(json!([query, [], [], []])),
            };
            body.into_response()
        }
        "wbgetentities" => {
            let title = param("titles");
            if let Some(r) = intercept(&data, Endpoint::WikidataSitelink, &title).await {
                return r;
            }
            let id = data.lock().unwrap().sitelinks.get(&title).cloned();
            let body = match id {
                Some(id) => Json(json!({"entities": {id.clone(): {"type": "item", "id": id}}})),
                None => Json(json!({
                    "entities": {"-1": {"site": "enwiki", "title": title, "missing": ""}}
                })),
            };
            body.into_response()
        }
        "wbsearchentities" => {
            let query = param("search");
            if let Some(r) = intercept(&data, Endpoint::WikidataSearch, &query).await {
                return r;
            }
            let id = data.lock().unwrap().entity_search.get(&query).cloned();
            let body = match id {
                Some(id) => Json(json!({"search": [{"id": id}]})),
                None => Json(json!({"search": []})),
            };
            body.into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn page_summary(State(data): State<Shared>, Path(title): Path<String>) -> Response {
    if let Some(r) = intercept(&data, Endpoint::WikipediaSummary, &title).await {
        return r;
    }
    let summary = data.lock().unwrap().summaries.get(&title).cloned();
    match summary {
        Some(summary) => Json(summary).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn wiki_page(State(data): State<Shared>, Path(path): Path<String>) -> Response {
    let id = match path
        .strip_prefix("Special:EntityData/")
        .and_then(|file| file.strip_suffix(".json"))
    {
        Some(id) => id.to_string(),
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    if let Some(r) = intercept(&data, Endpoint::WikidataEntity, &id).await {
        return r;
    }
    let entity = data.lock().unwrap().entities.get(&id).cloned();
    match entity {
        Some(entity) => Json(json!({"entities": {id: entity}})).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn taxa_search(
    State(data): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = params.get("q").cloned().unwrap_or_default();
    if let Some(r) = intercept(&data, Endpoint::TaxaSearch, &query).await {
        return r;
    }
    let id = data.lock().unwrap().taxa_search.get(&query).copied();
    let body = match id {
        Some(id) => Json(json!({"total_results": 1, "results": [{"id": id}]})),
        None => Json(json!({"total_results": 0, "results": []})),
    };
    body.into_response()
}

async fn taxon(State(data): State<Shared>, Path(id): Path<String>) -> Response {
    if let Some(r) = intercept(&data, Endpoint::Taxon, &id).await {
        return r;
    }
    let taxon = data.lock().unwrap().taxa.get(&id).cloned();
    let body = match taxon {
        Some(taxon) => Json(json!({"total_results": 1, "results": [taxon]})),
        None => Json(json!({"total_results": 0, "results": []})),
    };
    body.into_response()
}
