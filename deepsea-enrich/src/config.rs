//! Configuration resolution for deepsea-enrich
//!
//! Catalog endpoints resolve with ENV → TOML → compiled default priority.
//! Invalid values are logged and skipped so a typo never takes the kiosk
//! down; the next tier is used instead.

use deepsea_common::config::SourcesToml;
use std::time::Duration;
use tracing::{info, warn};

/// Default HTTP port for the enrichment service
pub const DEFAULT_PORT: u16 = 5731;

/// Default dataset location (relative to the working directory)
pub const DEFAULT_DATASET_PATH: &str = "data/species.json";

pub const DEFAULT_WIKIPEDIA_URL: &str = "https://en.wikipedia.org";
pub const DEFAULT_WIKIDATA_URL: &str = "https://www.wikidata.org";
pub const DEFAULT_INATURALIST_API_URL: &str = "https://api.inaturalist.org";
pub const DEFAULT_INATURALIST_SITE_URL: &str = "https://www.inaturalist.org";

/// Bounded per-request timeout so a hung catalog cannot stall a view
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_USER_AGENT: &str = concat!("deepsea-enrich/", env!("CARGO_PKG_VERSION"));

/// Resolved settings for the three catalog adapters
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub wikipedia_url: String,
    pub wikidata_url: String,
    pub inaturalist_api_url: String,
    pub inaturalist_site_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            wikipedia_url: DEFAULT_WIKIPEDIA_URL.to_string(),
            wikidata_url: DEFAULT_WIKIDATA_URL.to_string(),
            inaturalist_api_url: DEFAULT_INATURALIST_API_URL.to_string(),
            inaturalist_site_url: DEFAULT_INATURALIST_SITE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceSettings {
    /// Resolve settings from environment and TOML
    ///
    /// **Priority:** ENV → TOML → default
    pub fn resolve(toml: &SourcesToml) -> Self {
        let defaults = Self::default();

        let timeout_secs = std::env::var("DEEPSEA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(secs),
                _ => {
                    warn!("Ignoring invalid DEEPSEA_REQUEST_TIMEOUT_SECS: {:?}", v);
                    None
                }
            })
            .or(toml.request_timeout_secs.filter(|secs| *secs > 0));

        let user_agent = std::env::var("DEEPSEA_USER_AGENT")
            .ok()
            .filter(|ua| !ua.trim().is_empty())
            .or_else(|| toml.user_agent.clone().filter(|ua| !ua.trim().is_empty()))
            .unwrap_or(defaults.user_agent);

        Self {
            wikipedia_url: resolve_url(
                "wikipedia_url",
                "DEEPSEA_WIKIPEDIA_URL",
                toml.wikipedia_url.as_deref(),
                DEFAULT_WIKIPEDIA_URL,
            ),
            wikidata_url: resolve_url(
                "wikidata_url",
                "DEEPSEA_WIKIDATA_URL",
                toml.wikidata_url.as_deref(),
                DEFAULT_WIKIDATA_URL,
            ),
            inaturalist_api_url: resolve_url(
                "inaturalist_api_url",
                "DEEPSEA_INATURALIST_API_URL",
                toml.inaturalist_api_url.as_deref(),
                DEFAULT_INATURALIST_API_URL,
            ),
            inaturalist_site_url: resolve_url(
                "inaturalist_site_url",
                "DEEPSEA_INATURALIST_SITE_URL",
                toml.inaturalist_site_url.as_deref(),
                DEFAULT_INATURALIST_SITE_URL,
            ),
            request_timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            user_agent,
        }
    }

    /// Settings pointing every catalog at one base URL (test doubles)
    pub fn with_base_url(base_url: &str) -> Self {
        let base = normalize_base_url(base_url);
        Self {
            wikipedia_url: base.clone(),
            wikidata_url: base.clone(),
            inaturalist_api_url: base.clone(),
            inaturalist_site_url: base,
            ..Self::default()
        }
    }
}

fn resolve_url(field: &str, env_var: &str, toml_value: Option<&str>, default: &str) -> String {
    if let Ok(value) = std::env::var(env_var) {
        if is_valid_base_url(&value) {
            info!("{} loaded from environment variable {}", field, env_var);
            return normalize_base_url(&value);
        }
        warn!("Ignoring invalid {} from {}: {:?}", field, env_var, value);
    }

    if let Some(value) = toml_value {
        if is_valid_base_url(value) {
            info!("{} loaded from TOML config", field);
            return normalize_base_url(value);
        }
        warn!("Ignoring invalid {} from TOML config: {:?}", field, value);
    }

    default.to_string()
}

/// Validate a base URL (absolute http/https)
pub fn is_valid_base_url(value: &str) -> bool {
    match reqwest::Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Trim whitespace and trailing slashes so paths can be appended
pub fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}
