//! deepsea-enrich - Species Enrichment Microservice
//!
//! Serves species views for the kiosk displays: local dataset records merged
//! with Wikipedia, Wikidata and iNaturalist data, cached in SQLite so repeat
//! visits render instantly while fresh data is fetched.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use deepsea_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver,
};
use deepsea_common::events::EventBus;
use deepsea_enrich::cache::{EnrichmentCache, SqliteCacheStore};
use deepsea_enrich::catalog::SpeciesCatalog;
use deepsea_enrich::config::{SourceSettings, DEFAULT_DATASET_PATH, DEFAULT_PORT};
use deepsea_enrich::pipeline::EnrichmentPipeline;
use deepsea_enrich::presenter::{Presenter, SourcePages};
use deepsea_enrich::sources::SourceSet;
use deepsea_enrich::viewer::SpeciesViewer;
use deepsea_enrich::{AppState, EVENT_BUS_CAPACITY};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MODULE_NAME: &str = "deepsea-enrich";

/// Command-line arguments for deepsea-enrich
#[derive(Parser, Debug)]
#[command(name = "deepsea-enrich")]
#[command(about = "Species enrichment microservice for the Deepsea kiosk")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "DEEPSEA_PORT")]
    port: Option<u16>,

    /// Species dataset (JSON array of records)
    #[arg(short, long, env = "DEEPSEA_DATASET")]
    dataset: Option<PathBuf>,

    /// Folder holding the cache database
    #[arg(short, long, env = "DEEPSEA_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "DEEPSEA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME));
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load configuration")?,
        None => Default::default(),
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting deepsea-enrich (Species Enrichment) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve and create root folder
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder)
        .with_toml_value(toml_config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let mut startup_error = None;

    // Step 2: Cache database (best-effort; memory cache if unavailable)
    let db_path = initializer.cache_database_path();
    let cache = match SqliteCacheStore::open(&db_path).await {
        Ok(store) => {
            info!("Cache database: {}", db_path.display());
            EnrichmentCache::new(store)
        }
        Err(e) => {
            warn!("Cache database unavailable ({}), caching in memory only", e);
            startup_error = Some(format!("Cache database unavailable: {}", e));
            EnrichmentCache::in_memory()
        }
    };

    // Step 3: Species dataset
    let dataset_path = args
        .dataset
        .or(toml_config.dataset_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH));
    let catalog = SpeciesCatalog::load(&dataset_path).await;
    if catalog.is_empty() {
        startup_error = Some(format!(
            "Species dataset empty or unreadable: {}",
            dataset_path.display()
        ));
    }

    // Step 4: Catalog adapters
    let settings = SourceSettings::resolve(&toml_config.sources);
    info!(
        wikipedia = %settings.wikipedia_url,
        wikidata = %settings.wikidata_url,
        inaturalist = %settings.inaturalist_api_url,
        timeout_secs = settings.request_timeout.as_secs(),
        "Catalog sources configured"
    );
    let sources = SourceSet::from_settings(&settings).context("Failed to build catalog clients")?;

    let viewer = SpeciesViewer::new(
        Arc::new(catalog),
        Arc::new(EnrichmentPipeline::new(sources)),
        Arc::new(cache),
        Presenter::new(SourcePages::from_settings(&settings)),
    );

    let state = AppState::new(viewer, EventBus::new(EVENT_BUS_CAPACITY));
    *state.last_error.write().await = startup_error;

    let app = deepsea_enrich::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
