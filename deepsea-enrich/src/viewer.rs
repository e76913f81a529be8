//! Species view orchestration (stale-while-revalidate)
//!
//! Per view request:
//! ```text
//! Init → CacheCheck → (hit: RenderCached) → Resolving → Aggregating → RenderFresh → Idle
//! ```
//! The cache read and the live pipeline run as two spawned tasks feeding one
//! guarded sink. The live pipeline runs on every request, hit or miss.
//!
//! # Supersession
//! A display shows one view at a time. Opening a view on a display cancels the
//! previous view's context; renders for a superseded view are discarded. A
//! superseded pipeline still finishes and writes the cache under the record it
//! was started for, which never touches the new record's entry.

use crate::cache::EnrichmentCache;
use crate::catalog::SpeciesCatalog;
use crate::pipeline::EnrichmentPipeline;
use crate::presenter::Presenter;
use crate::types::LocalRecord;
use deepsea_common::api::{RenderPhase, SpeciesView};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Viewer errors
#[derive(Debug, Error)]
pub enum ViewError {
    /// No local record with the requested identity
    #[error("Species data unavailable: {0}")]
    Unavailable(String),
}

/// One render delivered to a sink
#[derive(Debug, Clone)]
pub struct RenderEvent {
    pub view_id: Uuid,
    pub record_id: String,
    pub phase: RenderPhase,
    pub view: SpeciesView,
}

/// Rendering boundary
///
/// Called with the display's view lock held; implementations must not block.
pub trait RenderSink: Send + Sync {
    fn render(&self, event: RenderEvent);
}

// ============================================================================
// Per-display view state
// ============================================================================

/// Explicit context of one in-flight view request
#[derive(Debug)]
struct ViewContext {
    view_id: Uuid,
    record_id: String,
    token: CancellationToken,
    fresh_rendered: bool,
}

/// Tracks which view a display currently shows
#[derive(Debug, Default)]
pub struct ViewTracker {
    current: Mutex<Option<ViewContext>>,
}

impl ViewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record currently shown, if any
    pub fn current_record(&self) -> Option<String> {
        self.lock().as_ref().map(|ctx| ctx.record_id.clone())
    }

    /// Current view id, if any
    pub fn current_view(&self) -> Option<Uuid> {
        self.lock().as_ref().map(|ctx| ctx.view_id)
    }

    /// Leave the current view; pending renders are discarded
    pub fn close(&self) {
        if let Some(ctx) = self.lock().take() {
            ctx.token.cancel();
            debug!(view_id = %ctx.view_id, record_id = %ctx.record_id, "View closed");
        }
    }

    /// Start a new view, superseding the current one
    fn begin(&self, record_id: &str) -> (Uuid, CancellationToken) {
        let view_id = Uuid::new_v4();
        let token = CancellationToken::new();

        let previous = self.lock().replace(ViewContext {
            view_id,
            record_id: record_id.to_string(),
            token: token.clone(),
            fresh_rendered: false,
        });

        if let Some(previous) = previous {
            previous.token.cancel();
            debug!(
                view_id = %previous.view_id,
                record_id = %previous.record_id,
                superseded_by = %record_id,
                "View superseded"
            );
        }

        (view_id, token)
    }

    /// Run `render` only if `view_id` is still current
    ///
    /// A cached render arriving after the fresh one is discarded as well.
    fn deliver(&self, view_id: Uuid, phase: RenderPhase, render: impl FnOnce()) -> bool {
        let mut current = self.lock();

        let ctx = match current.as_mut() {
            Some(ctx) if ctx.view_id == view_id && !ctx.token.is_cancelled() => ctx,
            _ => return false,
        };

        match phase {
            RenderPhase::Cached if ctx.fresh_rendered => return false,
            RenderPhase::Fresh => ctx.fresh_rendered = true,
            RenderPhase::Cached => {}
        }

        render();
        true
    }

    fn lock(&self) -> MutexGuard<'_, Option<ViewContext>> {
        // Contents stay consistent even if a sink panicked mid-render
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// Viewer
// ============================================================================

/// Handle to a view's background work
pub struct ViewTask {
    view_id: Uuid,
    handle: JoinHandle<()>,
}

impl ViewTask {
    pub fn view_id(&self) -> Uuid {
        self.view_id
    }

    /// Wait until the fresh render was delivered or discarded
    pub async fn finished(self) {
        if let Err(e) = self.handle.await {
            warn!(view_id = %self.view_id, error = %e, "View task ended abnormally");
        }
    }
}

/// Opens species views against the catalog, cache and live pipeline
#[derive(Clone)]
pub struct SpeciesViewer {
    catalog: Arc<SpeciesCatalog>,
    pipeline: Arc<EnrichmentPipeline>,
    cache: Arc<EnrichmentCache>,
    presenter: Arc<Presenter>,
}

impl SpeciesViewer {
    pub fn new(
        catalog: Arc<SpeciesCatalog>,
        pipeline: Arc<EnrichmentPipeline>,
        cache: Arc<EnrichmentCache>,
        presenter: Presenter,
    ) -> Self {
        Self {
            catalog,
            pipeline,
            cache,
            presenter: Arc::new(presenter),
        }
    }

    pub fn catalog(&self) -> &SpeciesCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &EnrichmentCache {
        &self.cache
    }

    /// Open a view of `record_id` on the display tracked by `tracker`
    ///
    /// Returns immediately; renders arrive at `sink` from background tasks.
    /// An unknown record is the one surfaced failure, and it leaves the
    /// display's current view untouched.
    pub fn open(
        &self,
        tracker: &Arc<ViewTracker>,
        record_id: &str,
        sink: Arc<dyn RenderSink>,
    ) -> Result<ViewTask, ViewError> {
        let record = self
            .catalog
            .get(record_id)
            .ok_or_else(|| ViewError::Unavailable(record_id.to_string()))?;

        let (view_id, token) = tracker.begin(record_id);
        info!(view_id = %view_id, record_id = %record_id, "View opened");

        let cached = tokio::spawn(render_cached(
            self.clone(),
            tracker.clone(),
            record.clone(),
            view_id,
            token,
            sink.clone(),
        ));

        let handle = tokio::spawn(render_fresh(
            self.clone(),
            tracker.clone(),
            record,
            view_id,
            cached,
            sink,
        ));

        Ok(ViewTask { view_id, handle })
    }

    fn deliver(
        &self,
        tracker: &ViewTracker,
        sink: &dyn RenderSink,
        view_id: Uuid,
        phase: RenderPhase,
        view: SpeciesView,
    ) -> bool {
        let record_id = view.record_id.clone();
        let delivered = tracker.deliver(view_id, phase, || {
            sink.render(RenderEvent {
                view_id,
                record_id: record_id.clone(),
                phase,
                view,
            })
        });

        if delivered {
            debug!(view_id = %view_id, record_id = %record_id, phase = ?phase, "View rendered");
        } else {
            debug!(view_id = %view_id, record_id = %record_id, phase = ?phase, "Discarding stale render");
        }
        delivered
    }
}

/// CacheCheck → RenderCached
async fn render_cached(
    viewer: SpeciesViewer,
    tracker: Arc<ViewTracker>,
    record: Arc<LocalRecord>,
    view_id: Uuid,
    token: CancellationToken,
    sink: Arc<dyn RenderSink>,
) {
    let bundle = tokio::select! {
        _ = token.cancelled() => return,
        bundle = viewer.cache.read(&record.id) => bundle,
    };

    if let Some(bundle) = bundle {
        let view = viewer.presenter.present(&record, Some(&bundle));
        viewer.deliver(&tracker, sink.as_ref(), view_id, RenderPhase::Cached, view);
    }
}

/// Resolving → Aggregating → RenderFresh
///
/// The cache write waits for the cache check of the same view, so the cached
/// render always shows data from before this run.
async fn render_fresh(
    viewer: SpeciesViewer,
    tracker: Arc<ViewTracker>,
    record: Arc<LocalRecord>,
    view_id: Uuid,
    cached: JoinHandle<()>,
    sink: Arc<dyn RenderSink>,
) {
    let bundle = viewer.pipeline.run(&record).await;

    if let Err(e) = cached.await {
        warn!(view_id = %view_id, error = %e, "Cache check ended abnormally");
    }

    // Keyed by the record this run started for, superseded or not
    viewer.cache.write(&record.id, &bundle).await;

    let view = viewer.presenter.present(&record, Some(&bundle));
    viewer.deliver(&tracker, sink.as_ref(), view_id, RenderPhase::Fresh, view);
}
