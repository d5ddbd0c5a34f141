//! Application setup and server configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::SourceSyncConfig;
use crate::domains::jobs::{ListingStore, SourceKind, SourceRegistry};
use crate::kernel::scheduled_tasks::SyncTriggers;
use crate::kernel::sync_trigger::SyncTrigger;
use crate::server::routes::{health_handler, sync_source_handler, trigger_sync_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ListingStore>,
    pub registry: Arc<SourceRegistry>,
    pub sources: Arc<BTreeMap<SourceKind, SourceSyncConfig>>,
    pub triggers: Arc<SyncTriggers>,
    pub ai_binding_configured: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn ListingStore>, registry: SourceRegistry) -> Self {
        Self {
            store,
            registry: Arc::new(registry),
            sources: Arc::new(BTreeMap::new()),
            triggers: Arc::new(SyncTriggers::new()),
            ai_binding_configured: false,
        }
    }

    pub fn with_sources(mut self, sources: BTreeMap<SourceKind, SourceSyncConfig>) -> Self {
        self.sources = Arc::new(sources);
        self
    }

    pub fn with_triggers(mut self, triggers: SyncTriggers) -> Self {
        self.triggers = Arc::new(triggers);
        self
    }

    pub fn with_ai_binding(mut self, configured: bool) -> Self {
        self.ai_binding_configured = configured;
        self
    }

    pub fn trigger(&self, kind: SourceKind) -> Option<Arc<dyn SyncTrigger>> {
        self.triggers.get(&kind).cloned()
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/jobs/sync/:source", post(sync_source_handler))
        .route("/api/sync/:source/trigger", post(trigger_sync_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
