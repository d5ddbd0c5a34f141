//! App fixtures: in-memory state, counting triggers and request helpers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use job_sources::JobSource;
use serde_json::Value;
use server_core::common::SecretString;
use server_core::domains::jobs::{MemoryListingStore, SourceKind, SourceRegistry};
use server_core::kernel::{SyncTrigger, SyncTriggers};
use server_core::server::{build_app, AppState};
use server_core::SourceSyncConfig;
use tower::ServiceExt;

pub const SECRET: &str = "test-sync-secret";

/// Records how often a cron tick (or manual trigger) fired.
pub struct CountingTrigger {
    name: &'static str,
    calls: AtomicUsize,
}

impl CountingTrigger {
    pub fn new(kind: SourceKind) -> Arc<Self> {
        Arc::new(Self {
            name: kind.id(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTrigger for CountingTrigger {
    fn name(&self) -> &str {
        self.name
    }

    async fn scheduled(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn source_config(secret: Option<&str>) -> SourceSyncConfig {
    SourceSyncConfig {
        secret: secret.map(SecretString::from),
        cron: "0 0 * * * *".to_string(),
        query: None,
    }
}

/// In-memory app with one source registered under `kind`.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryListingStore>,
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::default()
    }

    pub async fn post(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method("POST").uri(uri);
        if let Some(token) = bearer {
            request = request.header("authorization", format!("Bearer {}", token));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

#[derive(Default)]
pub struct TestAppBuilder {
    registry: SourceRegistry,
    sources: BTreeMap<SourceKind, SourceSyncConfig>,
    triggers: SyncTriggers,
}

impl TestAppBuilder {
    pub fn source(mut self, kind: SourceKind, source: Arc<dyn JobSource>) -> Self {
        self.registry = self.registry.with_source(kind, source);
        self
    }

    pub fn sync_config(mut self, kind: SourceKind, config: SourceSyncConfig) -> Self {
        self.sources.insert(kind, config);
        self
    }

    pub fn trigger(mut self, kind: SourceKind, trigger: Arc<dyn SyncTrigger>) -> Self {
        self.triggers.insert(kind, trigger);
        self
    }

    pub fn build(self) -> TestApp {
        let store = Arc::new(MemoryListingStore::new());
        let state = AppState::new(store.clone(), self.registry)
            .with_sources(self.sources)
            .with_triggers(self.triggers);
        TestApp {
            router: build_app(state),
            store,
        }
    }
}
