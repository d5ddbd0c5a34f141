//! Job sync endpoints.
//!
//! - `POST /api/jobs/sync/:source` runs a sync in-process. Callers must
//!   present the source's sync secret as a bearer token; the scheduled
//!   triggers are its usual callers. The sync runs to completion even if
//!   the caller disconnects first.
//! - `POST /api/sync/:source/trigger` fires that source's trigger by hand,
//!   exactly as a cron tick would.

use axum::{
    extract::{Extension, Path},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use crate::domains::jobs::{sync_source, SourceKind, SyncError, SyncReport};
use crate::server::app::AppState;

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
}

impl SyncResponse {
    fn ok(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
            report: None,
        }
    }

    fn err(error: String) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error),
            report: None,
        }
    }
}

type SyncResult = (StatusCode, Json<SyncResponse>);

fn failure(status: StatusCode, error: impl Into<String>) -> SyncResult {
    (status, Json(SyncResponse::err(error.into())))
}

fn parse_source(source: &str) -> Result<SourceKind, SyncResult> {
    source
        .parse::<SourceKind>()
        .map_err(|e| failure(StatusCode::NOT_FOUND, e.to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Manual sync trigger: runs the source's scheduled handler once.
pub async fn trigger_sync_handler(
    Extension(state): Extension<AppState>,
    Path(source): Path<String>,
) -> SyncResult {
    let kind = match parse_source(&source) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let Some(trigger) = state.trigger(kind) else {
        tracing::warn!(source = kind.id(), "Manual sync requested but no trigger is configured");
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} sync worker not configured", kind),
        );
    };

    tracing::info!(source = kind.id(), "Manual sync trigger");
    trigger.scheduled().await;

    (
        StatusCode::OK,
        Json(SyncResponse::ok(format!("{} sync triggered", kind))),
    )
}

/// Central sync endpoint: fetch the source and upsert everything it yields.
pub async fn sync_source_handler(
    Extension(state): Extension<AppState>,
    Path(source): Path<String>,
    headers: HeaderMap,
) -> SyncResult {
    let kind = match parse_source(&source) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let config = state.sources.get(&kind);
    let Some(secret) = config.and_then(|c| c.secret.as_ref()) else {
        tracing::error!(source = kind.id(), "Sync requested but no sync secret is configured");
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} sync secret not configured", kind),
        );
    };

    if !bearer_token(&headers).is_some_and(|token| secret.matches(token)) {
        tracing::warn!(source = kind.id(), "Rejected sync request with bad credentials");
        return failure(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let Some(job_source) = state.registry.get(kind) else {
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} source not registered", kind),
        );
    };

    // Run on its own task so a caller that hangs up cannot cancel the sync
    // halfway through the source's pages.
    let store = state.store.clone();
    let query = config.and_then(|c| c.query.clone());
    let task = tokio::spawn(async move {
        sync_source(job_source.as_ref(), store.as_ref(), query.as_deref()).await
    });

    let result = match task.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(source = kind.id(), error = %e, "Sync task aborted");
            return failure(StatusCode::INTERNAL_SERVER_ERROR, format!("{} sync aborted", kind));
        }
    };

    match result {
        Ok(report) => (
            StatusCode::OK,
            Json(SyncResponse {
                report: Some(report),
                ..SyncResponse::ok(format!("{} sync complete", kind))
            }),
        ),
        Err(e @ SyncError::Fetch { .. }) => failure(StatusCode::BAD_GATEWAY, e.to_string()),
        Err(e @ SyncError::Store(_)) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
