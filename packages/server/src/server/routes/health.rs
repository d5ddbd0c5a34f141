use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    store: StoreHealth,
    sources: Vec<SourceHealth>,
    ai_binding: String,
}

#[derive(Serialize)]
pub struct StoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct SourceHealth {
    id: &'static str,
    name: &'static str,
    sync_secret: bool,
    scheduled: bool,
}

/// Health check endpoint
///
/// Checks:
/// - Listing store reachability
/// - Which sources can be synced and which have a scheduled trigger
/// - Whether the AI binding is configured
///
/// Returns 200 OK if the store is reachable, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let store = match tokio::time::timeout(std::time::Duration::from_secs(5), state.store.ping())
        .await
    {
        Ok(Ok(())) => StoreHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => StoreHealth {
            status: "error".to_string(),
            error: Some(e.to_string()),
        },
        Err(_) => StoreHealth {
            status: "error".to_string(),
            error: Some("Ping timeout (>5s)".to_string()),
        },
    };

    let sources = state
        .registry
        .kinds()
        .map(|kind| SourceHealth {
            id: kind.id(),
            name: kind.display_name(),
            sync_secret: state
                .sources
                .get(&kind)
                .is_some_and(|source| source.secret.is_some()),
            scheduled: state.triggers.contains_key(&kind),
        })
        .collect();

    let is_healthy = store.status == "ok";

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            store,
            sources,
            ai_binding: if state.ai_binding_configured {
                "configured"
            } else {
                "not configured"
            }
            .to_string(),
        }),
    )
}
