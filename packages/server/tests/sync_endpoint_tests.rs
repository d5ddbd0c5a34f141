//! `POST /api/jobs/sync/:source` and `GET /health`

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{source_config, TestApp, SECRET};
use job_sources::testing::{sample_listing, MockJobSource};
use serde_json::json;
use server_core::domains::jobs::{ListingStore, SourceKind};

fn jobicy_app(source: MockJobSource, secret: Option<&str>) -> TestApp {
    TestApp::builder()
        .source(SourceKind::Jobicy, Arc::new(source))
        .sync_config(SourceKind::Jobicy, source_config(secret))
        .build()
}

#[tokio::test]
async fn sync_upserts_listings_and_reports_counts() {
    let source = MockJobSource::new("jobicy")
        .with_batch(vec![sample_listing("jobicy", "1"), sample_listing("jobicy", "2")])
        .with_batch(vec![sample_listing("jobicy", "3")]);
    let app = jobicy_app(source, Some(SECRET));

    let (status, body) = app.post("/api/jobs/sync/jobicy", Some(SECRET)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(
        body["report"],
        json!({ "source": "jobicy", "batches": 2, "fetched": 3, "inserted": 3, "updated": 0 })
    );
    assert_eq!(app.store.len().await, 3);

    let (_, again) = app.post("/api/jobs/sync/jobicy", Some(SECRET)).await;
    assert_eq!(again["report"]["updated"], json!(3));
    assert_eq!(app.store.len().await, 3);
}

#[tokio::test]
async fn stored_descriptions_are_sanitized() {
    let source = MockJobSource::new("jobicy").with_batch(vec![sample_listing("jobicy", "1")
        .with_description("<div onmouseover=\"steal()\">Build <b>APIs</b></div><script>alert(1)</script>")]);
    let app = jobicy_app(source, Some(SECRET));

    let (status, _) = app.post("/api/jobs/sync/jobicy", Some(SECRET)).await;

    assert_eq!(status, StatusCode::OK);
    let stored = app.store.find_by_source("jobicy").await.unwrap();
    assert_eq!(stored[0].description, "<p>Build <strong>APIs</strong></p>");
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let source = MockJobSource::new("jobicy").with_batch(vec![sample_listing("jobicy", "1")]);
    let app = jobicy_app(source, Some(SECRET));

    let (status, body) = app.post("/api/jobs/sync/jobicy", Some("guess")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, _) = app.post("/api/jobs/sync/jobicy", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn unauthorized_request_never_fetches() {
    let source = Arc::new(MockJobSource::new("jobicy"));
    let app = TestApp::builder()
        .source(SourceKind::Jobicy, source.clone())
        .sync_config(SourceKind::Jobicy, source_config(Some(SECRET)))
        .build();

    app.post("/api/jobs/sync/jobicy", Some("guess")).await;

    assert_eq!(source.fetch_call_count(), 0);
}

#[tokio::test]
async fn missing_secret_is_a_configuration_error() {
    let source = MockJobSource::new("jobicy");
    let app = jobicy_app(source, None);

    let (status, body) = app.post("/api/jobs/sync/jobicy", Some(SECRET)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Jobicy sync secret not configured"));
}

#[tokio::test]
async fn unknown_source_is_not_found() {
    let app = TestApp::builder().build();

    let (status, _) = app.post("/api/jobs/sync/indeed", Some(SECRET)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provider_failure_is_bad_gateway_and_keeps_earlier_batches() {
    let source = MockJobSource::new("jobicy")
        .with_batch(vec![sample_listing("jobicy", "1")])
        .failing_after(1);
    let app = jobicy_app(source, Some(SECRET));

    let (status, body) = app.post("/api/jobs/sync/jobicy", Some(SECRET)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], json!(false));
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn health_reports_sources_and_store() {
    let app = TestApp::builder()
        .source(SourceKind::Jobicy, Arc::new(MockJobSource::new("jobicy")))
        .sync_config(SourceKind::Jobicy, source_config(Some(SECRET)))
        .build();

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["store"]["status"], json!("ok"));
    assert_eq!(
        body["sources"],
        json!([{ "id": "jobicy", "name": "Jobicy", "sync_secret": true, "scheduled": false }])
    );
    assert_eq!(body["ai_binding"], json!("not configured"));
}
