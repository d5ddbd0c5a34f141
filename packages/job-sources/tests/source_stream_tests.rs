//! Job board clients against local stub servers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use job_sources::{
    default_client, FetchError, HimalayasSource, JobSource, JobicySource, RawJobListing,
    RemoteOkSource, MAX_ERROR_BODY,
};
use serde_json::{json, Value};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    default_client(Duration::from_secs(5)).unwrap()
}

fn himalayas_job(guid: &str) -> Value {
    json!({
        "guid": guid,
        "title": format!("Role {}", guid),
        "companyName": "Acme",
        "description": "<p>Hello</p>",
        "pubDate": 1700000000
    })
}

/// Three unique jobs over two non-empty pages; `g2` is repeated on the
/// second page the way a shifting index repeats it.
async fn himalayas_pages(
    State(hits): State<Arc<AtomicUsize>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    let offset: usize = params.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    let jobs = match offset {
        0 => vec![himalayas_job("g1"), himalayas_job("g2")],
        2 => vec![himalayas_job("g2"), himalayas_job("g3")],
        _ => vec![],
    };
    Json(json!({ "offset": offset, "limit": 20, "jobs": jobs }))
}

async fn collect_ids(source: &dyn JobSource, query: Option<&str>) -> Vec<Vec<String>> {
    source
        .fetch(query)
        .map(|batch| {
            batch
                .expect("batch should succeed")
                .into_iter()
                .map(|l: RawJobListing| l.external_id)
                .collect::<Vec<_>>()
        })
        .collect()
        .await
}

#[tokio::test]
async fn himalayas_paginates_until_empty_page() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = serve(
        Router::new()
            .route("/jobs/api", get(himalayas_pages))
            .with_state(hits.clone()),
    )
    .await;
    let source = HimalayasSource::new(client()).with_base_url(base);

    let batches = collect_ids(&source, None).await;

    assert_eq!(batches, vec![vec!["g1", "g2"], vec!["g3"]]);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn fetch_restarts_from_the_first_page() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = serve(
        Router::new()
            .route("/jobs/api", get(himalayas_pages))
            .with_state(hits.clone()),
    )
    .await;
    let source = HimalayasSource::new(client()).with_base_url(base);

    let first = collect_ids(&source, None).await;
    let second = collect_ids(&source, None).await;

    assert_eq!(first, second);
    assert_eq!(hits.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn fetch_is_lazy_until_polled() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = serve(
        Router::new()
            .route("/jobs/api", get(himalayas_pages))
            .with_state(hits.clone()),
    )
    .await;
    let source = HimalayasSource::new(client()).with_base_url(base);

    let stream = source.fetch(None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    drop(stream);
}

#[tokio::test]
async fn keys_are_unique_within_one_fetch() {
    let base = serve(
        Router::new()
            .route("/jobs/api", get(himalayas_pages))
            .with_state(Arc::new(AtomicUsize::new(0))),
    )
    .await;
    let source = HimalayasSource::new(client()).with_base_url(base);

    let mut keys: Vec<_> = source
        .fetch(None)
        .flat_map(|batch| futures::stream::iter(batch.unwrap()))
        .map(|listing| listing.key())
        .collect()
        .await;
    let total = keys.len();
    keys.sort();
    keys.dedup();

    assert_eq!(keys.len(), total);
}

#[tokio::test]
async fn himalayas_query_uses_search_endpoint() {
    async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(params.get("q").map(String::as_str), Some("rust"));
        let jobs = match params.get("page").map(String::as_str) {
            Some("1") => vec![himalayas_job("s1")],
            _ => vec![],
        };
        Json(json!({ "jobs": jobs }))
    }

    let base = serve(Router::new().route("/jobs/api/search", get(search))).await;
    let source = HimalayasSource::new(client()).with_base_url(base);

    assert_eq!(collect_ids(&source, Some("rust")).await, vec![vec!["s1"]]);
}

#[tokio::test]
async fn himalayas_search_stops_when_a_page_adds_nothing_new() {
    async fn repeating(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
        hits.fetch_add(1, Ordering::SeqCst);
        Json(json!({ "jobs": [himalayas_job("s1")] }))
    }

    let hits = Arc::new(AtomicUsize::new(0));
    let base = serve(
        Router::new()
            .route("/jobs/api/search", get(repeating))
            .with_state(hits.clone()),
    )
    .await;
    let source = HimalayasSource::new(client()).with_base_url(base);

    assert_eq!(collect_ids(&source, Some("rust")).await, vec![vec!["s1"]]);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_after_first_batch_keeps_that_batch() {
    async fn flaky(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        match params.get("offset").map(String::as_str) {
            Some("0") => (
                StatusCode::OK,
                Json(json!({ "jobs": [himalayas_job("ok-1")] })),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "boom" })),
            ),
        }
    }

    let base = serve(Router::new().route("/jobs/api", get(flaky))).await;
    let source = HimalayasSource::new(client()).with_base_url(base);

    let items: Vec<_> = source.fetch(None).collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap()[0].external_id, "ok-1");
    assert!(matches!(items[1], Err(FetchError::Api { status: 500, .. })));
}

#[tokio::test]
async fn too_many_requests_is_rate_limited() {
    async fn limited() -> impl IntoResponse {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "30")],
            "slow down",
        )
    }

    let base = serve(Router::new().route("/api/v2/remote-jobs", get(limited))).await;
    let source = JobicySource::new(client()).with_base_url(base);

    let items: Vec<_> = source.fetch(None).collect().await;

    assert_eq!(items.len(), 1);
    match &items[0] {
        Err(FetchError::RateLimited { retry_after }) => {
            assert_eq!(*retry_after, Some(Duration::from_secs(30)));
        }
        other => panic!("expected rate limit, got {:?}", other),
    }
}

#[tokio::test]
async fn jobicy_yields_one_batch_and_forwards_tag() {
    async fn jobs(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(params.get("tag").map(String::as_str), Some("python"));
        assert_eq!(params.get("count").map(String::as_str), Some("50"));
        Json(json!({
            "apiVersion": "2",
            "jobCount": 2,
            "jobs": [
                { "id": 1, "jobTitle": "Data Engineer", "url": "https://jobicy.com/jobs/1" },
                { "id": 2, "jobTitle": "Analyst", "url": "https://jobicy.com/jobs/2" }
            ]
        }))
    }

    let base = serve(Router::new().route("/api/v2/remote-jobs", get(jobs))).await;
    let source = JobicySource::new(client()).with_base_url(base);

    assert_eq!(collect_ids(&source, Some("python")).await, vec![vec!["1", "2"]]);
}

#[tokio::test]
async fn remoteok_non_array_payload_is_malformed() {
    async fn not_an_array() -> Json<Value> {
        Json(json!({ "legal": "terms" }))
    }

    let base = serve(Router::new().route("/api", get(not_an_array))).await;
    let source = RemoteOkSource::new(client()).with_base_url(base);

    let items: Vec<_> = source.fetch(None).collect().await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(FetchError::Malformed(_))));
}

#[tokio::test]
async fn remoteok_skips_legal_notice() {
    async fn feed() -> Json<Value> {
        Json(json!([
            { "legal": "API Terms of Service" },
            { "id": "11", "position": "Rust Dev", "company": "Crab", "epoch": 1700000000 },
            { "id": "12", "position": "Go Dev", "company": "Gopher", "epoch": 1700000100 }
        ]))
    }

    let base = serve(Router::new().route("/api", get(feed))).await;
    let source = RemoteOkSource::new(client()).with_base_url(base);

    assert_eq!(collect_ids(&source, None).await, vec![vec!["11", "12"]]);
}

#[tokio::test]
async fn unreachable_provider_is_http_error() {
    // Nothing listens on port 9 locally.
    let source = RemoteOkSource::new(client()).with_base_url("http://127.0.0.1:9");

    let items: Vec<_> = source.fetch(None).collect().await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(FetchError::Http(_))));
}

#[tokio::test]
async fn api_error_body_is_bounded() {
    async fn verbose() -> impl IntoResponse {
        (StatusCode::BAD_GATEWAY, "upstream exploded ".repeat(1_000))
    }

    let base = serve(Router::new().route("/api", get(verbose))).await;
    let source = RemoteOkSource::new(client()).with_base_url(base);

    let items: Vec<_> = source.fetch(None).collect().await;

    match &items[0] {
        Err(FetchError::Api { status, message }) => {
            assert_eq!(*status, 502);
            assert!(message.starts_with("upstream exploded"));
            assert!(message.len() <= MAX_ERROR_BODY + '…'.len_utf8());
        }
        other => panic!("expected API error, got {:?}", other),
    }
}
