//! The `JobSource` contract shared by every job board client.
//!
//! A source is a stateless descriptor: a stable name plus a way to open a
//! fresh stream of listing batches. Nothing is requested until the stream
//! is polled, and every call to [`JobSource::fetch`] starts again from the
//! provider's first page.
//!
//! ```rust,ignore
//! use futures::StreamExt;
//!
//! let mut batches = source.fetch(Some("rust"));
//! while let Some(batch) = batches.next().await {
//!     for listing in batch? {
//!         println!("{} ({})", listing.title, listing.external_id);
//!     }
//! }
//! ```

use std::time::Duration;

use futures::stream::BoxStream;
use serde::de::DeserializeOwned;

use crate::error::{FetchError, Result};
use crate::types::RawJobListing;

/// Stream of listing batches in provider order.
pub type ListingStream<'a> = BoxStream<'a, Result<Vec<RawJobListing>>>;

/// Upper bound on pages pulled in one fetch, in case a provider never
/// reports an end.
pub const MAX_PAGES: usize = 100;

/// A named provider of raw job listings.
pub trait JobSource: Send + Sync {
    /// Stable identifier used for attribution and routing.
    fn name(&self) -> &str;

    /// Open a lazy, finite stream of listing batches.
    ///
    /// `query` is free text the provider may honor or ignore. An error
    /// item ends the stream.
    fn fetch<'a>(&'a self, query: Option<&'a str>) -> ListingStream<'a>;
}

/// Build the HTTP client shared by the job board clients.
pub fn default_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("remote-job-sync/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Send a prepared request and decode its JSON body.
///
/// The body is read as text first so decoding failures surface as
/// [`FetchError::Malformed`] rather than transport errors.
pub(crate) async fn get_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let resp = request.send().await?;

    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(FetchError::RateLimited { retry_after });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Api {
            status: status.as_u16(),
            message: truncate_body(body),
        });
    }

    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Longest provider error body kept in [`FetchError::Api`].
pub const MAX_ERROR_BODY: usize = 512;

/// Cut an error body to [`MAX_ERROR_BODY`] bytes on a char boundary.
fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}

pub(crate) fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
