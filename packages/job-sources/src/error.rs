use std::time::Duration;

use thiserror::Error;

/// Errors raised while pulling listings from a job board.
///
/// Any of these ends the fetch stream it was yielded from. Batches that
/// were already yielded remain valid.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider could not be reached or the transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider rejected the request with 429 Too Many Requests
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    /// The payload did not match the provider's documented shape
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors raised while building a category keyword table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("category {0} has no keywords")]
    EmptyKeywords(i64),

    #[error("category {0} is defined more than once")]
    DuplicateCategory(i64),
}

pub type Result<T> = std::result::Result<T, FetchError>;
