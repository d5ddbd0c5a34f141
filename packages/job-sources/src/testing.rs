//! Test doubles for code that consumes job sources.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream;

use crate::error::FetchError;
use crate::source::{JobSource, ListingStream};
use crate::types::RawJobListing;

/// A source that replays canned batches.
///
/// ```rust
/// use job_sources::testing::{sample_listing, MockJobSource};
///
/// let source = MockJobSource::new("mock")
///     .with_batch(vec![sample_listing("mock", "1")])
///     .failing_after(1);
/// ```
#[derive(Debug)]
pub struct MockJobSource {
    name: String,
    batches: Vec<Vec<RawJobListing>>,
    fail_after: Option<usize>,
    fetch_calls: AtomicUsize,
}

impl MockJobSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: Vec::new(),
            fail_after: None,
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_batch(mut self, batch: Vec<RawJobListing>) -> Self {
        self.batches.push(batch);
        self
    }

    /// Yield `count` batches, then a provider error.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl JobSource for MockJobSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch<'a>(&'a self, _query: Option<&'a str>) -> ListingStream<'a> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let mut items: Vec<Result<Vec<RawJobListing>, FetchError>> = match self.fail_after {
            Some(count) => self.batches.iter().take(count).cloned().map(Ok).collect(),
            None => self.batches.iter().cloned().map(Ok).collect(),
        };
        if self.fail_after.is_some() {
            items.push(Err(FetchError::Api {
                status: 503,
                message: format!("{} unavailable", self.name),
            }));
        }
        Box::pin(stream::iter(items))
    }
}

/// A minimal listing for tests.
pub fn sample_listing(source_name: &str, external_id: &str) -> RawJobListing {
    RawJobListing::new(
        source_name,
        external_id,
        format!("Job {}", external_id),
        format!("https://jobs.example/{}/{}", source_name, external_id),
    )
    .with_company(Some("Example Co".to_string()))
    .with_description(format!("<p>Role {}</p>", external_id))
}
