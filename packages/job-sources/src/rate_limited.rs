//! Rate-limited source wrapper.
//!
//! Wraps any `JobSource` with a `governor` quota. Because sources only
//! request a page when their stream is polled, waiting for a permit before
//! each poll paces every outbound page request.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use governor::{Quota, RateLimiter};

use crate::source::{JobSource, ListingStream};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A source wrapper that enforces a request quota.
pub struct RateLimitedSource<S: JobSource> {
    inner: S,
    limiter: Arc<DefaultRateLimiter>,
}

impl<S: JobSource> RateLimitedSource<S> {
    /// Allow at most `requests_per_second` page requests per second.
    pub fn new(source: S, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(source, Quota::per_second(requests_per_second))
    }

    pub fn with_quota(source: S, quota: Quota) -> Self {
        Self {
            inner: source,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: JobSource> JobSource for RateLimitedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch<'a>(&'a self, query: Option<&'a str>) -> ListingStream<'a> {
        let limiter = Arc::clone(&self.limiter);
        let mut pages = self.inner.fetch(query);

        Box::pin(stream! {
            loop {
                limiter.until_ready().await;
                match pages.next().await {
                    Some(batch) => yield batch,
                    None => break,
                }
            }
        })
    }
}
