//! Remote job board clients.
//!
//! Every provider is exposed through the [`JobSource`] trait: a stable name
//! plus a lazy, restartable stream of listing batches. Providers translate
//! their own payloads into [`RawJobListing`]; descriptions are left as the
//! provider's raw markup.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use futures::StreamExt;
//! use job_sources::{default_client, HimalayasSource, JobSource};
//!
//! let source = HimalayasSource::new(default_client(Duration::from_secs(30))?);
//! let mut batches = source.fetch(None);
//! while let Some(batch) = batches.next().await {
//!     println!("{} listings", batch?.len());
//! }
//! ```

pub mod categories;
pub mod error;
pub mod himalayas;
pub mod jobicy;
pub mod rate_limited;
pub mod remoteok;
pub mod source;
pub mod testing;
pub mod types;

pub use categories::{CategoryKeywords, CategoryKeywordsBuilder};
pub use error::{CategoryError, FetchError, Result};
pub use himalayas::HimalayasSource;
pub use jobicy::JobicySource;
pub use rate_limited::RateLimitedSource;
pub use remoteok::RemoteOkSource;
pub use source::{default_client, JobSource, ListingStream, MAX_ERROR_BODY, MAX_PAGES};
pub use types::{format_salary, ListingKey, RawJobListing, SeenKeys, DEFAULT_LOCATION};
