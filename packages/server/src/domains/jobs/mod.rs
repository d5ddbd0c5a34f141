//! Jobs domain - remote job listings pulled from external job boards

pub mod activities;
pub mod models;
pub mod registry;
pub mod store;

pub use activities::{sync_source, SyncError, SyncReport};
pub use models::{JobListing, SourceKind, UnknownSource};
pub use registry::SourceRegistry;
pub use store::{ListingStore, MemoryListingStore, PgListingStore, StoreError, UpsertSummary};
