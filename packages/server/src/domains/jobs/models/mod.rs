pub mod job_listing;
pub mod source_kind;

pub use job_listing::JobListing;
pub use source_kind::{SourceKind, UnknownSource};
