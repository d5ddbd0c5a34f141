pub mod sync_source;

pub use sync_source::{sync_source, SyncError, SyncReport};
