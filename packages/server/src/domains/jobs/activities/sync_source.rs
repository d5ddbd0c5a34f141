//! Pull every listing a source offers and reconcile it into the store.

use futures::StreamExt;
use job_sources::{FetchError, JobSource};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::domains::jobs::models::JobListing;
use crate::domains::jobs::store::{ListingStore, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub source: String,
    pub batches: usize,
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetching {} failed after {} batches: {error}", .partial.source, .partial.batches)]
    Fetch {
        #[source]
        error: FetchError,
        partial: SyncReport,
    },

    #[error("storing listings failed: {0}")]
    Store(#[from] StoreError),
}

/// Drain `source` in provider order, sanitizing and upserting each batch as
/// it arrives.
///
/// Batches stored before a fetch failure stay stored; the error carries the
/// counts reached so far.
pub async fn sync_source(
    source: &dyn JobSource,
    store: &dyn ListingStore,
    query: Option<&str>,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport {
        source: source.name().to_string(),
        ..SyncReport::default()
    };

    info!(source = %report.source, query = ?query, "Starting job source sync");

    let mut batches = source.fetch(query);
    while let Some(batch) = batches.next().await {
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                error!(
                    source = %report.source,
                    batches = report.batches,
                    fetched = report.fetched,
                    inserted = report.inserted,
                    updated = report.updated,
                    error = %e,
                    "Job source fetch failed"
                );
                return Err(SyncError::Fetch {
                    error: e,
                    partial: report,
                });
            }
        };

        let listings: Vec<JobListing> = batch.into_iter().map(JobListing::from_raw).collect();
        let summary = store.upsert_batch(&listings).await?;

        report.batches += 1;
        report.fetched += listings.len();
        report.inserted += summary.inserted;
        report.updated += summary.updated;

        debug!(
            source = %report.source,
            batch = report.batches,
            size = listings.len(),
            inserted = summary.inserted,
            updated = summary.updated,
            "Stored listing batch"
        );
    }

    info!(
        source = %report.source,
        batches = report.batches,
        fetched = report.fetched,
        inserted = report.inserted,
        updated = report.updated,
        "Job source sync complete"
    );

    Ok(report)
}
