//! Listing persistence.
//!
//! Listings are upserted by their natural key `(source_name, external_id)`:
//! a listing seen again overwrites the stored copy.

use std::collections::BTreeMap;

use async_trait::async_trait;
use job_sources::ListingKey;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domains::jobs::models::JobListing;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Rows written by one upsert call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Insert new listings and overwrite known ones, keyed by
    /// `(source_name, external_id)`.
    async fn upsert_batch(&self, listings: &[JobListing]) -> Result<UpsertSummary, StoreError>;

    async fn find_by_source(&self, source_name: &str) -> Result<Vec<JobListing>, StoreError>;

    /// Cheap reachability check for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store for tests and running without a database.
#[derive(Debug, Default)]
pub struct MemoryListingStore {
    listings: RwLock<BTreeMap<ListingKey, JobListing>>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.listings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.listings.read().await.is_empty()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn upsert_batch(&self, listings: &[JobListing]) -> Result<UpsertSummary, StoreError> {
        let mut stored = self.listings.write().await;
        let mut summary = UpsertSummary::default();
        for listing in listings {
            match stored.insert(listing.key(), listing.clone()) {
                Some(_) => summary.updated += 1,
                None => summary.inserted += 1,
            }
        }
        Ok(summary)
    }

    async fn find_by_source(&self, source_name: &str) -> Result<Vec<JobListing>, StoreError> {
        let stored = self.listings.read().await;
        Ok(stored
            .values()
            .filter(|l| l.source_name == source_name)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// Postgres
// ============================================================================

#[derive(Debug, Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn upsert_batch(&self, listings: &[JobListing]) -> Result<UpsertSummary, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut summary = UpsertSummary::default();

        for listing in listings {
            // xmax is 0 only for rows this statement inserted
            let inserted: bool = sqlx::query_scalar(
                r#"
                INSERT INTO job_listings (
                    source_name, external_id, title, company, description,
                    location, salary, posted_at, source_url, tags
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (source_name, external_id) DO UPDATE SET
                    title = EXCLUDED.title,
                    company = EXCLUDED.company,
                    description = EXCLUDED.description,
                    location = EXCLUDED.location,
                    salary = EXCLUDED.salary,
                    posted_at = EXCLUDED.posted_at,
                    source_url = EXCLUDED.source_url,
                    tags = EXCLUDED.tags,
                    updated_at = NOW()
                RETURNING (xmax = 0) AS inserted
                "#,
            )
            .bind(&listing.source_name)
            .bind(&listing.external_id)
            .bind(&listing.title)
            .bind(&listing.company)
            .bind(&listing.description)
            .bind(&listing.location)
            .bind(&listing.salary)
            .bind(listing.posted_at)
            .bind(&listing.source_url)
            .bind(&listing.tags)
            .fetch_one(&mut *tx)
            .await?;

            if inserted {
                summary.inserted += 1;
            } else {
                summary.updated += 1;
            }
        }

        tx.commit().await?;
        Ok(summary)
    }

    async fn find_by_source(&self, source_name: &str) -> Result<Vec<JobListing>, StoreError> {
        let listings = sqlx::query_as::<_, JobListing>(
            r#"
            SELECT source_name, external_id, title, company, description,
                   location, salary, posted_at, source_url, tags
            FROM job_listings
            WHERE source_name = $1
            ORDER BY posted_at DESC, external_id
            "#,
        )
        .bind(source_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
