use chrono::{DateTime, Utc};
use job_sources::{ListingKey, RawJobListing};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::utils::html::sanitize_html;

/// A listing ready for storage: same shape as the provider record, with the
/// description sanitized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobListing {
    pub source_name: String,
    pub external_id: String,
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub source_url: String,
    pub tags: Vec<String>,
}

impl JobListing {
    pub fn from_raw(raw: RawJobListing) -> Self {
        Self {
            description: sanitize_html(&raw.description),
            title: raw.title.trim().to_string(),
            company: raw
                .company
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            source_name: raw.source_name,
            external_id: raw.external_id,
            location: raw.location,
            salary: raw.salary,
            posted_at: raw.posted_at,
            source_url: raw.source_url,
            tags: raw.tags,
        }
    }

    pub fn key(&self) -> ListingKey {
        ListingKey {
            source_name: self.source_name.clone(),
            external_id: self.external_id.clone(),
        }
    }
}
