//! RemoteOK client.
//!
//! The API returns a bare JSON array whose first element is a legal notice
//! rather than a job; anything without an `id` is skipped.

use async_stream::try_stream;
use futures::Stream;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::source::{get_json, trim_base_url, JobSource, ListingStream};
use crate::types::{
    format_salary, from_unix_seconds, json_amount, json_id, parse_timestamp, RawJobListing,
    SeenKeys,
};

pub const SOURCE_NAME: &str = "remoteok";

const BASE_URL: &str = "https://remoteok.com";

#[derive(Debug, Deserialize)]
struct RemoteOkJob {
    id: serde_json::Value,
    #[serde(default)]
    position: String,
    company: Option<String>,
    description: Option<String>,
    location: Option<String>,
    salary_min: Option<serde_json::Value>,
    salary_max: Option<serde_json::Value>,
    epoch: Option<i64>,
    date: Option<String>,
    url: Option<String>,
    apply_url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl RemoteOkJob {
    fn into_listing(self) -> Option<RawJobListing> {
        let external_id = json_id(&self.id)?;
        let url = self
            .url
            .or(self.apply_url)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("{}/remote-jobs/{}", BASE_URL, external_id));
        let posted_at = self
            .epoch
            .and_then(from_unix_seconds)
            .or_else(|| self.date.as_deref().and_then(parse_timestamp));

        let mut listing = RawJobListing::new(SOURCE_NAME, external_id, self.position, url)
            .with_company(self.company)
            .with_description(self.description.unwrap_or_default())
            .with_location(self.location.unwrap_or_default())
            .with_salary(format_salary(
                json_amount(self.salary_min.as_ref()),
                json_amount(self.salary_max.as_ref()),
                Some("USD"),
            ))
            .with_tags(self.tags);
        if let Some(posted_at) = posted_at {
            listing = listing.with_posted_at(posted_at);
        }
        Some(listing)
    }
}

/// Decode the array entries that look like jobs, skipping the legal notice
/// and anything that fails to decode.
fn parse_entries(entries: Vec<serde_json::Value>) -> Vec<RawJobListing> {
    entries
        .into_iter()
        .filter(|entry| entry.get("id").is_some())
        .filter_map(|entry| match serde_json::from_value::<RemoteOkJob>(entry) {
            Ok(job) => job.into_listing(),
            Err(e) => {
                warn!(source = SOURCE_NAME, error = %e, "Skipping undecodable RemoteOK entry");
                None
            }
        })
        .collect()
}

pub struct RemoteOkSource {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteOkSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }

    fn pages<'a>(
        &'a self,
        query: Option<&'a str>,
    ) -> impl Stream<Item = Result<Vec<RawJobListing>>> + Send + 'a {
        try_stream! {
            let mut request = self.client.get(format!("{}/api", self.base_url));
            if let Some(tag) = query.map(str::trim).filter(|q| !q.is_empty()) {
                request = request.query(&[("tag", tag)]);
            }

            let entries: Vec<serde_json::Value> = get_json(request).await?;
            let received = entries.len();
            let batch = SeenKeys::new().retain_new(parse_entries(entries));

            info!(source = SOURCE_NAME, received, kept = batch.len(), "RemoteOK fetch complete");
            if !batch.is_empty() {
                yield batch;
            }
        }
    }
}

impl JobSource for RemoteOkSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch<'a>(&'a self, query: Option<&'a str>) -> ListingStream<'a> {
        Box::pin(self.pages(query))
    }
}
