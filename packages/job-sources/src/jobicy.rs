//! Jobicy job board client. One request, one batch.

use async_stream::try_stream;
use futures::Stream;
use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::source::{get_json, trim_base_url, JobSource, ListingStream};
use crate::types::{
    format_salary, json_amount, json_id, parse_timestamp, RawJobListing, SeenKeys,
};

pub const SOURCE_NAME: &str = "jobicy";

const BASE_URL: &str = "https://jobicy.com";

/// Largest `count` the API accepts.
const MAX_COUNT: usize = 100;

#[derive(Debug, Deserialize)]
struct JobicyResponse {
    #[serde(default)]
    jobs: Vec<JobicyJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobicyJob {
    #[serde(default)]
    id: serde_json::Value,
    url: Option<String>,
    #[serde(default)]
    job_title: String,
    company_name: Option<String>,
    #[serde(default)]
    job_industry: Vec<String>,
    #[serde(default)]
    job_type: Vec<String>,
    job_geo: Option<String>,
    job_excerpt: Option<String>,
    job_description: Option<String>,
    pub_date: Option<String>,
    annual_salary_min: Option<serde_json::Value>,
    annual_salary_max: Option<serde_json::Value>,
    salary_currency: Option<String>,
}

impl JobicyJob {
    fn into_listing(self) -> Option<RawJobListing> {
        let external_id = json_id(&self.id)?;
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("{}/jobs/{}", BASE_URL, external_id));
        let description = self.job_description.or(self.job_excerpt).unwrap_or_default();
        let salary = format_salary(
            json_amount(self.annual_salary_min.as_ref()),
            json_amount(self.annual_salary_max.as_ref()),
            self.salary_currency.as_deref(),
        );
        let tags = self.job_industry.into_iter().chain(self.job_type).collect();

        let mut listing = RawJobListing::new(SOURCE_NAME, external_id, self.job_title, url)
            .with_company(self.company_name)
            .with_description(description)
            .with_location(self.job_geo.unwrap_or_default())
            .with_salary(salary)
            .with_tags(tags);
        if let Some(posted_at) = self.pub_date.as_deref().and_then(parse_timestamp) {
            listing = listing.with_posted_at(posted_at);
        }
        Some(listing)
    }
}

pub struct JobicySource {
    client: reqwest::Client,
    base_url: String,
    count: usize,
}

impl JobicySource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            count: 50,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }

    /// Number of listings requested, clamped to what the API allows.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.clamp(1, MAX_COUNT);
        self
    }

    fn pages<'a>(
        &'a self,
        query: Option<&'a str>,
    ) -> impl Stream<Item = Result<Vec<RawJobListing>>> + Send + 'a {
        try_stream! {
            let mut request = self
                .client
                .get(format!("{}/api/v2/remote-jobs", self.base_url))
                .query(&[("count", self.count)]);
            if let Some(tag) = query.map(str::trim).filter(|q| !q.is_empty()) {
                request = request.query(&[("tag", tag)]);
            }

            let response: JobicyResponse = get_json(request).await?;
            let received = response.jobs.len();
            let batch = SeenKeys::new().retain_new(
                response.jobs.into_iter().filter_map(JobicyJob::into_listing).collect(),
            );

            info!(source = SOURCE_NAME, received, kept = batch.len(), "Jobicy fetch complete");
            if !batch.is_empty() {
                yield batch;
            }
        }
    }
}

impl JobSource for JobicySource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch<'a>(&'a self, query: Option<&'a str>) -> ListingStream<'a> {
        Box::pin(self.pages(query))
    }
}
