//! Himalayas job board client.
//!
//! Browsing is offset-paginated (`/jobs/api?limit=&offset=`), search is
//! page-numbered (`/jobs/api/search?q=&page=`). Both return the same
//! envelope.

use async_stream::try_stream;
use futures::Stream;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::source::{get_json, trim_base_url, JobSource, ListingStream, MAX_PAGES};
use crate::types::{format_salary, from_unix_seconds, RawJobListing, SeenKeys};

pub const SOURCE_NAME: &str = "himalayas";

const BASE_URL: &str = "https://himalayas.app";

/// Himalayas caps page size at 20.
const PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobsPage {
    #[serde(default)]
    total_count: Option<usize>,
    #[serde(default)]
    jobs: Vec<HimalayasJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HimalayasJob {
    guid: Option<String>,
    #[serde(default)]
    title: String,
    company_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    location_restrictions: Vec<String>,
    min_salary: Option<f64>,
    max_salary: Option<f64>,
    currency: Option<String>,
    pub_date: Option<i64>,
    application_link: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
}

impl HimalayasJob {
    fn into_listing(self) -> Option<RawJobListing> {
        let external_id = self.guid.filter(|g| !g.trim().is_empty())?;
        let url = self
            .application_link
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| external_id.clone());
        let description = self.description.or(self.excerpt).unwrap_or_default();

        let mut listing = RawJobListing::new(SOURCE_NAME, external_id, self.title, url)
            .with_company(self.company_name)
            .with_description(description)
            .with_location(self.location_restrictions.join(", "))
            .with_salary(format_salary(
                self.min_salary,
                self.max_salary,
                self.currency.as_deref(),
            ))
            .with_tags(self.categories);
        if let Some(posted_at) = self.pub_date.and_then(from_unix_seconds) {
            listing = listing.with_posted_at(posted_at);
        }
        Some(listing)
    }
}

/// Where the next page comes from.
enum Cursor<'q> {
    Browse { offset: usize },
    Search { query: &'q str, page: usize },
}

pub struct HimalayasSource {
    client: reqwest::Client,
    base_url: String,
}

impl HimalayasSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at another host (mirrors, test stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }

    async fn fetch_page(&self, cursor: &Cursor<'_>) -> Result<JobsPage> {
        let request = match cursor {
            Cursor::Search { query, page } => self
                .client
                .get(format!("{}/jobs/api/search", self.base_url))
                .query(&[("q", query.to_string()), ("page", page.to_string())]),
            Cursor::Browse { offset } => self
                .client
                .get(format!("{}/jobs/api", self.base_url))
                .query(&[("limit", PAGE_SIZE), ("offset", *offset)]),
        };
        get_json(request).await
    }

    fn pages<'a>(
        &'a self,
        query: Option<&'a str>,
    ) -> impl Stream<Item = Result<Vec<RawJobListing>>> + Send + 'a {
        try_stream! {
            let mut cursor = match query.map(str::trim).filter(|q| !q.is_empty()) {
                Some(query) => Cursor::Search { query, page: 1 },
                None => Cursor::Browse { offset: 0 },
            };
            let mut seen = SeenKeys::new();

            for page_no in 0..MAX_PAGES {
                let page = self.fetch_page(&cursor).await?;
                let received = page.jobs.len();
                debug!(page = page_no, received, "Fetched Himalayas page");
                if received == 0 {
                    break;
                }

                let batch = seen.retain_new(
                    page.jobs.into_iter().filter_map(HimalayasJob::into_listing).collect(),
                );
                if batch.is_empty() {
                    // Search pages carry no total; a page of repeats means
                    // the results have run out.
                    if matches!(cursor, Cursor::Search { .. }) {
                        debug!(page = page_no, "Himalayas search page had nothing new");
                        break;
                    }
                } else {
                    yield batch;
                }

                cursor = match cursor {
                    Cursor::Browse { offset } => {
                        let next = offset + received;
                        if page.total_count.is_some_and(|total| next >= total) {
                            break;
                        }
                        Cursor::Browse { offset: next }
                    }
                    Cursor::Search { query, page } => Cursor::Search { query, page: page + 1 },
                };
            }

            info!(source = SOURCE_NAME, total = seen.len(), "Himalayas fetch complete");
        }
    }
}

impl JobSource for HimalayasSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch<'a>(&'a self, query: Option<&'a str>) -> ListingStream<'a> {
        Box::pin(self.pages(query))
    }
}
