use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Location used when a provider does not restrict where a job can be done.
pub const DEFAULT_LOCATION: &str = "Remote";

/// A job posting exactly as a provider describes it, before sanitization
/// or persistence.
///
/// `(source_name, external_id)` identifies a listing; see [`ListingKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawJobListing {
    pub external_id: String,
    pub title: String,
    pub company: Option<String>,
    /// Untrusted provider markup
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub source_url: String,
    pub source_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RawJobListing {
    /// Create a listing with the required fields. Everything else starts
    /// empty and the location defaults to [`DEFAULT_LOCATION`].
    pub fn new(
        source_name: impl Into<String>,
        external_id: impl Into<String>,
        title: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            company: None,
            description: String::new(),
            location: DEFAULT_LOCATION.to_string(),
            salary: None,
            posted_at: Utc::now(),
            source_url: source_url.into(),
            source_name: source_name.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_company(mut self, company: Option<String>) -> Self {
        self.company = company.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the location. Blank values keep the default.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        if !location.trim().is_empty() {
            self.location = location.trim().to_string();
        }
        self
    }

    pub fn with_salary(mut self, salary: Option<String>) -> Self {
        self.salary = salary;
        self
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = posted_at;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn key(&self) -> ListingKey {
        ListingKey {
            source_name: self.source_name.clone(),
            external_id: self.external_id.clone(),
        }
    }
}

/// Natural external key of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingKey {
    pub source_name: String,
    pub external_id: String,
}

/// Tracks external ids already yielded during one fetch invocation.
///
/// Providers occasionally repeat a posting across pages while their index
/// shifts underneath the cursor; only the first copy is kept.
#[derive(Debug, Default)]
pub struct SeenKeys {
    seen: HashSet<String>,
}

impl SeenKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop listings whose external id was already seen, remembering the rest.
    pub fn retain_new(&mut self, batch: Vec<RawJobListing>) -> Vec<RawJobListing> {
        let before = batch.len();
        let fresh: Vec<RawJobListing> = batch
            .into_iter()
            .filter(|listing| self.seen.insert(listing.external_id.clone()))
            .collect();

        let dropped = before - fresh.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped repeated listings within fetch");
        }
        fresh
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Render a salary range as display text, e.g. `USD 90000 - 120000`.
///
/// Zero and negative amounts are treated as missing.
pub fn format_salary(min: Option<f64>, max: Option<f64>, currency: Option<&str>) -> Option<String> {
    let min = min.filter(|v| *v > 0.0).map(|v| v.round() as i64);
    let max = max.filter(|v| *v > 0.0).map(|v| v.round() as i64);
    let prefix = currency
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("{} ", c.to_uppercase()))
        .unwrap_or_default();

    match (min, max) {
        (Some(lo), Some(hi)) if lo == hi => Some(format!("{}{}", prefix, lo)),
        (Some(lo), Some(hi)) => Some(format!("{}{} - {}", prefix, lo, hi)),
        (Some(lo), None) => Some(format!("{}{}+", prefix, lo)),
        (None, Some(hi)) => Some(format!("up to {}{}", prefix, hi)),
        (None, None) => None,
    }
}

/// Read a JSON value that providers send either as a number or a numeric string.
pub(crate) fn json_amount(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Read an identifier that providers send either as a number or a string.
pub(crate) fn json_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Parse the timestamp formats seen across providers: RFC 3339 or
/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

pub(crate) fn from_unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}
