use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use job_sources::{
    default_client, FetchError, HimalayasSource, JobSource, JobicySource, RateLimitedSource,
    RemoteOkSource,
};

use crate::domains::jobs::models::SourceKind;

/// The job source behind each [`SourceKind`].
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<SourceKind, Arc<dyn JobSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live provider clients sharing one HTTP client, each throttled to
    /// `requests_per_second` page requests.
    pub fn live(timeout: Duration, requests_per_second: NonZeroU32) -> Result<Self, FetchError> {
        let client = default_client(timeout)?;

        Ok(Self::new()
            .with_source(
                SourceKind::Himalayas,
                Arc::new(RateLimitedSource::new(
                    HimalayasSource::new(client.clone()),
                    requests_per_second,
                )),
            )
            .with_source(
                SourceKind::Jobicy,
                Arc::new(RateLimitedSource::new(
                    JobicySource::new(client.clone()),
                    requests_per_second,
                )),
            )
            .with_source(
                SourceKind::RemoteOk,
                Arc::new(RateLimitedSource::new(
                    RemoteOkSource::new(client),
                    requests_per_second,
                )),
            ))
    }

    pub fn with_source(mut self, kind: SourceKind, source: Arc<dyn JobSource>) -> Self {
        self.sources.insert(kind, source);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn JobSource>> {
        self.sources.get(&kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.sources.keys().copied()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.sources.iter().map(|(kind, source)| (kind, source.name())))
            .finish()
    }
}
