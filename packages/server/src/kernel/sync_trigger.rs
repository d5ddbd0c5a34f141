//! Fire-and-forget triggers that ask the central sync endpoint to sync one
//! source.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::{error, info, warn};

use crate::common::SecretString;
use crate::domains::jobs::SourceKind;

/// Something that kicks off a sync for one source.
///
/// `scheduled` never fails: every problem is logged and absorbed, so a cron
/// tick can never take the process down.
#[async_trait]
pub trait SyncTrigger: Send + Sync {
    /// Source id this trigger syncs.
    fn name(&self) -> &str;

    async fn scheduled(&self);
}

/// Outcome of one trigger call, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerResponse {
    pub status: u16,
    pub body: String,
}

/// POSTs `{endpoint}/api/jobs/sync/{source}` with the source's bearer
/// secret.
#[derive(Clone)]
pub struct HttpSyncTrigger {
    kind: SourceKind,
    endpoint: String,
    secret: SecretString,
    client: reqwest::Client,
}

impl HttpSyncTrigger {
    pub fn new(
        kind: SourceKind,
        endpoint: impl Into<String>,
        secret: SecretString,
        client: reqwest::Client,
    ) -> Self {
        Self {
            kind,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            secret,
            client,
        }
    }

    pub fn url(&self) -> String {
        format!("{}/api/jobs/sync/{}", self.endpoint, self.kind.id())
    }

    /// Issue the sync call once. No retry.
    pub async fn trigger(&self) -> Result<TriggerResponse, reqwest::Error> {
        let response = self
            .client
            .post(self.url())
            .header(AUTHORIZATION, format!("Bearer {}", self.secret.expose()))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TriggerResponse { status, body })
    }
}

#[async_trait]
impl SyncTrigger for HttpSyncTrigger {
    fn name(&self) -> &str {
        self.kind.id()
    }

    async fn scheduled(&self) {
        info!(source = self.kind.id(), url = %self.url(), "Triggering job sync");

        match self.trigger().await {
            Ok(response) if (200..300).contains(&response.status) => {
                info!(
                    source = self.kind.id(),
                    status = response.status,
                    body = %response.body,
                    "Job sync triggered"
                );
            }
            Ok(response) => {
                warn!(
                    source = self.kind.id(),
                    status = response.status,
                    body = %response.body,
                    "Job sync endpoint returned an error"
                );
            }
            Err(e) => {
                error!(source = self.kind.id(), error = %e, "Job sync trigger failed");
            }
        }
    }
}

impl std::fmt::Debug for HttpSyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSyncTrigger")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("secret", &self.secret)
            .finish()
    }
}
