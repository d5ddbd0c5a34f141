//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Every configured job source gets its own cron job. A tick only asks the
//! central sync endpoint to do the work; it never syncs in-process.
//!
//! ```text
//! Scheduler (per-source cron)
//!     │
//!     └─► SyncTrigger::scheduled()
//!             └─► POST {SYNC_ENDPOINT_URL}/api/jobs/sync/{source}
//!                     └─► sync_source() → ListingStore
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::Config;
use crate::domains::jobs::SourceKind;
use crate::kernel::sync_trigger::{HttpSyncTrigger, SyncTrigger};

/// Triggers keyed by the source they sync.
pub type SyncTriggers = BTreeMap<SourceKind, Arc<dyn SyncTrigger>>;

/// One trigger and the cron expression it fires on.
#[derive(Clone)]
pub struct ScheduledSync {
    pub cron: String,
    pub trigger: Arc<dyn SyncTrigger>,
}

/// HTTP triggers for every source that has a sync secret.
///
/// Without `SYNC_ENDPOINT_URL` there is nothing to call, so no triggers are
/// built at all.
pub fn http_triggers(config: &Config, client: &reqwest::Client) -> SyncTriggers {
    let mut triggers = SyncTriggers::new();

    let Some(endpoint) = config.sync_endpoint_url.as_deref() else {
        tracing::warn!("SYNC_ENDPOINT_URL not set, job sync triggers disabled");
        return triggers;
    };

    for (kind, source) in &config.sources {
        match &source.secret {
            Some(secret) => {
                triggers.insert(
                    *kind,
                    Arc::new(HttpSyncTrigger::new(
                        *kind,
                        endpoint,
                        secret.clone(),
                        client.clone(),
                    )),
                );
            }
            None => {
                tracing::warn!(
                    source = kind.id(),
                    "{}_SYNC_SECRET not set, sync trigger disabled",
                    kind.env_prefix()
                );
            }
        }
    }

    triggers
}

/// Pair each trigger with its source's cron expression.
pub fn scheduled_syncs(config: &Config, triggers: &SyncTriggers) -> Vec<ScheduledSync> {
    triggers
        .iter()
        .map(|(kind, trigger)| ScheduledSync {
            cron: config
                .source(*kind)
                .map(|source| source.cron.clone())
                .unwrap_or_else(|| kind.default_cron().to_string()),
            trigger: trigger.clone(),
        })
        .collect()
}

/// Start all scheduled tasks
pub async fn start_scheduler(syncs: Vec<ScheduledSync>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let count = syncs.len();

    for sync in syncs {
        let trigger = sync.trigger.clone();
        let job = Job::new_async(sync.cron.as_str(), move |_uuid, _lock| {
            let trigger = trigger.clone();
            Box::pin(async move {
                trigger.scheduled().await;
            })
        })?;

        scheduler.add(job).await?;
        tracing::info!(source = sync.trigger.name(), cron = %sync.cron, "Scheduled job sync");
    }

    scheduler.start().await?;

    tracing::info!("Scheduled tasks started ({} job sync triggers)", count);
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    struct CountingTrigger(AtomicUsize);

    #[async_trait]
    impl SyncTrigger for CountingTrigger {
        fn name(&self) -> &str {
            "counting"
        }

        async fn scheduled(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn no_endpoint_means_no_triggers() {
        let config = config(&[
            ("DATABASE_URL", "postgres://x"),
            ("HIMALAYAS_SYNC_SECRET", "s"),
        ]);

        assert!(http_triggers(&config, &reqwest::Client::new()).is_empty());
    }

    #[test]
    fn only_sources_with_secrets_get_triggers() {
        let config = config(&[
            ("DATABASE_URL", "postgres://x"),
            ("SYNC_ENDPOINT_URL", "https://jobs.example"),
            ("JOBICY_SYNC_SECRET", "s"),
            ("JOBICY_SYNC_CRON", "0 0 * * * *"),
        ]);

        let triggers = http_triggers(&config, &reqwest::Client::new());
        let syncs = scheduled_syncs(&config, &triggers);

        assert_eq!(triggers.keys().copied().collect::<Vec<_>>(), vec![SourceKind::Jobicy]);
        assert_eq!(syncs.len(), 1);
        assert_eq!(syncs[0].cron, "0 0 * * * *");
        assert_eq!(syncs[0].trigger.name(), "jobicy");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduler_fires_trigger() {
        let trigger = Arc::new(CountingTrigger(AtomicUsize::new(0)));
        let mut scheduler = start_scheduler(vec![ScheduledSync {
            cron: "* * * * * *".to_string(),
            trigger: trigger.clone(),
        }])
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        scheduler.shutdown().await.unwrap();

        assert!(trigger.0.load(Ordering::SeqCst) >= 1);
    }
}
