use std::collections::BTreeMap;
use std::env;
use std::num::NonZeroU32;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;
use tokio_cron_scheduler::Job;

use crate::common::SecretString;
use crate::domains::jobs::SourceKind;

const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(2) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

/// Covers a full paginated sync at the default request rate.
const DEFAULT_SYNC_TRIGGER_TIMEOUT_SECS: u64 = 900;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),

    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: String,
        value: String,
        expected: &'static str,
    },

    #[error("{var} is not a valid cron expression ({expr:?}): {reason}")]
    InvalidCron {
        var: String,
        expr: String,
        reason: String,
    },

    #[error("{var} is not a valid URL ({value:?}): {reason}")]
    InvalidUrl {
        var: String,
        value: String,
        reason: String,
    },
}

/// Per-source sync settings.
#[derive(Debug, Clone)]
pub struct SourceSyncConfig {
    /// Bearer secret guarding this source's sync endpoint. Without one the
    /// source is neither synced over HTTP nor scheduled.
    pub secret: Option<SecretString>,
    pub cron: String,
    pub query: Option<String>,
}

/// Outbound fetch limits shared by every source.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub requests_per_second: NonZeroU32,
    pub http_timeout: Duration,
}

/// AI worker binding. Other features consume it; sync only reports whether
/// it is present.
#[derive(Debug, Clone)]
pub struct AiBindingConfig {
    pub endpoint: String,
    pub api_key: SecretString,
    pub max_retries: u32,
    pub timeout: Duration,
    pub rate_limit_per_minute: u32,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL the scheduled triggers POST to. No triggers are scheduled
    /// without it.
    pub sync_endpoint_url: Option<String>,
    /// How long a trigger waits for the sync endpoint to finish a full sync.
    pub sync_trigger_timeout: Duration,
    pub sources: BTreeMap<SourceKind, SourceSyncConfig>,
    pub fetch: FetchConfig,
    pub ai: Option<AiBindingConfig>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup, validating everything up
    /// front.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let sync_endpoint_url = vars
            .optional("SYNC_ENDPOINT_URL")
            .map(|url| validate_url("SYNC_ENDPOINT_URL", url))
            .transpose()?;

        let mut sources = BTreeMap::new();
        for kind in SourceKind::ALL {
            sources.insert(kind, source_config(&vars, kind)?);
        }

        let ai = match vars.optional("AI_ENDPOINT") {
            Some(endpoint) => Some(AiBindingConfig {
                endpoint: validate_url("AI_ENDPOINT", endpoint)?,
                api_key: SecretString::from(vars.required("AI_API_KEY")?),
                max_retries: vars.parsed("AI_MAX_RETRIES", 3, "a non-negative integer")?,
                timeout: Duration::from_secs(vars.parsed(
                    "AI_TIMEOUT_SECS",
                    30,
                    "a number of seconds",
                )?),
                rate_limit_per_minute: vars.parsed(
                    "AI_RATE_LIMIT_PER_MINUTE",
                    60,
                    "a non-negative integer",
                )?,
            }),
            None => None,
        };

        Ok(Self {
            database_url: vars.required("DATABASE_URL")?,
            port: vars.parsed("PORT", 8080, "a valid port number")?,
            sync_endpoint_url,
            sync_trigger_timeout: Duration::from_secs(vars.parsed(
                "SYNC_TRIGGER_TIMEOUT_SECS",
                DEFAULT_SYNC_TRIGGER_TIMEOUT_SECS,
                "a number of seconds",
            )?),
            sources,
            fetch: FetchConfig {
                requests_per_second: vars.parsed(
                    "SOURCE_REQUESTS_PER_SECOND",
                    DEFAULT_REQUESTS_PER_SECOND,
                    "a positive integer",
                )?,
                http_timeout: Duration::from_secs(vars.parsed(
                    "HTTP_TIMEOUT_SECS",
                    30,
                    "a number of seconds",
                )?),
            },
            ai,
        })
    }

    pub fn source(&self, kind: SourceKind) -> Option<&SourceSyncConfig> {
        self.sources.get(&kind)
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Set and non-blank.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn parsed<T: std::str::FromStr>(
        &self,
        key: &str,
        default: T,
        expected: &'static str,
    ) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                value,
                expected,
            }),
            None => Ok(default),
        }
    }
}

fn source_config<F>(vars: &Vars<F>, kind: SourceKind) -> Result<SourceSyncConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = kind.env_prefix();
    let cron_var = format!("{}_SYNC_CRON", prefix);
    let cron = vars
        .optional(&cron_var)
        .unwrap_or_else(|| kind.default_cron().to_string());
    validate_cron(&cron_var, &cron)?;

    Ok(SourceSyncConfig {
        secret: vars
            .optional(&format!("{}_SYNC_SECRET", prefix))
            .map(SecretString::from),
        cron,
        query: vars.optional(&format!("{}_QUERY", prefix)),
    })
}

fn validate_url(var: &str, value: String) -> Result<String, ConfigError> {
    match reqwest::Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Ok(value.trim_end_matches('/').to_string())
        }
        Ok(url) => Err(ConfigError::InvalidUrl {
            var: var.to_string(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
            value,
        }),
        Err(e) => Err(ConfigError::InvalidUrl {
            var: var.to_string(),
            reason: e.to_string(),
            value,
        }),
    }
}

/// Reject expressions the scheduler would refuse at startup.
fn validate_cron(var: &str, expr: &str) -> Result<(), ConfigError> {
    Job::new(expr, |_uuid, _lock| {})
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidCron {
            var: var.to_string(),
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}
