use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The job boards this server knows how to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Himalayas,
    Jobicy,
    RemoteOk,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Himalayas, SourceKind::Jobicy, SourceKind::RemoteOk];

    /// Stable identifier used in routes, storage and logs.
    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Himalayas => job_sources::himalayas::SOURCE_NAME,
            SourceKind::Jobicy => job_sources::jobicy::SOURCE_NAME,
            SourceKind::RemoteOk => job_sources::remoteok::SOURCE_NAME,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::Himalayas => "Himalayas",
            SourceKind::Jobicy => "Jobicy",
            SourceKind::RemoteOk => "RemoteOK",
        }
    }

    /// Prefix for this source's environment variables, e.g. `REMOTEOK`.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            SourceKind::Himalayas => "HIMALAYAS",
            SourceKind::Jobicy => "JOBICY",
            SourceKind::RemoteOk => "REMOTEOK",
        }
    }

    /// Six-field cron expression (with seconds), staggered so the boards
    /// are not all hit on the same tick. RemoteOK asks clients to poll
    /// at most hourly.
    pub fn default_cron(&self) -> &'static str {
        match self {
            SourceKind::Himalayas => "0 0/5 * * * *",
            SourceKind::Jobicy => "0 2/5 * * * *",
            SourceKind::RemoteOk => "0 30 * * * *",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceKind {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}
