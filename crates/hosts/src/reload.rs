use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    fetcher::{FetchError, FetchOutcome, Fetcher},
    source::Source,
    store::BlackholeStore,
};

/// How a reload cycle reacts to a source that cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReloadPolicy {
    /// Stop at the first failing source. Sources after it are not attempted.
    #[default]
    FailFast,
    /// Attempt every source and report all failures at the end.
    BestEffort,
}

impl fmt::Display for ReloadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadPolicy::FailFast => f.write_str("fail-fast"),
            ReloadPolicy::BestEffort => f.write_str("best-effort"),
        }
    }
}

/// Result of one pass over all sources.
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub outcomes: Vec<FetchOutcome>,
    pub failures: Vec<FetchError>,
}

impl ReloadReport {
    pub fn added(&self) -> usize {
        self.outcomes.iter().map(|o| o.added).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("reload aborted: {0}")]
    Aborted(#[from] FetchError),
    #[error("{} of {} sources failed to load", .report.failures.len(), .report.failures.len() + .report.outcomes.len())]
    Partial { report: ReloadReport },
}

/// One reload cycle, as driven by the [`RefreshScheduler`](crate::RefreshScheduler).
#[async_trait]
pub trait ReloadCycle: Send + Sync + 'static {
    async fn reload(&self) -> anyhow::Result<ReloadReport>;
}

/// Fetches every configured source into a shared store.
#[derive(Debug, Clone)]
pub struct Reloader {
    fetcher: Fetcher,
    sources: Arc<[Source]>,
    store: Arc<BlackholeStore>,
    policy: ReloadPolicy,
}

impl Reloader {
    pub fn new(fetcher: Fetcher, sources: Vec<Source>, store: Arc<BlackholeStore>) -> Self {
        Self {
            fetcher,
            sources: sources.into(),
            store,
            policy: ReloadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn store(&self) -> &Arc<BlackholeStore> {
        &self.store
    }

    /// Fetch the sources in order and merge each one into the store.
    ///
    /// Sources merged before a failure stay merged under either policy.
    pub async fn reload_all(&self) -> Result<ReloadReport, ReloadError> {
        let mut report = ReloadReport::default();

        for source in self.sources.iter() {
            match self.fetcher.fetch_into(source, &self.store).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => match self.policy {
                    ReloadPolicy::FailFast => return Err(ReloadError::Aborted(e)),
                    ReloadPolicy::BestEffort => {
                        warn!("skipping hosts list: {}", e);
                        report.failures.push(e);
                    }
                },
            }
        }

        if !report.is_complete() {
            return Err(ReloadError::Partial { report });
        }

        info!(
            "reloaded {} sources, {} new names, blackhole now contains {} entries",
            report.outcomes.len(),
            report.added(),
            self.store.len()
        );
        Ok(report)
    }
}

#[async_trait]
impl ReloadCycle for Reloader {
    async fn reload(&self) -> anyhow::Result<ReloadReport> {
        Ok(self.reload_all().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(name: &str) -> ReloadPolicy {
        use serde::de::{
            IntoDeserializer,
            value::{Error, StrDeserializer},
        };
        let de: StrDeserializer<'_, Error> = name.into_deserializer();
        ReloadPolicy::deserialize(de).unwrap()
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(policy("fail-fast"), ReloadPolicy::FailFast);
        assert_eq!(policy("best-effort"), ReloadPolicy::BestEffort);
        assert_eq!(ReloadPolicy::default(), ReloadPolicy::FailFast);
        assert_eq!(ReloadPolicy::BestEffort.to_string(), "best-effort");
    }

    #[test]
    fn test_report_counts() {
        let source = Source::parse("http://127.0.0.1/hosts").unwrap();
        let report = ReloadReport {
            outcomes: vec![
                FetchOutcome {
                    source: source.clone(),
                    status: reqwest::StatusCode::OK,
                    parsed: 5,
                    added: 3,
                },
                FetchOutcome {
                    source,
                    status: reqwest::StatusCode::NOT_FOUND,
                    parsed: 1,
                    added: 1,
                },
            ],
            failures: vec![],
        };
        assert_eq!(report.added(), 4);
        assert!(report.is_complete());
    }
}
