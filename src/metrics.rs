//! The exposed metric set.
//!
//! One gauge family, `open_pull_requests`, with a sample fixed at 1 per
//! open and parsed bump PR. Closed PRs disappear through [`reset`] at the
//! start of every cycle rather than by per-key deletion.
//!
//! [`reset`]: OpenPullRequestMetrics::reset

use std::borrow::Cow;
use std::fmt;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::model::OpenPullRequestLabels;

pub const DEFAULT_NAMESPACE: &str = "github_dependabot";

/// Content type of [`OpenPullRequestMetrics::encode`] output.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Registry plus the gauge family it exposes.
///
/// All operations take `&self` and are safe to call from collector tasks
/// and scrape handlers at the same time.
#[derive(Debug)]
pub struct OpenPullRequestMetrics {
    registry: Registry,
    open_pull_requests: Family<OpenPullRequestLabels, Gauge>,
}

impl OpenPullRequestMetrics {
    /// Builds the registry. `username` becomes a constant label on every
    /// sample; an empty or missing namespace leaves the name unprefixed.
    pub fn new(namespace: Option<&str>, username: &str) -> Self {
        let const_labels = std::iter::once((
            Cow::Borrowed("username"),
            Cow::Owned(username.to_string()),
        ));

        let mut registry = match namespace.filter(|ns| !ns.is_empty()) {
            Some(ns) => Registry::with_prefix_and_labels(ns, const_labels),
            None => Registry::with_labels(const_labels),
        };

        let open_pull_requests = Family::<OpenPullRequestLabels, Gauge>::default();
        registry.register(
            "open_pull_requests",
            "Open Pull Requests sent by dependabot",
            open_pull_requests.clone(),
        );

        Self {
            registry,
            open_pull_requests,
        }
    }

    /// Marks one bump PR as currently open.
    pub fn record(&self, labels: &OpenPullRequestLabels) {
        self.open_pull_requests.get_or_create(labels).set(1);
    }

    /// Drops every label set recorded so far.
    pub fn reset(&self) {
        self.open_pull_requests.clear();
    }

    /// Renders the registry in text exposition format.
    pub fn encode(&self) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }

    #[cfg(test)]
    pub(crate) fn sample_count(&self) -> Result<usize, fmt::Error> {
        Ok(self
            .encode()?
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .count())
    }
}
