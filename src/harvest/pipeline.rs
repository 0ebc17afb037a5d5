//! Per-repository collection pipeline.
//!
//! This module provides the [`RepoCollector`] that runs the two harvest
//! stages for one repository (Scanner → Title Parser) and records every
//! parsed pull request into the exposed metric set with:
//! - Incremental consumption of the scanner's stream via `futures`
//! - Structured logging via `tracing`
//! - Per-repository statistics in [`CollectStats`]

use std::sync::Arc;
use std::time::Instant;

use futures::{pin_mut, TryStreamExt};
use tracing::{info, instrument, warn};

use crate::harvest::scanner::IssueScanner;
use crate::harvest::title::TitleParser;
use crate::metrics::OpenPullRequestMetrics;
use crate::model::{OpenPullRequestLabels, RepoIdentity};
use crate::traits::CollectError;

// ============================================================================
// Collector Types
// ============================================================================

/// Statistics about one repository's collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectStats {
    /// Issues yielded by the scanner
    pub issues_seen: usize,

    /// Issues parsed and written to the metric set
    pub recorded: usize,

    /// Issues skipped because their title did not match
    pub unparsed: usize,

    /// Wall time for the whole repository (milliseconds)
    pub duration_ms: u64,
}

// ============================================================================
// Collector
// ============================================================================

/// Collects one repository's open bump PRs into the metric set.
///
/// Cloning is cheap; every field is shared. The orchestrator clones one
/// collector per spawned task.
#[derive(Clone)]
pub struct RepoCollector {
    scanner: IssueScanner,
    parser: Arc<TitleParser>,
    metrics: Arc<OpenPullRequestMetrics>,
}

impl RepoCollector {
    pub fn new(
        scanner: IssueScanner,
        parser: Arc<TitleParser>,
        metrics: Arc<OpenPullRequestMetrics>,
    ) -> Self {
        Self {
            scanner,
            parser,
            metrics,
        }
    }

    /// Scans `repo` and records each parsed PR as soon as it arrives.
    ///
    /// Titles that do not parse are logged and skipped. A scanner error
    /// stops this repository only; observations recorded before the error
    /// stay in the metric set until the next reset.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError`] if any search page fails or times out.
    #[instrument(skip_all, fields(repo = %repo))]
    pub async fn collect(&self, repo: &RepoIdentity) -> Result<CollectStats, CollectError> {
        let start = Instant::now();
        let mut stats = CollectStats::default();

        let issues = self.scanner.scan(repo);
        pin_mut!(issues);

        while let Some(issue) = issues.try_next().await? {
            stats.issues_seen += 1;

            match self.parser.parse(&issue.title, issue.label_names()) {
                Ok(bump) => {
                    self.metrics.record(&OpenPullRequestLabels::new(repo, bump));
                    stats.recorded += 1;
                }
                Err(e) => {
                    warn!(number = issue.number, title = %issue.title, error = %e, "failed to parse");
                    stats.unparsed += 1;
                }
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            issues = stats.issues_seen,
            recorded = stats.recorded,
            unparsed = stats.unparsed,
            duration_ms = stats.duration_ms,
            "Repository collected"
        );

        Ok(stats)
    }
}

// ============================================================================
// Tests
// ============================================================================
