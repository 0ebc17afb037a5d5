use crate::harvest::pipeline::{CollectStats, RepoCollector};
use crate::harvest::scanner::IssueScanner;
use crate::harvest::title::TitleParser;
use crate::metrics::OpenPullRequestMetrics;
use crate::model::RepoIdentity;
use crate::traits::{CollectError, SearchClient};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

/// Outcome of one repository within a cycle.
#[derive(Debug)]
pub struct RepoOutcome {
    pub repo: RepoIdentity,
    pub result: Result<CollectStats, CollectError>,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<RepoOutcome>,
    pub duration_ms: u64,
}

impl CycleReport {
    pub fn recorded(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|stats| stats.recorded)
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Owns the metric set and the upstream client, and runs collection cycles
/// against them.
pub struct SnapshotExecutor {
    collector: RepoCollector,
    metrics: Arc<OpenPullRequestMetrics>,
    semaphore: Arc<Semaphore>,
}

impl SnapshotExecutor {
    pub fn new(
        client: Arc<dyn SearchClient>,
        parser: TitleParser,
        metrics: Arc<OpenPullRequestMetrics>,
        page_timeout: Duration,
        concurrency_limit: usize,
    ) -> Self {
        let collector = RepoCollector::new(
            IssueScanner::new(client, page_timeout),
            Arc::new(parser),
            metrics.clone(),
        );

        Self {
            collector,
            metrics,
            semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
        }
    }

    pub fn metrics(&self) -> Arc<OpenPullRequestMetrics> {
        self.metrics.clone()
    }

    /// Resets the metric set and repopulates it from every repository.
    ///
    /// Repositories are collected concurrently and each one writes its
    /// observations as they arrive, so a scrape taken mid-cycle can see a
    /// partially repopulated set. A failing repository does not affect the
    /// others; its error is returned in the report.
    #[instrument(skip_all, fields(repos = repos.len()))]
    pub async fn run_cycle(&self, repos: &[RepoIdentity]) -> CycleReport {
        let start = Instant::now();
        info!("Starting collection cycle");

        self.metrics.reset();

        let mut tasks = JoinSet::new();
        for (index, repo) in repos.iter().cloned().enumerate() {
            let collector = self.collector.clone();
            let semaphore = self.semaphore.clone();

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => collector.collect(&repo).await,
                    Err(e) => Err(CollectError::TaskFailed(format!("Semaphore error: {}", e))),
                };
                (index, RepoOutcome { repo, result })
            });
        }

        let mut slots: Vec<Option<RepoOutcome>> = repos.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!(error = %e, "collector task failed"),
            }
        }

        let outcomes: Vec<RepoOutcome> = slots
            .into_iter()
            .zip(repos)
            .map(|(slot, repo)| {
                slot.unwrap_or_else(|| RepoOutcome {
                    repo: repo.clone(),
                    result: Err(CollectError::TaskFailed("task did not complete".to_string())),
                })
            })
            .collect();

        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                error!(repo = %outcome.repo, error = %e, "Repository collection failed");
            }
        }

        let report = CycleReport {
            outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            recorded = report.recorded(),
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "Finished collection cycle"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::scanner::tests::{issue, ScriptedClient};
    use crate::harvest::scanner::SearchQuery;
    use crate::model::Issue;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers per repository, keyed by the `repo:` qualifier of the query.
    /// Each repository has a queue of responses, one per request.
    struct PerRepoClient {
        responses: Mutex<HashMap<String, Vec<Result<Vec<Issue>, CollectError>>>>,
    }

    impl PerRepoClient {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
            }
        }

        fn push(&self, repo: &str, response: Result<Vec<Issue>, CollectError>) {
            self.responses
                .lock()
                .unwrap()
                .entry(repo.to_string())
                .or_default()
                .push(response);
        }
    }

    #[async_trait]
    impl SearchClient for PerRepoClient {
        async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, CollectError> {
            let repo = query
                .q
                .split_whitespace()
                .find_map(|term| term.strip_prefix("repo:"))
                .unwrap()
                .to_string();
            let mut responses = self.responses.lock().unwrap();
            let queue = responses.entry(repo).or_default();
            if queue.is_empty() {
                Ok(Vec::new())
            } else {
                queue.remove(0)
            }
        }
    }

    fn repos(names: &[&str]) -> Vec<RepoIdentity> {
        names.iter().map(|n| RepoIdentity::new("octo", *n)).collect()
    }

    fn executor(client: Arc<dyn SearchClient>) -> SnapshotExecutor {
        SnapshotExecutor::new(
            client,
            TitleParser::default(),
            Arc::new(OpenPullRequestMetrics::new(Some("github_dependabot"), "octo")),
            Duration::from_secs(5),
            4,
        )
    }

    #[tokio::test]
    async fn test_cycle_collects_every_repository() {
        let client = Arc::new(PerRepoClient::new());
        client.push(
            "octo/api",
            Ok(vec![
                issue(1, "Bump jsdom from 12.2.0 to 16.3.0", &["javascript"]),
                issue(2, "Bump axios from 0.19.0 to 0.21.1", &["javascript"]),
            ]),
        );
        client.push(
            "octo/worker",
            Ok(vec![issue(
                3,
                "Update grpc requirement from >= 1.19, < 1.29 to >= 1.19, < 1.31 in /baz-lib",
                &["go"],
            )]),
        );

        let executor = executor(client);
        let report = executor.run_cycle(&repos(&["api", "worker"])).await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].repo.name, "api");
        assert_eq!(report.outcomes[1].repo.name, "worker");
        assert_eq!(report.recorded(), 3);
        assert_eq!(report.failed(), 0);
        assert_eq!(executor.metrics().sample_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_next_cycle_drops_closed_pull_requests() {
        let client = Arc::new(PerRepoClient::new());
        client.push(
            "octo/api",
            Ok(vec![
                issue(1, "Bump jsdom from 12.2.0 to 16.3.0", &["javascript"]),
                issue(2, "Bump axios from 0.19.0 to 0.21.1", &["javascript"]),
            ]),
        );
        client.push(
            "octo/api",
            Ok(vec![issue(2, "Bump axios from 0.19.0 to 0.21.1", &["javascript"])]),
        );

        let executor = executor(client);
        let repos = repos(&["api"]);

        executor.run_cycle(&repos).await;
        assert_eq!(executor.metrics().sample_count().unwrap(), 2);

        executor.run_cycle(&repos).await;
        let text = executor.metrics().encode().unwrap();
        assert_eq!(executor.metrics().sample_count().unwrap(), 1);
        assert!(text.contains(r#"library="axios""#));
        assert!(!text.contains(r#"library="jsdom""#));
    }

    #[tokio::test]
    async fn test_failing_repository_does_not_block_others() {
        let client = Arc::new(PerRepoClient::new());
        client.push(
            "octo/broken",
            Err(CollectError::UpstreamStatus {
                status: 401,
                body: "Bad credentials".to_string(),
            }),
        );
        client.push(
            "octo/api",
            Ok(vec![issue(1, "Bump jsdom from 12.2.0 to 16.3.0", &["javascript"])]),
        );

        let executor = executor(client);
        let report = executor.run_cycle(&repos(&["broken", "api"])).await;

        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcomes[0].result,
            Err(CollectError::UpstreamStatus { status: 401, .. })
        ));
        assert_eq!(report.outcomes[1].result.as_ref().unwrap().recorded, 1);
        assert_eq!(executor.metrics().sample_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_limit_of_one_still_completes() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(vec![issue(1, "Bump a from 1 to 2", &[])]),
            Ok(vec![issue(2, "Bump b from 1 to 2", &[])]),
            Ok(vec![issue(3, "Bump c from 1 to 2", &[])]),
        ]));
        let executor = SnapshotExecutor::new(
            client.clone(),
            TitleParser::default(),
            Arc::new(OpenPullRequestMetrics::new(None, "octo")),
            Duration::from_secs(5),
            1,
        );

        let report = executor.run_cycle(&repos(&["one", "two", "three"])).await;

        assert_eq!(report.failed(), 0);
        assert_eq!(report.recorded(), 3);
        assert_eq!(client.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_repository_set() {
        let executor = executor(Arc::new(PerRepoClient::new()));
        let report = executor.run_cycle(&[]).await;

        assert!(report.outcomes.is_empty());
        assert_eq!(executor.metrics().sample_count().unwrap(), 0);
    }
}
