//! Cursor-paginated search over one repository's open bump PRs.
//!
//! Every page is requested as page 1 of a fresh query; continuation is
//! expressed with a `created:>` filter on the creation time of the last
//! issue seen. Issues sharing that exact timestamp across a page
//! boundary are skipped by the strict comparison.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::Stream;
use tokio::time::timeout;
use tracing::debug;

use crate::model::{Issue, RepoIdentity};
use crate::traits::{CollectError, SearchClient};

/// Page size of every search request. A shorter page ends the scan.
pub const SEARCH_PER_PAGE: u32 = 100;

/// A single search request against the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Full query string, e.g. `repo:octo/widgets is:pr is:open label:dependencies`.
    pub q: String,
    pub sort: &'static str,
    pub order: &'static str,
    pub page: u32,
    pub per_page: u32,
}

impl SearchQuery {
    pub fn open_dependency_prs(repo: &RepoIdentity, created_after: Option<DateTime<Utc>>) -> Self {
        let mut q = format!("repo:{} is:pr is:open label:dependencies", repo.full_name());
        if let Some(created) = created_after {
            q.push_str(" created:>");
            q.push_str(&created.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        Self {
            q,
            sort: "created",
            order: "asc",
            page: 1,
            per_page: SEARCH_PER_PAGE,
        }
    }
}

/// Drives the paginated search for a repository.
#[derive(Clone)]
pub struct IssueScanner {
    client: Arc<dyn SearchClient>,
    page_timeout: Duration,
}

impl IssueScanner {
    pub fn new(client: Arc<dyn SearchClient>, page_timeout: Duration) -> Self {
        Self {
            client,
            page_timeout,
        }
    }

    /// Yields the repository's open bump PRs in creation order.
    ///
    /// The stream is finite and not restartable. The first failed or
    /// timed-out page yields a single error and ends the stream.
    pub fn scan<'a>(
        &'a self,
        repo: &'a RepoIdentity,
    ) -> impl Stream<Item = Result<Issue, CollectError>> + Send + 'a {
        async_stream::try_stream! {
            let mut cursor: Option<DateTime<Utc>> = None;
            let mut page_count = 0u32;

            loop {
                let query = SearchQuery::open_dependency_prs(repo, cursor);
                debug!(repo = %repo, query = %query.q, "fetching search page");

                let page = timeout(self.page_timeout, self.client.search_issues(&query))
                    .await
                    .map_err(|_| CollectError::FetchTimeout {
                        repo: repo.full_name(),
                        timeout_secs: self.page_timeout.as_secs(),
                    })?;
                let issues = page?;
                page_count += 1;

                let returned = issues.len();
                for issue in issues {
                    cursor = Some(issue.created_at);
                    yield issue;
                }

                if returned < query.per_page as usize {
                    debug!(repo = %repo, pages = page_count, "reached last search page");
                    break;
                }
            }
        }
    }
}
