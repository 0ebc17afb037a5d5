use crate::harvest::scanner::SearchQuery;
use crate::model::Issue;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Pattern not matched: {title:?}")]
    PatternNotMatched { title: String },
}

/// Failures of a single repository's collection. None of these are fatal
/// to the process; the repository is retried on the next cycle.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("Search page for {repo} timed out after {timeout_secs}s")]
    FetchTimeout { repo: String, timeout_secs: u64 },
    #[error("Collector task failed: {0}")]
    TaskFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GITHUB_USERNAME is not set")]
    MissingUsername,
    #[error("GITHUB_REPONAMES is not specified")]
    MissingRepositories,
    #[error("Invalid repository name: {0:?}")]
    InvalidRepository(String),
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("GITHUB_TOKEN is not a valid header value")]
    InvalidToken,
}

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Collection stopped: {0}")]
    CollectionStopped(String),
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Runs one search request and returns that page of results in the
    /// order the upstream delivered them.
    async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, CollectError>;
}
