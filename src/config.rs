//! Process configuration: command-line flags with environment fallbacks.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::github::DEFAULT_API_URL;
use crate::metrics::DEFAULT_NAMESPACE;
use crate::model::RepoIdentity;
use crate::traits::ConfigError;

/// Prometheus exporter for open dependabot pull requests.
#[derive(Debug, Clone, Parser)]
#[command(name = "dependabot-exporter")]
#[command(version)]
pub struct Cli {
    /// Account or organisation that owns the repositories
    #[arg(long, env = "GITHUB_USERNAME")]
    pub username: Option<String>,

    /// API token sent as a bearer token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Single repository to monitor (takes precedence over --reponames)
    #[arg(long, env = "GITHUB_REPONAME")]
    pub reponame: Option<String>,

    /// Comma-separated repositories to monitor
    #[arg(long, env = "GITHUB_REPONAMES")]
    pub reponames: Option<String>,

    /// Address of the /metrics endpoint
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Seconds between collection cycles
    #[arg(long, env = "COLLECT_INTERVAL_SECS", default_value_t = 300)]
    pub interval_secs: u64,

    /// Timeout for a single search page, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Metric name prefix; empty for none
    #[arg(long, env = "METRICS_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Maximum repositories collected at the same time
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = 16)]
    pub max_concurrency: usize,

    /// Labels recognised as languages
    #[arg(
        long,
        env = "LANGUAGE_LABELS",
        value_delimiter = ',',
        default_value = "ruby,javascript,python,elixir,rust,java,go,elm"
    )]
    pub language_labels: Vec<String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub username: String,
    pub token: Option<String>,
    pub repositories: Vec<RepoIdentity>,
    pub listen: SocketAddr,
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub api_url: String,
    pub namespace: Option<String>,
    pub max_concurrency: usize,
    pub language_labels: Vec<String>,
}

impl Cli {
    /// Checks the identity and repository settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the username or repository list is
    /// missing or empty, a repository name contains `/` or whitespace, or
    /// the interval, fetch timeout or concurrency limit is zero.
    pub fn validate(self) -> Result<ExporterConfig, ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroValue("COLLECT_INTERVAL_SECS"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("FETCH_TIMEOUT_SECS"));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroValue("MAX_CONCURRENCY"));
        }

        let username = self
            .username
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingUsername)?;
        let username = username.trim().to_string();

        let names = repository_names(self.reponame.as_deref(), self.reponames.as_deref())?;
        let repositories = names
            .into_iter()
            .map(|name| RepoIdentity::new(username.clone(), name))
            .collect();

        Ok(ExporterConfig {
            username,
            token: self.token,
            repositories,
            listen: self.listen,
            interval: Duration::from_secs(self.interval_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            api_url: self.api_url,
            namespace: Some(self.namespace).filter(|ns| !ns.is_empty()),
            max_concurrency: self.max_concurrency,
            language_labels: self
                .language_labels
                .iter()
                .map(|label| label.trim())
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

/// Resolves the repository list. A single name wins over the list; list
/// entries are trimmed and empty entries dropped.
fn repository_names(
    single: Option<&str>,
    list: Option<&str>,
) -> Result<Vec<String>, ConfigError> {
    let names: Vec<String> = match (single.map(str::trim), list) {
        (Some(name), _) if !name.is_empty() => vec![name.to_string()],
        (_, Some(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    if names.is_empty() {
        return Err(ConfigError::MissingRepositories);
    }

    if let Some(bad) = names
        .iter()
        .find(|name| name.contains('/') || name.contains(char::is_whitespace))
    {
        return Err(ConfigError::InvalidRepository(bad.clone()));
    }

    Ok(names)
}
