//! dependabot-exporter - serves open dependency-bump PRs as Prometheus gauges.

use std::future::IntoFuture;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dependabot_exporter::config::Cli;
use dependabot_exporter::github::GitHubClient;
use dependabot_exporter::harvest::TitleParser;
use dependabot_exporter::metrics::OpenPullRequestMetrics;
use dependabot_exporter::scheduler::CollectionScheduler;
use dependabot_exporter::{server, ExporterError, SnapshotExecutor};

#[tokio::main]
async fn main() -> Result<(), ExporterError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dependabot_exporter=info,warn"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = Cli::parse().validate().inspect_err(|e| {
        error!(error = %e, "invalid configuration");
    })?;

    info!(
        username = %config.username,
        repositories = config.repositories.len(),
        interval_secs = config.interval.as_secs(),
        "Starting dependabot exporter"
    );

    let client = GitHubClient::new(&config.api_url, config.token.as_deref())?;
    let metrics = Arc::new(OpenPullRequestMetrics::new(
        config.namespace.as_deref(),
        &config.username,
    ));
    let executor = Arc::new(SnapshotExecutor::new(
        Arc::new(client),
        TitleParser::with_languages(config.language_labels.iter().map(String::as_str)),
        metrics.clone(),
        config.fetch_timeout,
        config.max_concurrency,
    ));

    let scheduler = CollectionScheduler::new(executor, config.repositories.clone())
        .with_interval(config.interval);
    let mut collection = tokio::spawn(scheduler.run());

    let listener = TcpListener::bind(config.listen).await?;
    info!(addr = %config.listen, "Serving /metrics");

    let serve = axum::serve(listener, server::router(metrics))
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    // The scheduler never returns on its own; if it does, collection is dead.
    tokio::select! {
        served = serve => {
            collection.abort();
            served?;
        }
        stopped = &mut collection => {
            let reason = match stopped {
                Ok(()) => "scheduler exited".to_string(),
                Err(e) => e.to_string(),
            };
            error!(%reason, "collection scheduler stopped");
            return Err(ExporterError::CollectionStopped(reason));
        }
    }

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
