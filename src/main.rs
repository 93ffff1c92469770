use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use canvas_notion_sync::canvas::CanvasHttpClient;
use canvas_notion_sync::cli::Cli;
use canvas_notion_sync::config::SyncConfig;
use canvas_notion_sync::error::AppError;
use canvas_notion_sync::notion::NotionHttpClient;
use canvas_notion_sync::services::{SyncReport, SyncService};

/// Exit status when the pass finished but some rows could not be written.
const EXIT_PARTIAL: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "canvas_notion_sync=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(report) if report.has_failures() => {
            for failure in &report.failures {
                error!("{} {} failed: {}", failure.action, failure.key, failure.error);
            }
            error!(
                "Sync finished with {} failed row(s); created {}, updated {}",
                report.failures.len(),
                report.stats.created,
                report.stats.updated
            );
            ExitCode::from(EXIT_PARTIAL)
        }
        Ok(report) => {
            info!(
                "Sync complete{}: created {}, updated {}, unchanged {}, skipped {}",
                if report.dry_run { " (dry run)" } else { "" },
                report.stats.created,
                report.stats.updated,
                report.stats.unchanged,
                report.stats.skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Sync aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<SyncReport, AppError> {
    let config = SyncConfig::from_cli(cli)?;

    let canvas = Arc::new(CanvasHttpClient::new(config.canvas)?);
    let notion = Arc::new(NotionHttpClient::new(config.notion)?);
    let service = SyncService::new(canvas, notion, config.sync);

    service.sync_all(Utc::now()).await
}
