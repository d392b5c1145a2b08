mod api;
mod app;
mod categories;
mod cli;
mod config;
mod error;
mod models;
mod predictor;
mod visualizer;

use clap::Parser;
use cli::Cli;
use colored::*;
use config::Config;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Logs go to stderr; with a log directory they are also written as daily-rolling JSON.
/// The returned guard must stay alive until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let appender = log_dir.map(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("aqi-monitor")
            .filename_suffix("log")
            .build(dir)
            .map_err(|e| (dir.to_path_buf(), e))
    });

    match appender {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().json().with_writer(writer))
                .init();
            Some(guard)
        },
        other => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            if let Some(Err((dir, e))) = other {
                warn!("File logging disabled, cannot use {}: {}", dir.display(), e);
            }
            None
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e.to_string().red());
            return ExitCode::FAILURE;
        },
    };
    let _guard = init_tracing(config.log_dir.as_deref());

    info!("Starting AQI monitor");
    match cli::run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:?}", e);
            eprintln!("{} {}", "Error:".red().bold(), e.to_string().red());
            ExitCode::FAILURE
        },
    }
}
