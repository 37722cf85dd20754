// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! reportconv-server entry point.
//!
//! Startup order matters: `.env` is loaded before CLI parsing so
//! environment-backed flags see it, and the log directory must exist
//! before the file log layer is installed. Startup failures are fatal;
//! the process never begins serving in a half-configured state.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use reportconv_server::config::{Cli, Config, ConfigError};
use reportconv_server::server;

const LOG_FILE_NAME: &str = "reportconv.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_result = dotenvy::dotenv();

    let config = Config::from_cli(Cli::parse())?;

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).map_err(|source| ConfigError::LogDir {
        path: log_dir.clone(),
        source,
    })?;

    // Log to stderr and to logs/reportconv.log under the application root.
    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reportconv_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    if let Err(e) = dotenv_result {
        warn!("no .env file loaded: {}", e);
    }

    info!(
        app_root = %config.app_root.display(),
        pandoc = %config.pandoc_executable,
        timeout_secs = config.pandoc_timeout.as_secs(),
        "starting reportconv-server"
    );

    server::run(Arc::new(config)).await?;

    info!("reportconv-server shut down");

    Ok(())
}
