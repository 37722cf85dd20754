// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for reportconv-server.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

const RESOURCES_DIR: &str = "resources";
const INDEX_SUBPATH: &str = "static/index.html";
const PANDOC_FONTS_SUBPATH: &str = "pandoc/fonts";
const PANDOC_TYPST_TEMPLATE_SUBPATH: &str = "pandoc/templates/typst.template";

/// Command-line interface. Every flag is also settable through an
/// environment variable, which `.env` loading feeds into.
#[derive(Debug, Parser)]
#[command(
    name = "reportconv-server",
    about = "minimal server for converting Markdown reports to neat PDFs"
)]
pub struct Cli {
    /// Path to the application root directory (defaults to the working directory)
    #[arg(long, env = "APPLICATION_ROOT")]
    pub application_root: Option<PathBuf>,

    /// Name of the pandoc executable
    #[arg(long, env = "PANDOC_EXECUTABLE", default_value = "pandoc")]
    pub pandoc_executable: String,

    /// Timeout for a single pandoc conversion, in seconds
    #[arg(long, env = "PANDOC_TIMEOUT", default_value_t = 10)]
    pub pandoc_timeout: u64,

    /// Host to expose the service on
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to expose the service on
    #[arg(short, long, env = "HTTP_PORT", default_value_t = 3333,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,
}

/// Process-wide configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application root directory containing `resources/` and `logs/`
    pub app_root: PathBuf,
    /// Host to bind the HTTP listener on
    pub host: String,
    /// Port to bind the HTTP listener on
    pub port: u16,
    /// Name (or path) of the pandoc executable
    pub pandoc_executable: String,
    /// Upper bound for a single conversion
    pub pandoc_timeout: Duration,
    /// Font directory handed to the typst engine via `TYPST_FONT_PATHS`
    pub fonts_path: PathBuf,
    /// Pandoc template used for every conversion
    pub typst_template_path: PathBuf,
    /// Static landing page served on `GET /`
    pub index_path: PathBuf,
}

impl Config {
    /// Build the configuration from parsed CLI arguments, deriving the
    /// resource paths under the application root.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let app_root = match cli.application_root {
            Some(root) => root,
            // No root provided: fall back to the working directory. Logging is
            // not up yet at this point, so main reports the chosen root later.
            None => std::env::current_dir().map_err(ConfigError::WorkingDir)?,
        };

        let resources = app_root.join(RESOURCES_DIR);

        Ok(Self {
            host: cli.host,
            port: cli.port,
            pandoc_executable: cli.pandoc_executable,
            pandoc_timeout: Duration::from_secs(cli.pandoc_timeout),
            fonts_path: resources.join(PANDOC_FONTS_SUBPATH),
            typst_template_path: resources.join(PANDOC_TYPST_TEMPLATE_SUBPATH),
            index_path: resources.join(INDEX_SUBPATH),
            app_root,
        })
    }

    /// Directory for the server log file.
    pub fn log_dir(&self) -> PathBuf {
        self.app_root.join("logs")
    }
}

/// Configuration errors. All are fatal at startup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The working directory could not be determined.
    #[error("failed to determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    /// The log directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    LogDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
