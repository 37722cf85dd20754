// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! reportconv-server - Markdown report to PDF conversion service
//!
//! A small HTTP front-end that accepts a Markdown document (uploaded file
//! or inline text) plus a team identifier, runs pandoc with the typst PDF
//! engine, and returns the rendered PDF. Markdown parsing and PDF
//! rendering are entirely delegated to the external toolchain; this crate
//! owns request decoding, scratch-file lifecycle, bounded process
//! execution, and response streaming.
//!
//! # HTTP Surface
//!
//! | Route | Method | Behavior |
//! |-------|--------|----------|
//! | `/` | GET | Serve the static landing page |
//! | `/` | POST | Multipart conversion request, responds `application/pdf` |
//! | `/` | other | 405, empty body |
//!
//! The POST form carries a required `team` field and either an `md-file`
//! upload or an `md-content` text field; `md-file` takes precedence.
//! Client-input problems yield 400, internal and toolchain problems 500,
//! always with empty bodies.
//!
//! # Configuration
//!
//! Each knob is a CLI flag and an environment variable (a `.env` file is
//! loaded first):
//!
//! | Flag | Env | Default | Description |
//! |------|-----|---------|-------------|
//! | `--application-root` | `APPLICATION_ROOT` | cwd | Root with `resources/` and `logs/` |
//! | `--pandoc-executable` | `PANDOC_EXECUTABLE` | `pandoc` | Toolchain executable |
//! | `--pandoc-timeout` | `PANDOC_TIMEOUT` | `10` | Conversion timeout (seconds) |
//! | `--host` | `HTTP_HOST` | `0.0.0.0` | Listen host |
//! | `--port` | `HTTP_PORT` | `3333` | Listen port |
//!
//! Expected layout under the application root:
//! `resources/static/index.html`, `resources/pandoc/fonts/`,
//! `resources/pandoc/templates/typst.template`, plus a writable `logs/`.
//!
//! # Modules
//!
//! - [`config`]: CLI/env configuration and derived resource paths
//! - [`convert`]: pandoc invocation with timeout and cancellation
//! - [`error`]: request-pipeline error taxonomy and HTTP mapping
//! - [`handlers`]: HTTP request handlers
//! - [`scratch`]: request-private temporary files
//! - [`server`]: listener lifecycle and graceful shutdown
//! - [`teams`]: team identifier lookup

#![deny(missing_docs)]

/// CLI/env configuration and derived resource paths.
pub mod config;

/// Pandoc invocation with timeout and cancellation.
pub mod convert;

/// Request-pipeline error taxonomy and HTTP mapping.
pub mod error;

/// HTTP request handlers.
pub mod handlers;

/// Request-private temporary files.
pub mod scratch;

/// Listener lifecycle and graceful shutdown.
pub mod server;

/// Team identifier lookup.
pub mod teams;

pub use config::Config;
pub use error::Error;
