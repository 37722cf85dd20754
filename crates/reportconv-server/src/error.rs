// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the request pipeline.
//!
//! Every request-scoped failure is converted to a bare HTTP status code:
//! 400 for client-input problems, 500 for internal or toolchain problems.
//! Diagnostic detail is logged server-side and never sent to the caller.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::convert::ConvertError;

/// Request-pipeline errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The multipart request body could not be parsed.
    #[error("malformed multipart request body: {0}")]
    MalformedRequest(#[from] MultipartError),

    /// The `team` field was absent or empty.
    #[error("missing team field")]
    MissingTeam,

    /// The `team` field did not match any known team.
    #[error("invalid team identifier: {0}")]
    InvalidTeam(String),

    /// Neither `md-file` nor `md-content` was provided.
    #[error("missing Markdown content: neither md-file nor md-content provided")]
    MissingContent,

    /// The `md-file` upload was present but could not be read.
    #[error("failed to read uploaded file: {0}")]
    UnreadableUpload(#[source] MultipartError),

    /// A scratch file could not be created or written.
    #[error("scratch file error: {0}")]
    Scratch(#[from] std::io::Error),

    /// The static landing page could not be read.
    #[error("failed to read landing page: {0}")]
    StaticAsset(#[source] std::io::Error),

    /// The pandoc conversion failed, timed out, or was cancelled.
    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),
}

/// Result type for request handling.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MalformedRequest(_)
            | Error::MissingTeam
            | Error::InvalidTeam(_)
            | Error::MissingContent => StatusCode::BAD_REQUEST,
            Error::UnreadableUpload(_)
            | Error::Scratch(_)
            | Error::StaticAsset(_)
            | Error::Convert(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            warn!(error = %self, "rejecting request");
        } else {
            error!(error = %self, "request failed");
        }
        // Status only, empty body: toolchain internals stay server-side.
        status.into_response()
    }
}
