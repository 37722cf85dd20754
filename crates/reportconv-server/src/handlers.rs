// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP request handlers.
//!
//! `GET /` serves the static landing page. `POST /` decodes a multipart
//! upload into a scratch file, runs the pandoc conversion, and streams
//! the resulting PDF back. Decoding and materialization are combined:
//! uploaded bytes go straight into the input scratch file so the payload
//! is never buffered twice.

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::config::Config;
use crate::convert::{self, CancelToken, ConversionJob};
use crate::error::{Error, Result};
use crate::scratch::ScratchFile;
use crate::teams;

/// Shared state handed to every handler: the read-only configuration and
/// the server-wide cancel flag for in-flight conversions.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide configuration, immutable after startup.
    pub config: Arc<Config>,
    /// Set when the server begins shutting down.
    pub shutdown: CancelToken,
}

/// `GET /` — serve the static landing page.
pub async fn index(State(state): State<AppState>) -> Result<Response> {
    let bytes = tokio::fs::read(&state.config.index_path)
        .await
        .map_err(Error::StaticAsset)?;

    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        bytes,
    )
        .into_response())
}

/// `POST /` — convert an uploaded Markdown document to PDF.
pub async fn convert(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response> {
    let config = &state.config;

    let input = ScratchFile::create("pandoc-input-")?;
    let mut team_id: Option<String> = None;
    let mut inline_content: Option<String> = None;
    let mut wrote_upload = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("team") => {
                team_id = Some(field.text().await?);
            }
            Some("md-file") => {
                // Browsers send an empty md-file part when no file was
                // chosen; treat that the same as an absent field.
                if field.file_name().is_none_or(str::is_empty) {
                    continue;
                }
                write_upload(&input, field).await?;
                wrote_upload = true;
            }
            Some("md-content") => {
                inline_content = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let team_id = team_id
        .filter(|id| !id.is_empty())
        .ok_or(Error::MissingTeam)?;
    let team_name = teams::display_name(&team_id)
        .ok_or_else(|| Error::InvalidTeam(team_id.clone()))?;

    // md-file takes precedence; fall back to inline text.
    if !wrote_upload {
        let content = inline_content
            .filter(|c| !c.is_empty())
            .ok_or(Error::MissingContent)?;
        tokio::fs::write(input.path(), content).await?;
    }

    let output = ScratchFile::create("pandoc-output-")?;
    let job = ConversionJob::new(config, input.path(), output.path(), team_name.to_owned());
    convert::run(&job, Some(state.shutdown.clone())).await?;

    info!(team = %team_id, "conversion complete");

    // The scratch files are unlinked when the handler returns; the open
    // descriptor keeps the PDF readable until the stream completes.
    let file = tokio::fs::File::open(output.path()).await?;
    let stream = ReaderStream::new(file);

    Ok((
        [(header::CONTENT_TYPE, "application/pdf")],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Stream an uploaded field's bytes verbatim into the input scratch file.
async fn write_upload(
    input: &ScratchFile,
    mut field: axum::extract::multipart::Field<'_>,
) -> Result<()> {
    let mut file = tokio::fs::File::create(input.path()).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(Error::UnreadableUpload)? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    debug!(bytes = written, path = %input.path().display(), "stored uploaded Markdown");
    Ok(())
}
