// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request-private scratch files.
//!
//! Each conversion request owns two scratch files: one holding the
//! uploaded Markdown, one receiving the rendered PDF. Deletion is tied to
//! `Drop`, so it runs on every exit path of request handling — success,
//! validation failure, pandoc failure, and a dropped (client-disconnected)
//! request future alike. Deletion failures are logged, never propagated.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A uniquely named temporary file owned exclusively by one request.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Create an empty scratch file in the system temporary directory.
    ///
    /// `purpose` becomes the file name prefix (e.g. `pandoc-input-`);
    /// uniqueness of the generated name is the temp-file provider's job.
    pub fn create(purpose: &str) -> std::io::Result<Self> {
        Self::create_in(purpose, std::env::temp_dir())
    }

    /// Create an empty scratch file in a specific directory.
    pub fn create_in(purpose: &str, dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(purpose)
            .tempfile_in(dir)?;
        // Take over deletion from tempfile so failures can be logged.
        let path = file.into_temp_path().keep().map_err(|e| e.error)?;

        debug!(path = %path.display(), "created scratch file");
        Ok(Self { path })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to delete scratch file");
        } else {
            debug!(path = %self.path.display(), "deleted scratch file");
        }
    }
}
