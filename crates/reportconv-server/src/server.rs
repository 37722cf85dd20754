// Copyright (C) 2025 LES e.V.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP server lifecycle.
//!
//! Starting -> Serving -> ShuttingDown -> Stopped. Shutdown is triggered
//! by a fatal listener error or by SIGINT/SIGTERM, whichever comes first.
//! On shutdown the listener stops accepting, the server-wide cancel flag
//! is set so in-flight conversions abort, and remaining requests get a
//! fixed grace period before the process gives up on them.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::convert::CancelToken;
use crate::handlers::{self, AppState};

/// Maximum accepted multipart body size (32 MiB).
const MAX_UPLOAD_BYTES: usize = 32 << 20;

/// Bound on a single request, covering slow clients on both directions.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How long in-flight requests may run after shutdown is triggered.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Server lifecycle errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// Binding the listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address the server tried to bind.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The listener failed while serving.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    /// The serve task panicked.
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Build the application router.
///
/// Exposed separately from [`run`] so tests can drive the exact
/// production routing and middleware without a live listener.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index).post(handlers::convert))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, serve, and shut down gracefully.
pub async fn run(config: Arc<Config>) -> Result<(), ServerError> {
    let shutdown: CancelToken = Arc::new(AtomicBool::new(false));
    let state = AppState {
        config: config.clone(),
        shutdown: shutdown.clone(),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(addr.as_str()).await.map_err(|source| ServerError::Bind {
        addr: addr.clone(),
        source,
    })?;

    info!(addr = %addr, "running server");

    let (graceful_tx, mut graceful_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, router(state)).with_graceful_shutdown(async move {
        let _ = graceful_rx.changed().await;
    });
    let mut serve_task = tokio::spawn(server.into_future());

    tokio::select! {
        res = &mut serve_task => {
            // Fatal listener error before any shutdown request.
            shutdown.store(true, Ordering::Relaxed);
            return match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ServerError::Serve(e)),
                Err(e) => Err(ServerError::Join(e)),
            };
        }
        _ = shutdown_signal() => {
            info!("received shutdown signal");
        }
    }

    info!(
        grace_secs = SHUTDOWN_GRACE.as_secs(),
        "attempting to shut down server gracefully"
    );
    shutdown.store(true, Ordering::Relaxed);
    let _ = graceful_tx.send(true);

    match tokio::time::timeout(SHUTDOWN_GRACE, &mut serve_task).await {
        Ok(Ok(Ok(()))) => info!("server stopped"),
        Ok(Ok(Err(e))) => return Err(ServerError::Serve(e)),
        Ok(Err(e)) => return Err(ServerError::Join(e)),
        Err(_) => {
            warn!("grace period expired, abandoning in-flight requests");
            serve_task.abort();
        }
    }

    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}
