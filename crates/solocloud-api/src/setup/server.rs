//! Listener binding and graceful shutdown.

use anyhow::{Context, Result};
use axum::Router;
use solocloud_core::Config;
use std::net::{Ipv4Addr, SocketAddr};

/// Serve `app` on `0.0.0.0:{PORT}` until Ctrl+C or SIGTERM; in-flight requests finish first.
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %listener.local_addr().unwrap_or(addr),
        upload_folder = %config.upload_folder.display(),
        max_upload_mb = config.max_upload_bytes / 1024 / 1024,
        public_base_url = config.public_base_url.as_deref().unwrap_or("-"),
        "Listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// A signal whose handler cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for Ctrl+C");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };

    tracing::info!(signal = received, "Shutting down, draining connections");
}
