// Ledger Reconciliation - Web Server
// POST multipart uploads to /reconciliation-app/reconciliation

use anyhow::{Context, Result};
use ledger_recon::api::{router, AppState};
use ledger_recon::{logging, Config, DefaultReconciliationService, ReconciliationService};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to initialize config")?;
    logging::init(&config);

    info!(
        version = %config.app_version,
        env = ?config.app_env,
        port = config.server_http_port,
        read_timeout_s = config.http_read_timeout,
        write_timeout_s = config.http_write_timeout,
        inbound_timeout_s = config.http_inbound_timeout,
        "Starting Reconciliation App Service..."
    );

    // Built once, handed to every request through AppState
    let service: Arc<dyn ReconciliationService> = Arc::new(DefaultReconciliationService::new());

    let addr = format!("0.0.0.0:{}", config.server_http_port);
    let app = router(AppState::new(service, config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server shutdown gracefully");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
