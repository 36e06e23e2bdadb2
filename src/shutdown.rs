use std::sync::Arc;

use actix_web::dev::ServerHandle;
use sqlx::{Pool, Postgres};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::worker::PollCoordinator;

/// Handles graceful shutdown of the application
///
/// Orchestrates shutdown by:
/// 1. Listening for shutdown signals (SIGTERM, SIGINT/CTRL+C)
/// 2. Stopping the HTTP server (stops accepting new submissions)
/// 3. Signaling poll loops to stop without writing further updates
/// 4. Waiting for all poll loops to exit
/// 5. Closing database connections
///
/// Jobs interrupted this way stay `processing` and are picked up by the
/// resume sweep on the next start.
pub struct ShutdownCoordinator {
    server_handle: ServerHandle,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    poll_coordinator: Arc<PollCoordinator>,
    shutdown_tx: watch::Sender<bool>,
    pool: Pool<Postgres>,
}

impl ShutdownCoordinator {
    pub fn new(
        server_handle: ServerHandle,
        server_task: JoinHandle<Result<(), std::io::Error>>,
        poll_coordinator: Arc<PollCoordinator>,
        shutdown_tx: watch::Sender<bool>,
        pool: Pool<Postgres>,
    ) -> Self {
        Self {
            server_handle,
            server_task,
            poll_coordinator,
            shutdown_tx,
            pool,
        }
    }

    /// Block until CTRL+C or SIGTERM, then run the shutdown sequence.
    pub async fn wait_for_shutdown(self) -> Result<(), std::io::Error> {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install CTRL+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received CTRL+C signal, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM signal, initiating graceful shutdown...");
            }
        }

        self.shutdown().await
    }

    async fn shutdown(self) -> Result<(), std::io::Error> {
        // 1. Stop HTTP server (no new submissions)
        info!("Stopping HTTP server (no longer accepting new requests)...");
        self.server_handle.stop(true).await;
        info!("HTTP server stopped accepting new requests");

        // 2. Signal poll loops to stop
        info!("Signaling poll loops to stop...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal to poll loops: {:?}", e);
        }

        // 3. Wait for poll loops to exit
        info!("Waiting for active poll loops to exit...");
        self.poll_coordinator.join_active().await;
        info!("All poll loops stopped");

        // 4. Wait for the server task itself
        match self.server_task.await {
            Ok(Ok(())) => info!("HTTP server task finished"),
            Ok(Err(e)) => error!("HTTP server task returned an error: {:?}", e),
            Err(e) => error!("HTTP server task panicked: {:?}", e),
        }

        // 5. Close database connections
        info!("Closing database connections...");
        self.pool.close().await;
        info!("Database connections closed");

        info!("Graceful shutdown complete");
        Ok(())
    }
}
