// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! UI server process
//!
//! Handles:
//! - Serving the hosted UI routes in the foreground
//! - Prometheus exporter when metrics are enabled
//! - Graceful shutdown on Ctrl+C / SIGTERM
//!
//! Detaching, PID tracking and stopping are owned by the lifecycle
//! controller (`hive ui cycle`), which spawns this server as a child.

use tokio::signal;
use tracing::info;

pub mod server;

pub use server::start_ui_server;

/// Resolves once the process is asked to stop.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
