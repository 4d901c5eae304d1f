// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! UI HTTP server implementation

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn};

use hive_core::presentation::api::{app, AppState};

use super::shutdown_signal;
use crate::services::HiveServices;

pub async fn start_ui_server(services: &HiveServices, bind: &str, port: u16) -> Result<()> {
    info!(
        pid = std::process::id(),
        agent_id = %services.agent_id(),
        "Hive UI server starting"
    );

    install_metrics_exporter(services, bind);

    let state = AppState {
        presence: services.presence(),
        inbox: services.inbox(),
        agent_id: services.agent_id().to_string(),
        default_ttl_seconds: services.ttl_seconds(),
        start_time: Instant::now(),
    };

    let addr = format!("{}:{}", bind, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("UI server listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("UI server shutting down");

    Ok(())
}

fn install_metrics_exporter(services: &HiveServices, bind: &str) {
    let Some(metrics) = services
        .config
        .spec
        .observability
        .as_ref()
        .and_then(|o| o.metrics.as_ref())
        .filter(|m| m.enabled)
    else {
        return;
    };

    let ip = bind.parse::<IpAddr>().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let addr = SocketAddr::new(ip, metrics.port);
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => info!("Prometheus metrics exporter listening on {}", addr),
        Err(e) => warn!("Failed to install Prometheus exporter on {}: {}", addr, e),
    }
}
