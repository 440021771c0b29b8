// Copyright (c) 2026 Custodia Contributors. MIT License.
// See LICENSE for details.

//! # Custodia Node
//!
//! Entry point for the `custodia-node` binary. Parses CLI arguments,
//! initializes logging and metrics, boots the devnet vault, and serves the
//! HTTP/WS API.
//!
//! Subcommands:
//!
//! - `run`     — start the node
//! - `status`  — query a running node's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod devnet;
mod logging;
mod metrics;
mod rpc;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{broadcast, Mutex};

use custodia_protocol::config::{PROTOCOL_VERSION, REFERENCE_UNIT};
use custodia_protocol::{Address, SystemClock};

use cli::{Commands, CustodiaCli};
use devnet::{Devnet, DevnetConfig};
use metrics::NodeMetrics;

/// Broadcast channel capacity for live event streaming.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CustodiaCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Boots the devnet vault and serves the API and metrics endpoints until a
/// shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(&logging::default_directive(&args.log_level), args.log_format);

    let owner = match &args.owner {
        Some(s) => s
            .parse::<Address>()
            .with_context(|| format!("invalid owner address: {s}"))?,
        None => Address::derive("custodia:owner"),
    };
    let bank_cap = u128::from(args.bank_cap)
        .checked_mul(REFERENCE_UNIT)
        .context("bank cap overflows")?;
    let native_price = i128::from(args.native_price)
        .checked_mul(REFERENCE_UNIT as i128)
        .context("native price overflows")?;

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        %owner,
        bank_cap = args.bank_cap,
        native_price = args.native_price,
        "starting custodia-node"
    );

    // --- Vault ---
    let devnet = Arc::new(
        Devnet::new(
            Arc::new(SystemClock),
            DevnetConfig {
                owner,
                bank_cap,
                native_price,
            },
        )
        .context("failed to boot devnet vault")?,
    );
    tracing::info!(
        vault = %devnet.vault().address(),
        native_feed = %devnet.native_feed(),
        "vault deployed"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics
        .registered_assets
        .set(devnet.vault().supported_assets().len() as i64);

    // --- Application state ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        network: "devnet".to_string(),
        devnet: Arc::clone(&devnet),
        sequencer: Arc::new(Mutex::new(api::Sequencer::default())),
        event_tx,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Feed refresher ---
    // Devnet feeds have no external publisher, so the node re-publishes
    // their answers to keep them inside the staleness window.
    let refresher = (args.feed_refresh_secs > 0).then(|| {
        let state = app_state.clone();
        let period = Duration::from_secs(args.feed_refresh_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let _seq = state.sequencer.lock().await;
                let now = state.devnet.host().clock().now();
                let refreshed = state.devnet.refresh_feeds(now);
                tracing::debug!(refreshed, "devnet feeds refreshed");
            }
        })
    });

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    if let Some(handle) = refresher {
        handle.abort();
    }
    tracing::info!(
        events = devnet.vault().event_count(),
        "custodia-node stopped"
    );
    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.rpc_url.trim_end_matches('/'));
    let body = http_get(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Splits `http://host[:port][/path]` into its parts.
fn split_url(url: &str) -> Result<(String, u16, String)> {
    let rest = url.strip_prefix("http://").unwrap_or(url);
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse::<u16>()
                .with_context(|| format!("bad port in {url}"))?,
        ),
        None => (authority, 80),
    };
    if host.is_empty() {
        anyhow::bail!("missing host in {url}");
    }
    Ok((host.to_string(), port, path.to_string()))
}

/// Plain HTTP/1.1 GET over a tokio TCP stream. Returns the response body.
async fn http_get(url: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (host, port, path) = split_url(url)?;
    let addr = format!("{}:{}", host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    Ok(response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string()))
}

/// Prints version information to stdout.
fn print_version() {
    println!("custodia-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// A handler that fails to install is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_url_parts() {
        assert_eq!(
            split_url("http://127.0.0.1:9841/status").unwrap(),
            ("127.0.0.1".to_string(), 9841, "/status".to_string())
        );
        assert_eq!(
            split_url("localhost").unwrap(),
            ("localhost".to_string(), 80, "/".to_string())
        );
        assert!(split_url("http://:80/").is_err());
        assert!(split_url("http://host:port/").is_err());
    }
}
