// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Stake Vault Node
//!
//! Entry point for the `stakevault-node` binary. Parses CLI arguments,
//! initializes logging and metrics, builds the vault over an in-memory
//! delegate pool, and serves the HTTP/WS API.
//!
//! The binary supports four subcommands:
//!
//! - `run`    : start the node
//! - `init`   : write a default configuration file
//! - `status` : query a running node's status endpoint
//! - `version`: print build version information

mod api;
mod cli;
mod config;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use stakevault_contracts::{AvailabilityCalculator, AvailabilityPolicy, StakeVault};
use stakevault_protocol::config::{EVENT_CHANNEL_CAPACITY, PROTOCOL_VERSION};
use stakevault_protocol::delegate::InMemoryStakingPool;
use stakevault_protocol::oracle::DelegateOracle;

use cli::{Commands, StakeVaultCli};
use config::NodeConfig;
use logging::LogFormat;
use metrics::VaultMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = StakeVaultCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: vault, API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.log_format);

    let mut node_config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => {
            tracing::warn!("no config file given, using built-in defaults");
            NodeConfig::default()
        }
    };
    if let Some(policy) = args.policy {
        node_config.policy = policy.into();
    }

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        vault = %node_config.vault_address,
        policy = %node_config.policy,
        "starting stakevault-node"
    );

    // --- Delegate pool ---
    let pool = Arc::new(match node_config.deposit_cap {
        Some(cap) => InMemoryStakingPool::with_deposit_cap(cap),
        None => InMemoryStakingPool::new(),
    });

    // --- Vault ---
    let calculator = match node_config.policy {
        AvailabilityPolicy::Principal => AvailabilityCalculator::principal(),
        AvailabilityPolicy::YieldScaled => AvailabilityCalculator::yield_scaled(Arc::new(
            DelegateOracle::new(pool.clone(), node_config.vault_address),
        )),
    };
    let mut vault = StakeVault::new(node_config.vault_address, pool.clone(), calculator);
    vault
        .initialize(node_config.setup)
        .context("failed to initialize vault")?;

    // --- Metrics ---
    let vault_metrics =
        Arc::new(VaultMetrics::new().context("failed to register prometheus metrics")?);
    vault_metrics.observe(&vault.summary());

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            PROTOCOL_VERSION,
        ),
        vault: vault.into_shared(),
        pool,
        event_tx,
        metrics: Arc::clone(&vault_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&vault_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

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

    tracing::info!("stakevault-node stopped");
    Ok(())
}

/// Writes a default configuration file.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("stakevault_node=info", LogFormat::Pretty);

    let path = &args.output;
    if path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    let node_config = NodeConfig::default();
    node_config.save(path)?;
    tracing::info!(path = %path.display(), "configuration written");

    println!("Node configuration written.");
    println!("  File    : {}", path.display());
    println!("  Vault   : {}", node_config.vault_address);
    println!("  Admin   : {}", node_config.setup.admin);
    println!("  Policy  : {}", node_config.policy);

    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let (authority, base_path) = split_http_url(&args.rpc_url)?;
    let path = format!("{}/status", base_path.trim_end_matches('/'));
    let body = http_get(authority, &path).await?;
    println!("{}", body);
    Ok(())
}

/// Splits `http://host:port/prefix` into `("host:port", "/prefix")`.
fn split_http_url(url: &str) -> Result<(&str, &str)> {
    if url.starts_with("https://") {
        bail!("https endpoints are not supported: {}", url);
    }
    let rest = url.strip_prefix("http://").unwrap_or(url);
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    if authority.is_empty() {
        bail!("missing host in URL: {}", url);
    }
    Ok((authority, path))
}

/// One-shot HTTP/1.1 GET over a raw TCP stream; returns the body.
async fn http_get(authority: &str, path: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let addr = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{}:80", authority)
    };
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, authority,
    );
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());

    Ok(body)
}

/// Prints version information to stdout.
fn print_version() {
    println!("stakevault-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol        {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
    fn split_http_url_variants() {
        assert_eq!(
            split_http_url("http://127.0.0.1:9751").unwrap(),
            ("127.0.0.1:9751", "")
        );
        assert_eq!(
            split_http_url("http://node.local:8080/api/").unwrap(),
            ("node.local:8080", "/api/")
        );
        assert_eq!(split_http_url("localhost:1").unwrap(), ("localhost:1", ""));
        assert!(split_http_url("https://example.org").is_err());
        assert!(split_http_url("http:///status").is_err());
    }
}
