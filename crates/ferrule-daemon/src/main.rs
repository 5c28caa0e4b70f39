// crates/ferrule-daemon/src/main.rs
//
// Binary entrypoint for the Ferrule example daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, records the
// controllers' declarations, compiles the routing table, and serves it over
// the JSON-RPC transport.

mod app;
mod config;
mod context;
mod controllers;
mod service;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::DaemonConfig;
use context::AppContext;
use service::UsersService;

use ferrule_rpc::{ContextFactory, RateLimiter, RpcConfig, RpcServer};

/// Ferrule example daemon: serves the users and math controllers.
#[derive(Parser, Debug)]
#[command(name = "ferrule-daemon", version = "0.1.0", about = "Ferrule example RPC daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "ferrule.toml")]
    config: String,

    /// Host to bind, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding the config file.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration from TOML file, falling back to defaults if the file
    // is not found. Logged once tracing is up.
    let loaded = DaemonConfig::load(&args.config);
    let mut daemon_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => DaemonConfig::default(),
    };

    // Initialize tracing subscriber for structured logging. RUST_LOG wins
    // over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match &loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", args.config),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            args.config,
            e
        ),
    }

    // CLI flags override the config file values.
    if let Some(host) = args.host {
        daemon_config.rpc_host = host;
    }
    if let Some(port) = args.port {
        daemon_config.rpc_port = port;
    }

    tracing::info!("Ferrule daemon v0.1.0");
    tracing::info!(
        "users.getById limit: {} per {}s",
        daemon_config.lookup_rate_limit.max_points,
        daemon_config.lookup_rate_limit.window_seconds
    );

    let store = app::declarations(&daemon_config);
    let limiter = RateLimiter::new();
    let table = Arc::new(app::build_table(
        &store,
        Arc::new(UsersService::new()),
        limiter.clone(),
    )?);

    for endpoint in table.describe() {
        tracing::info!("  [{}] {}", endpoint.kind, endpoint.path);
    }

    // Sweep expired rate-limit windows in the background.
    let purge_every = Duration::from_secs(daemon_config.purge_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(purge_every);
        loop {
            ticker.tick().await;
            let purged = limiter.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired rate-limit windows", purged);
            }
        }
    });

    let rpc_config = RpcConfig {
        host: daemon_config.rpc_host.clone(),
        port: daemon_config.rpc_port,
    };
    let context: ContextFactory<AppContext> = Arc::new(AppContext::from_headers);
    let rpc_server = RpcServer::new(rpc_config, table, context);

    tokio::select! {
        result = rpc_server.start() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
