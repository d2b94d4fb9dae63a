//! EduPort Daemon - Assistant Chat and Schedule Proxy Server
//!
//! This is the main entry point for the EduPort daemon, the HTTP layer in
//! front of the assistant-chat core. Portal front ends call it for the AI
//! chat relay and for the school-system schedule proxy.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (127.0.0.1:8090)
//! eduport-daemon
//!
//! # Custom bind address
//! eduport-daemon --bind 0.0.0.0:8080
//!
//! # Verbose logging
//! RUST_LOG=debug eduport-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown

mod server;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use eduport_core::ChatBackend;

use server::AppState;

/// EduPort Daemon - Assistant chat and schedule proxy server
#[derive(Parser, Debug)]
#[command(name = "eduport-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to bind the HTTP server on
    #[arg(
        short = 'b',
        long,
        env = "EDUPORT_HTTP_ADDR",
        default_value = "127.0.0.1:8090"
    )]
    bind: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "EDUPORT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("eduport_daemon={level},eduport_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Resolve on SIGTERM or Ctrl-C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, initiating shutdown"),
        () = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("EduPort Daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    let state = AppState::from_env();

    if !state.backend().health_check().await {
        warn!(
            backend = state.backend().name(),
            "Model provider unreachable at startup; chat requests will fail-soft"
        );
    }

    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!(addr = %args.bind, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("EduPort daemon stopped cleanly");
    Ok(())
}
