use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate::config::{LogFormat, LoggingConfig, TollgateConfig};
use tollgate::grpc::GrpcServer;
use tollgate::ratelimit::{spawn_sweeper, RateLimiter};

/// Admission control service for the tour-operator web API.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the gRPC listen address
    #[arg(long)]
    grpc_addr: Option<SocketAddr>,

    /// Override the log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = TollgateConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.grpc_addr {
        config.server.grpc_addr = addr;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    init_tracing(&config.logging)?;

    info!("Starting Tollgate admission service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        grpc_addr = %config.server.grpc_addr,
        strict_points = config.rate_limiting.policies.strict.points,
        general_points = config.rate_limiting.policies.general.points,
        routes = config.rate_limiting.routes.len(),
        "Configuration loaded"
    );

    let rate_limiter = Arc::new(RateLimiter::with_policies(config.rate_limiting.policies));
    let sweeper = config
        .rate_limiting
        .sweep_interval()
        .map(|every| spawn_sweeper(Arc::clone(&rate_limiter), every));

    let routes = config.rate_limiting.route_table()?;
    let grpc_server = GrpcServer::new(config.server.grpc_addr, rate_limiter, routes);

    // Run the server with graceful shutdown on Ctrl+C
    let result = grpc_server.serve_with_shutdown(shutdown_signal()).await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    result?;

    info!("Tollgate admission service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
