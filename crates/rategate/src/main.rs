//! rategate — entry point.
//!
//! Reads configuration from flags or environment variables and starts the
//! axum-based HTTP service.

use clap::Parser;
use rategate::{AdmissionMode, GatewayConfig, GatewayServer, LimiterConfig};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Per-client rate limiting in front of an HTTP endpoint
#[derive(Parser, Debug)]
#[command(name = "rategate")]
#[command(version)]
#[command(about = "Per-client token-bucket admission control", long_about = None)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "RATEGATE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// TCP port to listen on
    #[arg(short, long, env = "RATEGATE_PORT", default_value_t = 8080)]
    port: u16,

    /// Burst capacity per client
    #[arg(long, env = "RATEGATE_CAPACITY", default_value_t = 20)]
    capacity: u32,

    /// Sustained requests per second per client
    #[arg(long, env = "RATEGATE_REFILL_PER_SECOND", default_value_t = 5.0)]
    refill_per_second: f64,

    /// Seconds of inactivity before a client's state is dropped
    #[arg(long, env = "RATEGATE_IDLE_TIMEOUT_SECS", default_value_t = 60)]
    idle_timeout_secs: u64,

    /// Seconds between idle sweeps
    #[arg(long, env = "RATEGATE_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    sweep_interval_secs: u64,

    /// Forward admitted requests to the endpoint instead of answering directly
    #[arg(long, env = "RATEGATE_FORWARD_ADMITTED")]
    forward_admitted: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable JSON log format
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            host: self.host.clone(),
            port: self.port,
            limiter: LimiterConfig {
                capacity: self.capacity,
                refill_per_second: self.refill_per_second,
                idle_timeout: Duration::from_secs(self.idle_timeout_secs),
                sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            },
            mode: if self.forward_admitted {
                AdmissionMode::Forward
            } else {
                AdmissionMode::Respond
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    if args.json_logs {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting rategate");

    let server = match GatewayServer::new(args.gateway_config()) {
        Ok(server) => server,
        Err(err) => {
            error!(error = %err, "refusing to start");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                on_signal.cancel();
            }
            Err(err) => error!(error = %err, "failed to listen for shutdown signal"),
        }
    });

    match server.start(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "rategate terminated");
            ExitCode::FAILURE
        }
    }
}
