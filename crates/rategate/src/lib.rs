//! `rategate` — per-client admission control for an HTTP endpoint.
//!
//! Every client, keyed by source host, gets its own token bucket
//! ([`limiter::TokenBucket`]) held in a concurrent [`limiter::ClientRegistry`].
//! The [`middleware::admission`] middleware charges one token per request and
//! answers `429` once the bucket is empty; an [`limiter::IdleReaper`] drops
//! clients that have gone quiet.
//!
//! The [`server::GatewayServer`] wires everything together into an axum HTTP
//! service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use rategate::config::GatewayConfig;
//! use rategate::server::GatewayServer;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = GatewayServer::new(GatewayConfig {
//!         port: 8080,
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     server.start(CancellationToken::new()).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod message;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::{AdmissionMode, GatewayConfig, LimiterConfig};
pub use server::GatewayServer;
