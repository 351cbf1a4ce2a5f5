//! Runtime configuration

use crate::error::ConfigError;
use std::time::Duration;

/// Upper bound for the idle timeout and sweep interval.
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Slowest accepted refill rate: one token per [`MAX_PERIOD`].
pub const MIN_REFILL_PER_SECOND: f64 = 1.0 / (365.0 * 24.0 * 60.0 * 60.0);

/// Token-bucket and eviction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterConfig {
    /// Burst capacity per client (default: 20).
    pub capacity: u32,
    /// Sustained rate, tokens per second (default: 5).
    pub refill_per_second: f64,
    /// A client idle for longer than this is evicted (default: 60s).
    pub idle_timeout: Duration,
    /// How often the idle reaper runs (default: 60s).
    pub sweep_interval: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            refill_per_second: 5.0,
            idle_timeout: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl LimiterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if !self.refill_per_second.is_finite() || self.refill_per_second < MIN_REFILL_PER_SECOND {
            return Err(ConfigError::Invalid(format!(
                "refill rate must be at least {MIN_REFILL_PER_SECOND:e} tokens/s, got {}",
                self.refill_per_second
            )));
        }
        check_period("idle timeout", self.idle_timeout)?;
        check_period("sweep interval", self.sweep_interval)?;
        Ok(())
    }
}

fn check_period(name: &str, period: Duration) -> Result<(), ConfigError> {
    if period.is_zero() {
        return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
    }
    if period > MAX_PERIOD {
        return Err(ConfigError::Invalid(format!(
            "{name} must not exceed {}s, got {}s",
            MAX_PERIOD.as_secs(),
            period.as_secs()
        )));
    }
    Ok(())
}

/// What the admission middleware does with an admitted request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdmissionMode {
    /// Answer `200 Request OK` directly; the wrapped endpoint is not called.
    #[default]
    Respond,
    /// Pass the request on to the wrapped endpoint.
    Forward,
}

/// Runtime configuration for [`GatewayServer`](crate::server::GatewayServer).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Interface to bind (default: `0.0.0.0`).
    pub host: String,
    /// TCP port to listen on (default: 8080).
    pub port: u16,
    pub limiter: LimiterConfig,
    pub mode: AdmissionMode,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            limiter: LimiterConfig::default(),
            mode: AdmissionMode::default(),
        }
    }
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limiter.validate()
    }
}
