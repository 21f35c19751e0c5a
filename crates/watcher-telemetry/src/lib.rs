//! # Watcher Telemetry
//!
//! Logging and metrics bootstrap for the mainnet watcher.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use watcher_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("Failed to init telemetry");
//!     // Logs are now emitted through the global subscriber
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WATCHER_SERVICE_NAME` | `mainnet-watcher` | Service name in logs |
//! | `WATCHER_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `WATCHER_JSON_LOGS` | `false` | JSON log lines |
//! | `WATCHER_LOG_TARGET` | `false` | Include module targets |

#![warn(missing_docs)]

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::render_metrics;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Global subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metrics could not be gathered or encoded
    #[error("Failed to export Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging for the process.
///
/// Returns a guard to hold for the lifetime of the application; dropping it
/// logs the shutdown.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_logging(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that marks the telemetry lifetime.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}
