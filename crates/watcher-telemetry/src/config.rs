//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log filter directive (trace, debug, info, warn, error, or a full
    /// `EnvFilter` expression)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether to include the module target in log lines
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "mainnet-watcher".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            with_target: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WATCHER_SERVICE_NAME`: Service name (default: mainnet-watcher)
    /// - `WATCHER_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `WATCHER_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `WATCHER_LOG_TARGET`: Include module targets (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("WATCHER_SERVICE_NAME")
                .unwrap_or_else(|_| "mainnet-watcher".to_string()),

            log_level: env::var("WATCHER_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("WATCHER_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            with_target: env::var("WATCHER_LOG_TARGET")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
