//! Structured logging through `tracing-subscriber`.
//!
//! Every line carries the level, the message and the structured fields
//! given at the call site. JSON output is meant for log shippers; the
//! plain format is for terminals.

use tracing_subscriber::EnvFilter;

use crate::{TelemetryConfig, TelemetryError};

/// Install the global subscriber.
///
/// # Errors
/// - `Config` if the log filter does not parse
/// - `LoggingInit` if a global subscriber is already installed
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log filter {:?}: {}", config.log_level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = if config.json_logs {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(component = $component, $($($field)*,)? $msg)
    };
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(component = $component, $($($field)*,)? $msg)
    };
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(component = $component, $($($field)*,)? $msg)
    };
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(component = $component, $($($field)*,)? $msg)
    };
}

/// Log an epoch with its standard fields.
#[macro_export]
macro_rules! log_epoch_event {
    ($level:ident, $component:expr, $msg:expr, $epoch:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            epoch_number = $epoch.number,
            start_height = $epoch.start_height,
            end_time = $epoch.end_time,
            $($($field)*,)?
            $msg
        )
    };
}
