//! # Mainnet Watcher Node
//!
//! Runs a single mainnet watcher and logs the epochs it produces.

use anyhow::{bail, Context, Result};
use tracing::{debug, error, info};
use watcher_node::{load_config, WatcherNode};
use watcher_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = load_config().context("Failed to load configuration")?;
    let node = WatcherNode::new(config);
    let mut running = node.start().await?;

    info!("Watcher is running. Press Ctrl+C to stop.");
    let finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            None
        }
        finished = &mut running.watcher => Some(finished),
    };
    let result = match finished {
        Some(result) => result,
        None => {
            node.shutdown();
            running.watcher.await
        }
    };

    let stats = running.consumer.await.context("Epoch consumer panicked")?;
    info!(
        epochs = stats.epochs,
        cc_epochs = stats.cc_epochs,
        "Epoch feeds closed"
    );
    if let Ok(metrics) = watcher_telemetry::render_metrics() {
        debug!("Final metrics:\n{}", metrics);
    }

    match result.context("Watcher task panicked")? {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Watcher stopped: {}", e);
            bail!("watcher stopped on fatal error: {}", e)
        }
    }
}
