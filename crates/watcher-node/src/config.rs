//! Node configuration: watcher settings plus the resume checkpoint.
//!
//! Everything comes from `WATCHER_*` environment variables layered on top of
//! the defaults. `WATCHER_CONFIG_FILE` may point at a JSON `WatcherConfig`
//! used as the base instead of the defaults.

use anyhow::{Context, Result};
use mainnet_watcher::{WatcherCheckpoint, WatcherConfig};
use std::str::FromStr;
use tracing::info;

/// Everything the node needs to start a watcher.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Watcher settings.
    pub watcher: WatcherConfig,
    /// Where the previous run left off.
    pub checkpoint: WatcherCheckpoint,
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<NodeConfig> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_config_from<F>(var: F) -> Result<NodeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut watcher = match var("WATCHER_CONFIG_FILE") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            let config: WatcherConfig = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path))?;
            info!("Loaded watcher config from {}", path);
            config
        }
        None => WatcherConfig::default(),
    };

    // Mainnet node
    if let Some(url) = var("WATCHER_MAINNET_RPC_URL") {
        watcher.mainnet_rpc.url = url;
    }
    if let Some(user) = var("WATCHER_MAINNET_RPC_USERNAME") {
        watcher.mainnet_rpc.username = user;
    }
    if let Some(password) = var("WATCHER_MAINNET_RPC_PASSWORD") {
        watcher.mainnet_rpc.password = password;
    }

    // Speedup peer
    if let Some(url) = var("WATCHER_PEER_RPC_URL") {
        watcher.peer_rpc.url = url;
    }

    override_parsed(&var, "WATCHER_SPEEDUP", &mut watcher.speedup)?;
    override_parsed(&var, "WATCHER_CC_BRIDGE_ENABLED", &mut watcher.cc_bridge_enabled)?;
    override_parsed(&var, "WATCHER_BLOCKS_IN_EPOCH", &mut watcher.num_blocks_in_epoch)?;
    override_parsed(&var, "WATCHER_BLOCKS_IN_CC_EPOCH", &mut watcher.num_blocks_in_cc_epoch)?;
    override_parsed(&var, "WATCHER_PARALLEL_NUM", &mut watcher.parallel_num)?;
    override_parsed(&var, "WATCHER_SKIP_SANITY_CHECK", &mut watcher.skip_sanity_check)?;
    override_parsed(&var, "WATCHER_WAITING_BLOCK_DELAY_SECS", &mut watcher.waiting_block_delay_secs)?;

    let mut checkpoint = WatcherCheckpoint::default();
    override_parsed(&var, "WATCHER_LAST_EPOCH_END_HEIGHT", &mut checkpoint.last_epoch_end_height)?;
    override_parsed(&var, "WATCHER_LAST_CC_EPOCH_END_HEIGHT", &mut checkpoint.last_cc_epoch_end_height)?;
    override_parsed(&var, "WATCHER_LAST_EPOCH_NUM", &mut checkpoint.last_known_epoch_num)?;
    override_parsed(&var, "WATCHER_LAST_CC_EPOCH_NUM", &mut checkpoint.last_known_cc_epoch_num)?;

    watcher.validate().context("Invalid watcher configuration")?;
    Ok(NodeConfig {
        watcher,
        checkpoint,
    })
}

fn override_parsed<F, T>(var: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = var(key) {
        *slot = raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value {:?}", key, raw))?;
    }
    Ok(())
}
