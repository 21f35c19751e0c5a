//! # Watcher Configuration
//!
//! Configuration for the mainnet watcher and its two JSON-RPC endpoints.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{
    Height, WatcherError, DEFAULT_BLOCKS_IN_CC_EPOCH, DEFAULT_BLOCKS_IN_EPOCH,
    DEFAULT_PARALLEL_NUM,
};

/// Connection parameters for one JSON-RPC endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcEndpointConfig {
    /// Endpoint URL.
    pub url: String,
    /// Basic-auth user (empty disables auth).
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// `Content-Type` header sent with every request.
    pub content_type: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl RpcEndpointConfig {
    /// Endpoint of a bitcoind-compatible mainnet node.
    pub fn mainnet(url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            content_type: "text/plain;".to_string(),
            timeout_secs: 30,
        }
    }

    /// Endpoint of a peer running the watcher.
    pub fn peer(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: String::new(),
            password: String::new(),
            content_type: "application/json".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Mainnet watcher configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Blocks per epoch.
    pub num_blocks_in_epoch: Height,

    /// Blocks per CC-epoch.
    pub num_blocks_in_cc_epoch: Height,

    /// Global bridge switch. CC-epoch paths are dormant while false.
    pub cc_bridge_enabled: bool,

    /// Pull precomputed epochs from a peer before deriving locally.
    pub speedup: bool,

    /// Width of a parallel fetch batch.
    pub parallel_num: usize,

    /// Window size above which a warning is logged after reclaim.
    pub num_blocks_to_clear_memory: usize,

    /// Fixed delay while waiting for confirmations, in seconds.
    pub waiting_block_delay_secs: u64,

    /// Epochs requested per speedup page.
    pub speedup_page_size: u64,

    /// Retries per slot inside a parallel batch.
    pub batch_slot_retries: u32,

    /// How long a cached tip height stays valid, in milliseconds.
    pub height_cache_ttl_ms: u64,

    /// Blocks kept in the client-side LRU.
    pub block_cache_size: usize,

    /// Skip the startup liveness probe.
    pub skip_sanity_check: bool,

    /// Mainnet node endpoint.
    pub mainnet_rpc: RpcEndpointConfig,

    /// Speedup peer endpoint.
    pub peer_rpc: RpcEndpointConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            num_blocks_in_epoch: DEFAULT_BLOCKS_IN_EPOCH,
            num_blocks_in_cc_epoch: DEFAULT_BLOCKS_IN_CC_EPOCH,
            cc_bridge_enabled: false,
            speedup: false,
            parallel_num: DEFAULT_PARALLEL_NUM,
            num_blocks_to_clear_memory: 1000,
            waiting_block_delay_secs: 2,
            speedup_page_size: 100,
            batch_slot_retries: 3,
            height_cache_ttl_ms: 1000,
            block_cache_size: 256,
            skip_sanity_check: false,
            mainnet_rpc: RpcEndpointConfig::mainnet("http://127.0.0.1:8332", "", ""),
            peer_rpc: RpcEndpointConfig::peer("http://127.0.0.1:8545"),
        }
    }
}

impl WatcherConfig {
    /// Create a config for testing (small epochs, no delays).
    pub fn for_testing() -> Self {
        Self {
            num_blocks_in_epoch: 3,
            num_blocks_in_cc_epoch: 1,
            parallel_num: 4,
            num_blocks_to_clear_memory: 100,
            waiting_block_delay_secs: 1,
            speedup_page_size: 10,
            batch_slot_retries: 1,
            height_cache_ttl_ms: 0,
            block_cache_size: 16,
            skip_sanity_check: true,
            ..Self::default()
        }
    }

    /// Suspension delay while waiting for confirmations.
    pub fn waiting_block_delay(&self) -> Duration {
        Duration::from_secs(self.waiting_block_delay_secs)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), WatcherError> {
        if self.num_blocks_in_epoch <= 0 {
            return Err(WatcherError::InvalidConfig(format!(
                "num_blocks_in_epoch must be positive, got {}",
                self.num_blocks_in_epoch
            )));
        }
        if self.num_blocks_in_cc_epoch <= 0 {
            return Err(WatcherError::InvalidConfig(format!(
                "num_blocks_in_cc_epoch must be positive, got {}",
                self.num_blocks_in_cc_epoch
            )));
        }
        if self.parallel_num == 0 {
            return Err(WatcherError::InvalidConfig(
                "parallel_num must be at least 1".to_string(),
            ));
        }
        if self.speedup_page_size == 0 {
            return Err(WatcherError::InvalidConfig(
                "speedup_page_size must be at least 1".to_string(),
            ));
        }
        if self.cc_bridge_enabled && self.num_blocks_in_epoch % self.num_blocks_in_cc_epoch != 0 {
            return Err(WatcherError::InvalidConfig(format!(
                "num_blocks_in_cc_epoch ({}) must divide num_blocks_in_epoch ({})",
                self.num_blocks_in_cc_epoch, self.num_blocks_in_epoch
            )));
        }
        Ok(())
    }
}
