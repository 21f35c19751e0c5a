//! bitcoind-compatible mainnet client.
//!
//! Nominations are read from the coinbase transaction: every output whose
//! script is `OP_RETURN <"sBCH" || pubkey>` counts once.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Deserialize;
use shared_types::{Nomination, Pubkey};
use tracing::debug;

use super::rpc_transport::{JsonRpcTransport, TransportError};
use crate::config::{RpcEndpointConfig, WatcherConfig};
use crate::domain::{ConfirmedBlock, Height, WatcherError};
use crate::ports::SourceChainClient;

/// Payload tag of a nomination output ("sBCH").
pub const NOMINATION_TAG: [u8; 4] = [0x73, 0x42, 0x43, 0x48];

#[derive(Debug, Deserialize)]
struct RawBlock {
    height: Height,
    time: i64,
    #[serde(default)]
    tx: Vec<RawTx>,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    #[serde(default)]
    vin: Vec<RawVin>,
    #[serde(default)]
    vout: Vec<RawVout>,
}

#[derive(Debug, Deserialize)]
struct RawVin {
    coinbase: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVout {
    #[serde(rename = "scriptPubKey")]
    script_pub_key: RawScript,
}

#[derive(Debug, Deserialize)]
struct RawScript {
    #[serde(default)]
    asm: String,
}

/// Mainnet node client with a tip-height TTL cache and a block LRU.
pub struct MainnetRpcClient {
    transport: JsonRpcTransport,
    height_ttl: Duration,
    cached_tip: Mutex<Option<(Height, Instant)>>,
    blocks: Mutex<LruCache<Height, ConfirmedBlock>>,
}

impl MainnetRpcClient {
    /// Build a client from the watcher config.
    pub fn new(config: &WatcherConfig) -> Result<Self, WatcherError> {
        Self::with_endpoint(
            config.mainnet_rpc.clone(),
            Duration::from_millis(config.height_cache_ttl_ms),
            config.block_cache_size,
        )
    }

    /// Build a client for `endpoint`.
    pub fn with_endpoint(
        endpoint: RpcEndpointConfig,
        height_ttl: Duration,
        block_cache_size: usize,
    ) -> Result<Self, WatcherError> {
        let transport = JsonRpcTransport::new(endpoint).map_err(rpc_error)?;
        let capacity = NonZeroUsize::new(block_cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            transport,
            height_ttl,
            cached_tip: Mutex::new(None),
            blocks: Mutex::new(LruCache::new(capacity)),
        })
    }

    async fn fetch_block(&self, height: Height) -> Result<ConfirmedBlock, WatcherError> {
        let hash: String = self
            .transport
            .call("getblockhash", (height,))
            .await
            .map_err(rpc_error)?
            .ok_or(WatcherError::BlockUnavailable(height))?;

        let raw: RawBlock = self
            .transport
            .call("getblock", (hash.as_str(), 2))
            .await
            .map_err(rpc_error)?
            .ok_or(WatcherError::BlockUnavailable(height))?;

        if raw.height != height {
            return Err(WatcherError::InvalidResponse(format!(
                "asked for block {}, node returned {}",
                height, raw.height
            )));
        }
        Ok(parse_block(raw))
    }
}

#[async_trait]
impl SourceChainClient for MainnetRpcClient {
    async fn get_latest_height(&self, allow_cached: bool) -> Result<Height, WatcherError> {
        if allow_cached {
            if let Some((height, at)) = *self.cached_tip.lock() {
                if at.elapsed() < self.height_ttl {
                    return Ok(height);
                }
            }
        }

        let height: Height = self
            .transport
            .call("getblockcount", [(); 0])
            .await
            .map_err(rpc_error)?
            .ok_or_else(|| WatcherError::InvalidResponse("getblockcount returned null".to_string()))?;
        *self.cached_tip.lock() = Some((height, Instant::now()));
        Ok(height)
    }

    async fn get_block_by_height(
        &self,
        height: Height,
        allow_cached: bool,
    ) -> Result<ConfirmedBlock, WatcherError> {
        if allow_cached {
            if let Some(block) = self.blocks.lock().get(&height) {
                return Ok(block.clone());
            }
        }

        let block = self.fetch_block(height).await?;
        debug!(
            height,
            nominations = block.nominations.len(),
            "[watcher] Fetched mainnet block"
        );
        self.blocks.lock().put(height, block.clone());
        Ok(block)
    }

    fn endpoint(&self) -> &str {
        self.transport.url()
    }
}

fn rpc_error(e: TransportError) -> WatcherError {
    WatcherError::Rpc(e.to_string())
}

fn parse_block(raw: RawBlock) -> ConfirmedBlock {
    let nominations: Vec<Nomination> = raw
        .tx
        .iter()
        .find(|tx| tx.vin.first().is_some_and(|vin| vin.coinbase.is_some()))
        .map(|coinbase| {
            coinbase
                .vout
                .iter()
                .filter_map(|out| nomination_pubkey(&out.script_pub_key.asm))
                .map(|pubkey| Nomination::new(pubkey, 1))
                .collect()
        })
        .unwrap_or_default();

    ConfirmedBlock::new(raw.height, raw.time, nominations)
}

/// Pubkey carried by an `OP_RETURN` script, if it is a nomination.
pub fn nomination_pubkey(asm: &str) -> Option<Pubkey> {
    let mut parts = asm.split_whitespace();
    if parts.next()? != "OP_RETURN" {
        return None;
    }
    let payload = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some() {
        return None;
    }
    let key = payload.strip_prefix(&NOMINATION_TAG[..])?;
    key.try_into().ok()
}
