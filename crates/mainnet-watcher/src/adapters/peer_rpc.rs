//! Speedup peer client (`sbch_getEpochs` / `sbch_getCCEpochs`).

use async_trait::async_trait;
use shared_types::{CcEpoch, Epoch};

use super::rpc_transport::JsonRpcTransport;
use crate::config::{RpcEndpointConfig, WatcherConfig};
use crate::domain::WatcherError;
use crate::ports::EpochPeerClient;

/// Client for a peer running the watcher.
pub struct PeerRpcClient {
    transport: JsonRpcTransport,
}

impl PeerRpcClient {
    /// Build a client from the watcher config.
    pub fn new(config: &WatcherConfig) -> Result<Self, WatcherError> {
        Self::with_endpoint(config.peer_rpc.clone())
    }

    /// Build a client for `endpoint`.
    pub fn with_endpoint(endpoint: RpcEndpointConfig) -> Result<Self, WatcherError> {
        let transport = JsonRpcTransport::new(endpoint)
            .map_err(|e| WatcherError::PeerUnavailable(e.to_string()))?;
        Ok(Self { transport })
    }

    async fn fetch_range<T>(&self, method: &str, from: i64, to: i64) -> Result<Vec<T>, WatcherError>
    where
        T: serde::de::DeserializeOwned,
    {
        let items: Option<Vec<T>> = self
            .transport
            .call(method, range_params(from, to))
            .await
            .map_err(|e| WatcherError::PeerUnavailable(format!("{}: {}", method, e)))?;
        Ok(items.unwrap_or_default())
    }
}

/// Quantity-encoded `[from, to)` parameters.
fn range_params(from: i64, to: i64) -> [String; 2] {
    [format!("{:#x}", from), format!("{:#x}", to)]
}

#[async_trait]
impl EpochPeerClient for PeerRpcClient {
    async fn get_epochs(&self, from_number: i64, to_number: i64) -> Result<Vec<Epoch>, WatcherError> {
        self.fetch_range("sbch_getEpochs", from_number, to_number).await
    }

    async fn get_cc_epochs(
        &self,
        from_number: i64,
        to_number: i64,
    ) -> Result<Vec<CcEpoch>, WatcherError> {
        self.fetch_range("sbch_getCCEpochs", from_number, to_number).await
    }

    fn endpoint(&self) -> &str {
        self.transport.url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rpc_transport::decode_response;

    #[test]
    fn test_range_params_are_hex() {
        assert_eq!(range_params(1, 101), ["0x1".to_string(), "0x65".to_string()]);
    }

    #[test]
    fn test_decode_epoch_page() {
        let pubkey = hex::encode([3u8; 32]);
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":[{{"number":4,"startHeight":6049,"endTime":1700000000,"nominations":[{{"pubkey":"{}","nominatedCount":12}}]}}]}}"#,
            pubkey
        );
        let page: Option<Vec<Epoch>> = decode_response(body.as_bytes()).unwrap();
        let page = page.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].number, 4);
        assert_eq!(page[0].start_height, 6049);
        assert_eq!(page[0].nominated_count(&[3u8; 32]), Some(12));
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let client = PeerRpcClient::with_endpoint(RpcEndpointConfig::peer("http://127.0.0.1:1")).unwrap();
        let err = client.get_epochs(1, 10).await.unwrap_err();
        assert!(matches!(err, WatcherError::PeerUnavailable(_)));
        assert!(!err.is_fatal());
    }
}
