//! JSON-RPC over HTTP, shared by the mainnet and peer clients.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RpcEndpointConfig;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Endpoint refused the connection.
    #[error("Connection failed: {0}")]
    Connection(String),
    /// Server answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },
    /// Response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

#[derive(Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// One JSON-RPC endpoint.
pub struct JsonRpcTransport {
    client: Client,
    endpoint: RpcEndpointConfig,
    request_id: AtomicU64,
}

impl JsonRpcTransport {
    /// Build a transport for `endpoint`.
    pub fn new(endpoint: RpcEndpointConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .connect_timeout(Duration::from_secs(endpoint.timeout_secs.min(5)))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            request_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.endpoint.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call `method` with `params`. A `null` result decodes as `None`.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<Option<R>, TransportError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id: self.next_id(),
            method,
            params,
        };
        let body = serde_json::to_vec(&request).map_err(|e| TransportError::Parse(e.to_string()))?;

        let mut builder = self
            .client
            .post(&self.endpoint.url)
            .header(CONTENT_TYPE, self.endpoint.content_type.as_str())
            .body(body);
        if !self.endpoint.username.is_empty() {
            builder = builder.basic_auth(&self.endpoint.username, Some(&self.endpoint.password));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connection(format!("Cannot connect to {}", self.endpoint.url))
            } else {
                TransportError::Http(e)
            }
        })?;

        let bytes = response.bytes().await?;
        decode_response(&bytes)
    }
}

/// Decode a JSON-RPC response body.
pub(crate) fn decode_response<R: DeserializeOwned>(body: &[u8]) -> Result<Option<R>, TransportError> {
    let response: JsonRpcResponse<R> =
        serde_json::from_slice(body).map_err(|e| TransportError::Parse(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(TransportError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.result)
}
