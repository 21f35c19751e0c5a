//! # Adapters Layer (Hexagonal Architecture)
//!
//! JSON-RPC implementations of the outbound ports.

mod mainnet_rpc;
mod peer_rpc;
mod rpc_transport;

pub use mainnet_rpc::{nomination_pubkey, MainnetRpcClient, NOMINATION_TAG};
pub use peer_rpc::PeerRpcClient;
pub use rpc_transport::{JsonRpcTransport, TransportError};
