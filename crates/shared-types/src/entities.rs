//! # Core Domain Entities
//!
//! Epoch data as seen by the staking component.
//!
//! ## Clusters
//!
//! - **Staking**: `Nomination`, `Epoch`
//! - **Bridge**: `CcTransferInfo`, `CcEpoch`

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use crate::errors::TypeError;

// =============================================================================
// CLUSTER A: STAKING
// =============================================================================

/// A 32-byte validator public key.
pub type Pubkey = [u8; 32];

/// A 32-byte transaction hash on the source chain.
pub type TxHash = [u8; 32];

/// A 20-byte receiver address on the side chain.
pub type Address = [u8; 20];

/// Parse a validator public key from a hex string (with or without `0x`).
pub fn pubkey_from_hex(s: &str) -> Result<Pubkey, TypeError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    Pubkey::try_from(bytes.as_slice()).map_err(|_| TypeError::InvalidLength {
        expected: 32,
        got: bytes.len(),
    })
}

/// A validator public key with the number of blocks that nominated it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nomination {
    /// Nominated validator.
    #[serde_as(as = "Hex")]
    pub pubkey: Pubkey,
    /// Number of nominations observed.
    pub nominated_count: i64,
}

impl Nomination {
    /// Create a nomination.
    pub fn new(pubkey: Pubkey, nominated_count: i64) -> Self {
        Self {
            pubkey,
            nominated_count,
        }
    }
}

/// Aggregated nominations over a fixed-size run of confirmed mainnet blocks.
///
/// `nominations` is sorted by count descending, ties broken by the smaller
/// public key first. The order is consensus-visible.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    /// Sequential epoch number.
    pub number: i64,
    /// First mainnet height covered by this epoch.
    pub start_height: i64,
    /// Largest block timestamp in the epoch (timestamps are not monotonic).
    pub end_time: i64,
    /// Aggregated nominations in canonical order.
    pub nominations: Vec<Nomination>,
}

impl Epoch {
    /// Last mainnet height covered, given the epoch size.
    pub fn end_height(&self, num_blocks_in_epoch: i64) -> i64 {
        self.start_height + num_blocks_in_epoch - 1
    }

    /// An epoch with a zero end time was never closed.
    pub fn is_closed(&self) -> bool {
        self.end_time != 0
    }

    /// Nomination count for a validator, if present.
    pub fn nominated_count(&self, pubkey: &Pubkey) -> Option<i64> {
        self.nominations
            .iter()
            .find(|n| &n.pubkey == pubkey)
            .map(|n| n.nominated_count)
    }
}

// =============================================================================
// CLUSTER B: BRIDGE
// =============================================================================

/// A transfer into the bridge observed on the source chain.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CcTransferInfo {
    /// Funding transaction.
    #[serde_as(as = "Hex")]
    pub txid: TxHash,
    /// Output index within the funding transaction.
    pub vout: u32,
    /// Amount in satoshis.
    pub amount: u64,
    /// Receiver on the side chain.
    #[serde_as(as = "Hex")]
    pub receiver: Address,
}

/// Cross-chain epoch: the bridge-window counterpart of [`Epoch`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CcEpoch {
    /// Sequential CC-epoch number.
    pub number: i64,
    /// First mainnet height covered.
    pub start_height: i64,
    /// Largest block timestamp in the window.
    pub end_time: i64,
    /// Transfers in block order.
    pub transfer_infos: Vec<CcTransferInfo>,
}
