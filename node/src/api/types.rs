//! # Api Types
//!
//! Response types of the HTTP API which have no counterpart in the block types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::block::types::transaction::TxHash;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Health {
    pub status: String,
}

/// Hash under which a submitted transaction was queued.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct ApiTransactionSubmitted {
    #[serde(rename = "txHash")]
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiChainStatus {
    /// Height of the last committed block
    pub height: u64,
    pub last_block_hash: String,
    /// Transactions waiting for the next block
    pub pending_transactions: usize,
}
