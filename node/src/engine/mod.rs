//! # Execution engine
//!
//! The block manager doesn't apply transactions itself. Every block goes through two calls:
//!
//! 1. `invoke` executes the candidate block and returns the state root, one result per
//!    transaction, an optional new validator roster and transactions the engine added itself.
//! 2. `write_precommit_state` finalizes the engine state once the block is committed. The block
//!    hash changes between the two calls, so both hashes are passed along.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::block::types::block::{PrepId, Vote};
use crate::block::types::transaction::Transaction;
use crate::utilities::hash::HashType;

pub(crate) mod http;
#[cfg(test)]
pub(crate) mod mock;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response: {status} {body}")]
    UnexpectedResponse {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Engine returned an error: {0}")]
    Rpc(Value),
    #[error("Malformed engine response: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Connectivity check done once at startup.
    async fn hello(&self) -> Result<()>;

    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse>;

    async fn write_precommit_state(&self, request: PrecommitRequest) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeBlock {
    pub height: u64,
    pub hash: HashType,
    pub prev_hash: Option<HashType>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub block: InvokeBlock,
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_block_generator: Option<PrepId>,
    pub prev_block_validators: Vec<PrepId>,
    pub prev_votes: Vec<Option<Vote>>,
    pub is_block_editable: bool,
}

/// Roster entry as sent by the engine, either a bare id or an object with an `id` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrepEntry {
    Id(PrepId),
    Detailed { id: PrepId },
}

impl PrepEntry {
    pub fn id(&self) -> &PrepId {
        match self {
            PrepEntry::Id(id) => id,
            PrepEntry::Detailed { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepUpdate {
    pub preps: Vec<PrepEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeResult {
    pub state_root_hash: String,
    /// Results keyed by transaction hash, in block order
    pub tx_results: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep: Option<PrepUpdate>,
    /// Transactions injected by the engine, keyed by hash. Each one goes to the
    /// position of its result in `tx_results`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_transactions: Option<Map<String, Value>>,
}

impl InvokeResult {
    pub fn roster_update(&self) -> Option<Vec<PrepId>> {
        self.prep
            .as_ref()
            .map(|update| update.preps.iter().map(|p| p.id().clone()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeError {
    pub error: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvokeResponse {
    Error(InvokeError),
    Success(InvokeResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecommitRequest {
    pub block_height: u64,
    pub old_block_hash: HashType,
    pub new_block_hash: HashType,
}
