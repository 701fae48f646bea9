//! # Block manager API
//!
//! Transaction intake and chain queries. Everything goes through the node event loop,
//! which owns the block manager and the storage.
use std::fmt::Display;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::oneshot;

use crate::api::types::ApiChainStatus;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TransactionResult, TxHash};
use crate::utilities::hash::HashType;

pub(crate) mod http;
pub mod types;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("{0}")]
    ApiError(String),
}

#[derive(Debug)]
pub(crate) enum ApiCmd {
    SubmitTransaction(Transaction),
    QueryBlockByHeight(u64, oneshot::Sender<Result<Option<Block>, ApiError>>),
    QueryBlockByHash(HashType, oneshot::Sender<Result<Option<Block>, ApiError>>),
    QueryLastBlock(oneshot::Sender<Result<Block, ApiError>>),
    QueryTransaction(TxHash, oneshot::Sender<Result<Option<Transaction>, ApiError>>),
    QueryTransactionResult(
        TxHash,
        oneshot::Sender<Result<Option<TransactionResult>, ApiError>>,
    ),
    QueryChainStatus(oneshot::Sender<Result<ApiChainStatus, ApiError>>),
}

impl Display for ApiCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiCmd::SubmitTransaction(tx) => write!(f, "SubmitTransaction({tx})"),
            ApiCmd::QueryBlockByHeight(height, _) => write!(f, "QueryBlockByHeight({height})"),
            ApiCmd::QueryBlockByHash(hash, _) => write!(f, "QueryBlockByHash({hash})"),
            ApiCmd::QueryLastBlock(_) => write!(f, "QueryLastBlock"),
            ApiCmd::QueryTransaction(hash, _) => write!(f, "QueryTransaction({hash})"),
            ApiCmd::QueryTransactionResult(hash, _) => {
                write!(f, "QueryTransactionResult({hash})")
            }
            ApiCmd::QueryChainStatus(_) => write!(f, "QueryChainStatus"),
        }
    }
}

pub(crate) struct ApiListener {
    pub(crate) commands_rcv: Receiver<ApiCmd>,
}

impl ApiListener {
    pub(crate) fn new(commands_rcv: Receiver<ApiCmd>) -> Self {
        Self { commands_rcv }
    }
}

#[derive(Clone)]
pub struct BlockManagerApi {
    pub(crate) commands_channel: Sender<ApiCmd>,
}

impl BlockManagerApi {
    pub(crate) fn new() -> (BlockManagerApi, ApiListener) {
        let (commands_channel, commands_rcv) = channel(1000);
        let api_listener = ApiListener::new(commands_rcv);
        let api = BlockManagerApi { commands_channel };
        (api, api_listener)
    }

    /// Queues a transaction for the next block and returns its hash.
    ///
    /// A `txHash` field in the request is used as is, otherwise the hash is derived from the content.
    pub async fn submit_transaction(&self, params: Map<String, Value>) -> Result<TxHash, ApiError> {
        let tx = match params.get("txHash").cloned() {
            Some(Value::String(hash)) if !hash.is_empty() => Transaction::new(hash, params),
            Some(_) => {
                return Err(ApiError::InvalidTransaction(
                    "txHash must be a non-empty string".to_string(),
                ))
            }
            None => Transaction::from_params(params)
                .map_err(|err| ApiError::InvalidTransaction(err.to_string()))?,
        };
        log::trace!("submit_transaction({})", tx);

        let tx_hash = tx.tx_hash.clone();
        self.commands_channel
            .send(ApiCmd::SubmitTransaction(tx))
            .await
            .map_err(|_| {
                ApiError::ApiError(
                    "Api channel closed. It means that probably the node is stopped".to_string(),
                )
            })?;
        Ok(tx_hash)
    }

    /// Returns block with given height if it exists
    pub async fn get_block_by_height(&self, height: u64) -> Result<Option<Block>, ApiError> {
        log::trace!("get_block_by_height({})", height);
        self.send_and_wait_response(|tx| ApiCmd::QueryBlockByHeight(height, tx))
            .await
    }

    /// Returns block with given hash if it exists
    pub async fn get_block_by_hash(&self, hash: HashType) -> Result<Option<Block>, ApiError> {
        log::trace!("get_block_by_hash({})", hash);
        self.send_and_wait_response(|tx| ApiCmd::QueryBlockByHash(hash, tx))
            .await
    }

    pub async fn get_last_block(&self) -> Result<Block, ApiError> {
        log::trace!("get_last_block()");
        self.send_and_wait_response(ApiCmd::QueryLastBlock).await
    }

    pub async fn get_transaction(&self, tx_hash: TxHash) -> Result<Option<Transaction>, ApiError> {
        log::trace!("get_transaction({})", tx_hash);
        self.send_and_wait_response(|tx| ApiCmd::QueryTransaction(tx_hash, tx))
            .await
    }

    pub async fn get_transaction_result(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransactionResult>, ApiError> {
        log::trace!("get_transaction_result({})", tx_hash);
        self.send_and_wait_response(|tx| ApiCmd::QueryTransactionResult(tx_hash, tx))
            .await
    }

    /// Height and hash of the last committed block, served from memory
    pub async fn get_chain_status(&self) -> Result<ApiChainStatus, ApiError> {
        log::trace!("get_chain_status()");
        self.send_and_wait_response(ApiCmd::QueryChainStatus).await
    }

    async fn send_and_wait_response<F, R>(&self, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(oneshot::Sender<Result<R, ApiError>>) -> ApiCmd,
        R: Send + 'static,
    {
        let (tx, rcv) = oneshot::channel();
        let cmd = f(tx);
        if let Err(err) = self.commands_channel.send(cmd).await {
            log::error!("Failed to send command to block manager: {:?}", err);
            return Err(ApiError::ApiError(
                "Api channel closed. It means that probably the node is stopped".to_string(),
            ));
        }
        rcv.await.map_err(|e| {
            log::error!("Failed to receive response from block manager: {:?}", e);
            ApiError::ApiError("Failed to receive response from block manager".to_string())
        })?
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    #[tokio::test]
    async fn submitted_hash_is_kept() {
        let (api, mut listener) = BlockManagerApi::new();

        let hash = api
            .submit_transaction(params(json!({"txHash": "0xabc", "from": "hxa"})))
            .await
            .unwrap();

        assert_eq!(hash, "0xabc");
        let cmd = listener.commands_rcv.recv().await.unwrap();
        let tx = assert_matches!(cmd, ApiCmd::SubmitTransaction(tx) => tx);
        assert_eq!(tx.tx_hash, "0xabc");
        assert!(tx.params.get("txHash").is_none());
    }

    #[tokio::test]
    async fn missing_hash_is_derived() {
        let (api, _listener) = BlockManagerApi::new();

        let first = api
            .submit_transaction(params(json!({"nonce": 1})))
            .await
            .unwrap();
        let second = api
            .submit_transaction(params(json!({"nonce": 1})))
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn non_string_hash_is_rejected() {
        let (api, _listener) = BlockManagerApi::new();

        assert_matches!(
            api.submit_transaction(params(json!({"txHash": 5}))).await,
            Err(ApiError::InvalidTransaction(_))
        );
    }

    #[tokio::test]
    async fn closed_node_fails_queries() {
        let (api, listener) = BlockManagerApi::new();
        drop(listener);

        assert_matches!(api.get_last_block().await, Err(ApiError::ApiError(_)));
    }
}
