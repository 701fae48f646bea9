use tokio::sync::oneshot;

use crate::api::types::ApiChainStatus;
use crate::api::{ApiCmd, ApiError};
use crate::block::manager::{BlockManager, Intake};

pub(crate) struct ApiCmdProcessor;

impl ApiCmdProcessor {
    pub(crate) async fn process_api_requests(
        block_manager: &mut BlockManager,
        cmd: ApiCmd,
    ) -> anyhow::Result<()> {
        log::trace!("Processing API request: {}", cmd);
        match cmd {
            ApiCmd::SubmitTransaction(tx) => {
                if block_manager.on_new_transaction(tx.tx_hash, tx.params) == Intake::ConfirmNow {
                    block_manager.confirm_block().await;
                }
            }
            ApiCmd::QueryBlockByHeight(height, reply) => {
                let response = block_manager
                    .storage
                    .get_block_by_height(height)
                    .map_err(|err| ApiError::ApiError(format!("Failed to get block: {err}")));
                Self::send_reply(reply, response);
            }
            ApiCmd::QueryBlockByHash(hash, reply) => {
                let response = block_manager
                    .storage
                    .get_block_by_hash(&hash)
                    .map_err(|err| ApiError::ApiError(format!("Failed to get block: {err}")));
                Self::send_reply(reply, response);
            }
            ApiCmd::QueryLastBlock(reply) => {
                let response = match &block_manager.block_chain_state.last_committed_block {
                    Some(block) => Ok(block.clone()),
                    None => Err(ApiError::ApiError("No blocks committed yet".to_string())),
                };
                Self::send_reply(reply, response);
            }
            ApiCmd::QueryTransaction(tx_hash, reply) => {
                let response = block_manager
                    .storage
                    .get_transaction(&tx_hash)
                    .map_err(|err| {
                        ApiError::ApiError(format!("Failed to get transaction: {err}"))
                    });
                Self::send_reply(reply, response);
            }
            ApiCmd::QueryTransactionResult(tx_hash, reply) => {
                let response = block_manager
                    .storage
                    .get_transaction_result(&tx_hash)
                    .map_err(|err| {
                        ApiError::ApiError(format!("Failed to get transaction result: {err}"))
                    });
                Self::send_reply(reply, response);
            }
            ApiCmd::QueryChainStatus(reply) => {
                let state = &block_manager.block_chain_state;
                let response = match (state.height(), state.last_block_hash()) {
                    (Some(height), Some(hash)) => Ok(ApiChainStatus {
                        height,
                        last_block_hash: hash.to_string(),
                        pending_transactions: state.tx_queue.len(),
                    }),
                    _ => Err(ApiError::ApiError("No blocks committed yet".to_string())),
                };
                Self::send_reply(reply, response);
            }
        }
        Ok(())
    }

    fn send_reply<T>(reply: oneshot::Sender<Result<T, ApiError>>, response: Result<T, ApiError>) {
        if reply.send(response).is_err() {
            log::error!("Failed to send api response, requester is gone");
        }
    }
}
