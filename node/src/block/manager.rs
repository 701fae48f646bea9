use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task;
use std::task::Poll::{Pending, Ready};
use std::time::Duration;

use futures::FutureExt;
use futures::Stream;
use futures_timer::Delay;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::block::producer::{BlockContent, BlockProducer, CandidateBlock};
use crate::block::roster::ValidatorRoster;
use crate::block::tx_queue::TxQueue;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TxHash};
use crate::config::BlockManagerConfiguration;
use crate::engine::{
    EngineError, ExecutionEngine, InvokeRequest, InvokeResponse, InvokeResult, PrecommitRequest,
};
use crate::logging::pretty_json;
use crate::storage::ChainDatabase;
use crate::utilities::hash::HashType;
use crate::utilities::time::BlockManagerTime;

pub(crate) type Result<T> = std::result::Result<T, BlockManagerError>;

#[derive(Error, Debug)]
pub(crate) enum BlockManagerError {
    #[error("Execution engine rejected the block: {0}")]
    EngineRejected(Value),
    #[error("Execution engine call failed: {0}")]
    Engine(#[from] EngineError),
    #[error("Execution engine didn't answer within {0:?}")]
    EngineTimeout(Duration),
    #[error("Malformed engine result: {0}")]
    MalformedResult(String),
    #[error("Chain is not bootstrapped")]
    NotBootstrapped,
    #[error("Chain is already bootstrapped")]
    AlreadyBootstrapped,
    #[error("BlockManagerError::GeneralError: {0}")]
    General(#[from] anyhow::Error),
}

/// What the caller should do after a transaction was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Intake {
    Queued,
    /// Debug transaction in manual mode, confirm a block now
    ConfirmNow,
}

/// Chain position and scheduling state. Changes only when a block commits,
/// apart from the queue which also changes on intake.
pub(crate) struct BlockChainState {
    pub(crate) tx_queue: TxQueue,
    pub(crate) roster: ValidatorRoster,
    /// Empty until genesis is committed
    pub(crate) last_committed_block: Option<Block>,
}

impl BlockChainState {
    pub(crate) fn new(config: &BlockManagerConfiguration) -> Self {
        Self {
            tx_queue: TxQueue::new(),
            roster: ValidatorRoster::new(config),
            last_committed_block: None,
        }
    }

    pub(crate) fn height(&self) -> Option<u64> {
        self.last_committed_block.as_ref().map(Block::get_height)
    }

    pub(crate) fn last_block_hash(&self) -> Option<HashType> {
        self.last_committed_block.as_ref().map(Block::get_hash)
    }
}

pub(crate) struct BlockManager {
    pub(crate) config: BlockManagerConfiguration,
    pub(crate) block_producer: BlockProducer,
    pub(crate) block_chain_state: BlockChainState,
    pub(crate) engine: Arc<dyn ExecutionEngine>,
    pub(crate) storage: Box<dyn ChainDatabase>,
    /// Upper bound for every engine call
    pub(crate) engine_timeout: Duration,
    /// Delay between periodic confirmations
    pub(crate) delay: Delay,
}

impl BlockManager {
    pub(crate) fn on_new_transaction(
        &mut self,
        tx_hash: TxHash,
        params: Map<String, Value>,
    ) -> Intake {
        if self.config.manual_confirm {
            let tx = Transaction::new(tx_hash, params);
            if self
                .config
                .is_debug_transaction(tx.sender(), tx.recipient())
            {
                log::info!("Received block confirmation trigger {}", tx.tx_hash);
                return Intake::ConfirmNow;
            }
            self.block_chain_state
                .tx_queue
                .enqueue(tx.tx_hash, tx.params);
        } else {
            self.block_chain_state.tx_queue.enqueue(tx_hash, params);
        }
        Intake::Queued
    }

    /// Runs one production cycle. Failures abort the cycle and are only logged.
    pub(crate) async fn confirm_block(&mut self) -> Option<Block> {
        match self.produce_block().await {
            Ok(Some(block)) => {
                log::info!("Committed block: {}", block);
                Some(block)
            }
            Ok(None) => None,
            Err(err) => {
                log::error!("Block production aborted: {err}");
                None
            }
        }
    }

    /// Drains the queue, executes the batch and commits the resulting block.
    ///
    /// Nothing but the queue changes when the cycle fails. The drained transactions are dropped,
    /// unless `requeue_on_abort` puts them back in front of the queue.
    pub(crate) async fn produce_block(&mut self) -> Result<Option<Block>> {
        if self.block_chain_state.last_committed_block.is_none() {
            return Err(BlockManagerError::NotBootstrapped);
        }

        let transactions = self.block_chain_state.tx_queue.drain();
        if transactions.is_empty() && !self.config.confirm_empty_blocks {
            log::trace!("No pending transactions, skipping block");
            return Ok(None);
        }

        let backup = if self.config.requeue_on_abort {
            Some(transactions.clone())
        } else {
            None
        };

        match self.run_cycle(transactions).await {
            Ok(block) => Ok(Some(block)),
            Err(err) => {
                if let Some(transactions) = backup {
                    self.block_chain_state.tx_queue.requeue_front(transactions);
                }
                Err(err)
            }
        }
    }

    /// Executes and commits the genesis block. Only valid on an empty chain.
    pub(crate) async fn bootstrap(&mut self) -> Result<Block> {
        if self.block_chain_state.last_committed_block.is_some() {
            return Err(BlockManagerError::AlreadyBootstrapped);
        }
        log::info!("Creating genesis block");

        let timestamp = BlockManagerTime::now();
        let genesis_tx = self.block_producer.genesis_transaction(timestamp)?;
        let roster = self.block_chain_state.roster.clone();
        let transactions = vec![genesis_tx];

        let candidate = self.block_producer.candidate_block(
            0,
            None,
            timestamp,
            &transactions,
            roster.next_leader(),
            roster.preps(),
            vec![],
        )?;
        let request = InvokeRequest {
            block: candidate.invoke_block(),
            transactions: transactions.clone(),
            prev_block_generator: None,
            prev_block_validators: vec![],
            prev_votes: vec![],
            is_block_editable: false,
        };

        let result = invoke(self.engine.as_ref(), self.engine_timeout, request).await?;
        self.commit(candidate, transactions, result, roster).await
    }

    async fn run_cycle(&mut self, transactions: Vec<Transaction>) -> Result<Block> {
        let (height, prev_hash) = match &self.block_chain_state.last_committed_block {
            Some(last) => (last.get_height() + 1, last.get_hash()),
            None => return Err(BlockManagerError::NotBootstrapped),
        };
        let timestamp = BlockManagerTime::now();

        let mut roster = self.block_chain_state.roster.clone();
        let prev_votes = roster.build_prev_votes(height - 1, Some(prev_hash), timestamp);
        let prev_contributors = roster.prev_block_contributors();
        let contributors = roster.compute_contributor_info();

        let candidate = self.block_producer.candidate_block(
            height,
            Some(prev_hash),
            timestamp,
            &transactions,
            contributors.generator,
            roster.prev_contributors(),
            prev_votes.clone(),
        )?;
        log::debug!(
            "Invoking block {} at height {height} with {} transactions",
            candidate.hash,
            transactions.len()
        );

        let (prev_block_generator, prev_block_validators) = match prev_contributors {
            Some(prev) => (Some(prev.generator), prev.validators),
            None => (None, vec![]),
        };
        let request = InvokeRequest {
            block: candidate.invoke_block(),
            transactions: transactions.clone(),
            prev_block_generator,
            prev_block_validators,
            prev_votes,
            is_block_editable: true,
        };
        log::trace!("Invoke request: {}", pretty_json(&request));

        let result = invoke(self.engine.as_ref(), self.engine_timeout, request).await?;
        self.commit(candidate, transactions, result, roster).await
    }

    /// Applies the engine's outcome. `roster` already carries this block's rotation.
    async fn commit(
        &mut self,
        candidate: CandidateBlock,
        transactions: Vec<Transaction>,
        result: InvokeResult,
        mut roster: ValidatorRoster,
    ) -> Result<Block> {
        let content = BlockContent::from_invoke_result(transactions, &result)
            .map_err(|err| BlockManagerError::MalformedResult(err.to_string()))?;

        roster.register(result.roster_update());

        let block = self.block_producer.commit_block(
            &candidate,
            &content,
            &roster,
            result.state_root_hash,
        )?;

        self.storage.store_block(
            &block,
            &content.transactions,
            &content.results,
            &roster.state(),
        )?;

        self.block_chain_state.roster = roster;
        self.block_chain_state.last_committed_block = Some(block.clone());

        let precommit = PrecommitRequest {
            block_height: block.get_height(),
            old_block_hash: candidate.hash,
            new_block_hash: block.get_hash(),
        };
        if let Err(err) =
            with_timeout(self.engine_timeout, self.engine.write_precommit_state(precommit)).await
        {
            log::error!(
                "Failed to write precommit state of block {}: {err}",
                block.get_height()
            );
        }

        Ok(block)
    }
}

async fn invoke(
    engine: &dyn ExecutionEngine,
    timeout: Duration,
    request: InvokeRequest,
) -> Result<InvokeResult> {
    match with_timeout(timeout, engine.invoke(request)).await? {
        InvokeResponse::Success(result) => Ok(result),
        InvokeResponse::Error(err) => Err(BlockManagerError::EngineRejected(err.error)),
    }
}

async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, EngineError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(BlockManagerError::EngineTimeout(timeout)),
    }
}

//Ticks at the confirmation interval. Stays silent in manual mode.
impl Stream for BlockManager {
    type Item = ();

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut task::Context,
    ) -> task::Poll<Option<Self::Item>> {
        if self.config.manual_confirm {
            return Pending;
        }

        match self.delay.poll_unpin(cx) {
            Ready(_) => {
                let interval = self.config.confirm_interval_sec;
                self.delay.reset(Duration::from_secs(interval));
                Ready(Some(()))
            }
            Pending => Pending,
        }
    }
}
