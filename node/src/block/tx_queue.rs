use serde_json::{Map, Value};

use crate::block::types::transaction::{Transaction, TxHash};

/// Pending transactions in intake order.
///
/// Owned by the block manager and touched only from the node event loop,
/// so `drain` can't interleave with `enqueue`.
pub(crate) struct TxQueue {
    pending: Vec<Transaction>,
}

impl TxQueue {
    pub(crate) fn new() -> Self {
        Self {
            pending: Vec::with_capacity(1000),
        }
    }

    /// Appends a transaction to the tail. Duplicate hashes are accepted.
    pub(crate) fn enqueue(&mut self, tx_hash: TxHash, params: Map<String, Value>) {
        log::debug!("Adding transaction to queue: {}", tx_hash);
        self.pending.push(Transaction::new(tx_hash, params));
        log::trace!("Transaction queue size: {}", self.pending.len());
    }

    /// Takes every pending transaction and leaves the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<Transaction> {
        let drained = std::mem::take(&mut self.pending);
        log::trace!("Drained {} transactions from queue", drained.len());
        drained
    }

    /// Puts a drained batch back in front of everything enqueued since.
    pub(crate) fn requeue_front(&mut self, mut transactions: Vec<Transaction>) {
        log::debug!("Requeueing {} transactions", transactions.len());
        transactions.append(&mut self.pending);
        self.pending = transactions;
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
