//! # Block manager
//!
//! Produces the blocks of a single-node development chain. Transactions are queued as they arrive
//! and drained into a block on every production cycle:
//!
//! 1. Drain the queue and pick the block generator from the validator roster.
//! 2. Send the candidate block to the execution engine (`invoke`).
//! 3. Merge transactions the engine added, apply a new roster if the engine returned one.
//! 4. Seal the block with the receipts and state root, persist it and advance the chain.
//! 5. Tell the engine the final block hash (`write_precommit_state`).
//!
//! A cycle is triggered by a timer, or in manual mode by a configured debug transaction.
//! A failing cycle leaves chain and roster as they were. Its transactions are lost unless
//! requeueing is enabled.
//!
//! There is no consensus. Votes for the previous block are placeholders built from the roster,
//! and nothing is signed.

pub(crate) mod builder;
pub(crate) mod manager;
pub(crate) mod producer;
pub(crate) mod roster;
pub(crate) mod tx_queue;
pub(crate) mod types;
