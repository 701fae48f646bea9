//! Local block production for a development chain: queues transactions, has an external
//! execution engine run them and commits the resulting blocks to a local database.

pub use crate::api::types::{ApiChainStatus, ApiTransactionSubmitted, Health};
pub use crate::api::{ApiError, BlockManagerApi};
pub use crate::block::types::block::{Block, BlockHeader, PrepId, Vote};
pub use crate::block::types::transaction::{Transaction, TransactionResult, TxHash};
pub use crate::core::builder::{NodeHandle, NodeStarter};
pub use crate::core::node::BlockManagerNode;
pub use crate::core::shutdown::ShutdownHandle;
pub use crate::utilities::hash::HashType;

pub mod api;
pub(crate) mod block;
pub mod cli;
pub mod config;
pub(crate) mod core;
pub(crate) mod engine;
pub mod logging;
pub(crate) mod storage;
pub(crate) mod utilities;
