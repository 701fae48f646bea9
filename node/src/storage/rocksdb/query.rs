use std::sync::Arc;

use log::trace;
use rocksdb::TransactionDB;
use serde::de::DeserializeOwned;

use crate::block::roster::RosterState;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TransactionResult};
use crate::storage::rocksdb::{
    block_hash_key, block_height_key, last_block_key, roster_state_key, transaction_key,
    transaction_result_key,
};

pub struct DbQuery {
    database: Arc<TransactionDB>,
}

impl DbQuery {
    pub fn new(db: Arc<TransactionDB>) -> DbQuery {
        DbQuery { database: db }
    }

    pub(crate) fn get_block_by_hash(&self, block_hash: &str) -> anyhow::Result<Option<Block>> {
        trace!("Getting block by hash: {:?}", block_hash);

        let block = self.get_json::<Block>(block_hash_key(block_hash))?;
        match &block {
            Some(block) => trace!("Found block: {}", block.header),
            None => trace!("Didn't find block"),
        }
        Ok(block)
    }

    pub(crate) fn get_last_block(&self) -> anyhow::Result<Option<Block>> {
        trace!("Getting last block");

        if let Some(block_hash) = self.database.get(last_block_key())? {
            let block_hash = String::from_utf8(block_hash)?;
            self.get_block_by_hash(&block_hash)
        } else {
            trace!("Unable to get last block");
            Ok(None)
        }
    }

    pub(crate) fn get_block_by_height(&self, height: u64) -> anyhow::Result<Option<Block>> {
        trace!("Getting block by height: {}", height);

        if let Some(block_hash) = self.database.get(block_height_key(height))? {
            let block_hash = String::from_utf8(block_hash)?;
            self.get_block_by_hash(&block_hash)
        } else {
            trace!("Didn't find block");
            Ok(None)
        }
    }

    pub(crate) fn get_transaction(&self, tx_hash: &str) -> anyhow::Result<Option<Transaction>> {
        trace!("Getting transaction: {}", tx_hash);
        self.get_json(transaction_key(tx_hash))
    }

    pub(crate) fn get_transaction_result(
        &self,
        tx_hash: &str,
    ) -> anyhow::Result<Option<TransactionResult>> {
        trace!("Getting transaction result: {}", tx_hash);
        self.get_json(transaction_result_key(tx_hash))
    }

    pub(crate) fn get_roster_state(&self) -> anyhow::Result<Option<RosterState>> {
        trace!("Getting roster state");
        self.get_json(roster_state_key())
    }

    fn get_json<T: DeserializeOwned>(&self, key: String) -> anyhow::Result<Option<T>> {
        match self.database.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}
