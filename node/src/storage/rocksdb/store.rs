use std::sync::Arc;

use rocksdb::{TransactionDB, WriteBatchWithTransaction};

use crate::block::roster::RosterState;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TransactionResult};
use crate::storage::rocksdb::{
    block_hash_key, block_height_key, last_block_key, roster_state_key, transaction_key,
    transaction_result_key,
};

pub struct DbStore {
    connection: Arc<TransactionDB>,
}

impl DbStore {
    pub fn new(db: Arc<TransactionDB>) -> DbStore {
        DbStore { connection: db }
    }

    pub(crate) fn store_block(
        &self,
        block: &Block,
        transactions: &[Transaction],
        results: &[TransactionResult],
        roster: &RosterState,
    ) -> anyhow::Result<()> {
        log::debug!("Storing block: {}", block.header);
        let hash_str = block.header.hash.to_string();
        let block_hash_key = block_hash_key(&hash_str);
        log::trace!("Block hash key: {}", block_hash_key);

        let height_key = block_height_key(block.header.height);

        // Check UNIQUE constraints
        if self.connection.get(&block_hash_key)?.is_some() {
            return Err(anyhow::anyhow!("Block already exists: {hash_str}"));
        }
        if self.connection.get(&height_key)?.is_some() {
            return Err(anyhow::anyhow!(
                "Block at height {} already exists",
                block.header.height
            ));
        }

        let mut batch = WriteBatchWithTransaction::<true>::default();

        //Store last block hash(without prefix!)
        batch.put(last_block_key(), hash_str.clone());

        batch.put(height_key.as_bytes(), hash_str);

        let block_bytes = serde_json::to_vec::<Block>(block)?;
        batch.put(block_hash_key.as_bytes(), block_bytes);

        for transaction in transactions {
            let bytes = serde_json::to_vec(transaction)?;
            batch.put(transaction_key(&transaction.tx_hash).as_bytes(), bytes);
        }

        for result in results {
            let bytes = serde_json::to_vec(result)?;
            batch.put(transaction_result_key(&result.tx_hash).as_bytes(), bytes);
        }

        batch.put(roster_state_key(), serde_json::to_vec(roster)?);

        self.connection.write(batch)?;
        Ok(())
    }
}
