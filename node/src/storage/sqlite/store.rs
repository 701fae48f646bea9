use anyhow::Result;
use rusqlite::{params, Connection, OpenFlags};

use crate::block::roster::RosterState;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TransactionResult};
use crate::config::DatabaseConfiguration;

pub struct DbStore {
    connection: Connection,
}

impl DbStore {
    pub fn open(db_conf: &DatabaseConfiguration, flags: OpenFlags) -> Result<DbStore> {
        let connection = Connection::open_with_flags(&db_conf.sqlite_path, flags)?;
        Ok(DbStore { connection })
    }

    pub(crate) fn store_block(
        &mut self,
        block: &Block,
        transactions: &[Transaction],
        results: &[TransactionResult],
        roster: &RosterState,
    ) -> Result<()> {
        log::debug!("Storing block: {}", block.header);

        let hash = block.header.hash.to_string();
        let height = block.header.height;
        let block_bytes = serde_json::to_vec::<Block>(block)?;

        let tx = self.connection.transaction()?;
        {
            let mut statement = tx.prepare_cached(
                "INSERT INTO blocks (block_hash, height, block) VALUES (?1, ?2, ?3)",
            )?;
            statement.execute(params![&hash, &height, &block_bytes])?;

            let mut statement = tx.prepare_cached(
                "INSERT OR REPLACE INTO transactions (tx_hash, block_height, tx) VALUES (?1, ?2, ?3)",
            )?;
            for transaction in transactions {
                let bytes = serde_json::to_vec(transaction)?;
                statement.execute(params![&transaction.tx_hash, &height, &bytes])?;
            }

            let mut statement = tx.prepare_cached(
                "INSERT OR REPLACE INTO transaction_results (tx_hash, block_height, result) VALUES (?1, ?2, ?3)",
            )?;
            for result in results {
                let bytes = serde_json::to_vec(result)?;
                statement.execute(params![&result.tx_hash, &height, &bytes])?;
            }

            let mut statement = tx.prepare_cached(
                "INSERT INTO roster_state (block_height, state) VALUES (?1, ?2)",
            )?;
            statement.execute(params![&height, &serde_json::to_vec(roster)?])?;
        }

        tx.commit()?;

        Ok(())
    }
}
