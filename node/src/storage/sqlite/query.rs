use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use crate::block::roster::RosterState;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TransactionResult};
use crate::config::DatabaseConfiguration;

pub(crate) struct DbQuery {
    pub(crate) connection: Connection,
}

impl DbQuery {
    pub(crate) fn open(db_conf: &DatabaseConfiguration, flags: OpenFlags) -> anyhow::Result<Self> {
        let connection = Connection::open_with_flags(&db_conf.sqlite_path, flags)?;
        let query = Self { connection };
        Ok(query)
    }

    pub(crate) fn get_block_by_hash(&self, block_hash: &str) -> anyhow::Result<Option<Block>> {
        log::trace!("Getting block by hash: {}", block_hash);

        let mut stmt = self
            .connection
            .prepare_cached("SELECT block FROM blocks WHERE block_hash = ?1")?;
        let block = stmt
            .query_row(params![block_hash], Self::map_json::<Block>())
            .optional()?;

        if let Some(block) = &block {
            log::trace!("Found block: {}", block.header);
        } else {
            log::trace!("Block not found: {}", block_hash);
        };

        Ok(block)
    }

    pub(crate) fn get_last_block(&self) -> anyhow::Result<Option<Block>> {
        log::trace!("Getting last block");

        let mut stmt = self
            .connection
            .prepare_cached("SELECT block FROM blocks where id = (select max(id) from blocks)")?;

        let block = stmt
            .query_row(params![], Self::map_json::<Block>())
            .optional()?;

        if let Some(block) = &block {
            log::trace!("Found last block: {}", block.header);
        } else {
            log::trace!("Last block not found");
        };

        Ok(block)
    }

    pub(crate) fn get_block_by_height(&self, height: u64) -> anyhow::Result<Option<Block>> {
        log::trace!("Getting block by height: {}", height);

        let mut stmt = self
            .connection
            .prepare_cached("SELECT block FROM blocks WHERE height = ?1")?;
        let block = stmt
            .query_row(params![height], Self::map_json::<Block>())
            .optional()?;

        if block.is_none() {
            log::trace!("Block not found: {}", height);
        };

        Ok(block)
    }

    pub(crate) fn get_transaction(&self, tx_hash: &str) -> anyhow::Result<Option<Transaction>> {
        log::trace!("Getting transaction: {}", tx_hash);

        let mut stmt = self
            .connection
            .prepare_cached("SELECT tx FROM transactions WHERE tx_hash = ?1")?;
        let tx = stmt
            .query_row(params![tx_hash], Self::map_json::<Transaction>())
            .optional()?;
        Ok(tx)
    }

    pub(crate) fn get_transaction_result(
        &self,
        tx_hash: &str,
    ) -> anyhow::Result<Option<TransactionResult>> {
        log::trace!("Getting transaction result: {}", tx_hash);

        let mut stmt = self
            .connection
            .prepare_cached("SELECT result FROM transaction_results WHERE tx_hash = ?1")?;
        let result = stmt
            .query_row(params![tx_hash], Self::map_json::<TransactionResult>())
            .optional()?;
        Ok(result)
    }

    pub(crate) fn get_roster_state(&self) -> anyhow::Result<Option<RosterState>> {
        let mut stmt = self.connection.prepare_cached(
            "SELECT state FROM roster_state WHERE block_height = (select max(block_height) from roster_state)",
        )?;
        let state = stmt
            .query_row(params![], Self::map_json::<RosterState>())
            .optional()?;
        Ok(state)
    }

    fn map_json<T: DeserializeOwned>() -> impl FnOnce(&Row) -> Result<T, rusqlite::Error> {
        |row| {
            let body: Vec<u8> = row.get(0)?;
            let value = serde_json::from_slice::<T>(&body).map_err(|e| {
                log::error!("Error deserializing row: {}", e);
                rusqlite::Error::InvalidQuery {}
            })?;
            Ok(value)
        }
    }
}
