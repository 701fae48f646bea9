use std::sync::Arc;

use log::info;
use rocksdb::{TransactionDB, TransactionDBOptions};

use crate::block::roster::RosterState;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TransactionResult};
use crate::config::DatabaseConfiguration;
use crate::storage::rocksdb::query::DbQuery;
use crate::storage::rocksdb::store::DbStore;
use crate::storage::ChainDatabase;
use crate::utilities::hash::HashType;

pub(crate) mod query;
pub(crate) mod store;

pub(crate) struct RocksDbStorage {
    pub(crate) db_store: DbStore,
    pub(crate) db_query: DbQuery,
}

const PREFIX_LAST_BLOCK_KEY: &str = "last_block";
const PREFIX_BLOCK_HASH: &str = "block_hash";
const PREFIX_BLOCK_HEIGHT: &str = "block_height";
const PREFIX_TRANSACTION: &str = "tx";
const PREFIX_TRANSACTION_RESULT: &str = "tx_result";
const ROSTER_STATE_KEY: &str = "roster_state";

impl RocksDbStorage {
    pub fn open(db_conf: &DatabaseConfiguration) -> anyhow::Result<Self> {
        info!("Opening RocksDB database at {}", db_conf.rocksdb_path);

        let mut options = rocksdb::Options::default();
        options.create_if_missing(db_conf.create_if_not_exists);

        let db = TransactionDB::open(
            &options,
            &TransactionDBOptions::default(),
            &db_conf.rocksdb_path,
        )?;
        let db = Arc::new(db);
        let db_store = DbStore::new(db.clone());
        let db_query = DbQuery::new(db);
        let storage = Self { db_store, db_query };

        info!("Opened RocksDB database at {}", db_conf.rocksdb_path);
        Ok(storage)
    }
}

impl ChainDatabase for RocksDbStorage {
    fn get_block_by_hash(&self, block_hash: &HashType) -> anyhow::Result<Option<Block>> {
        self.db_query.get_block_by_hash(&block_hash.to_string())
    }

    fn get_block_by_height(&self, height: u64) -> anyhow::Result<Option<Block>> {
        self.db_query.get_block_by_height(height)
    }

    fn get_last_block(&self) -> anyhow::Result<Option<Block>> {
        self.db_query.get_last_block()
    }

    fn get_transaction(&self, tx_hash: &str) -> anyhow::Result<Option<Transaction>> {
        self.db_query.get_transaction(tx_hash)
    }

    fn get_transaction_result(&self, tx_hash: &str) -> anyhow::Result<Option<TransactionResult>> {
        self.db_query.get_transaction_result(tx_hash)
    }

    fn get_roster_state(&self) -> anyhow::Result<Option<RosterState>> {
        self.db_query.get_roster_state()
    }

    fn store_block(
        &mut self,
        block: &Block,
        transactions: &[Transaction],
        results: &[TransactionResult],
        roster: &RosterState,
    ) -> anyhow::Result<()> {
        self.db_store
            .store_block(block, transactions, results, roster)
    }
}

fn block_hash_key(block_hash: &str) -> String {
    format!("{PREFIX_BLOCK_HASH}:{block_hash}")
}

fn block_height_key(height: u64) -> String {
    format!("{PREFIX_BLOCK_HEIGHT}:{height}")
}

fn last_block_key() -> String {
    PREFIX_LAST_BLOCK_KEY.to_string()
}

fn roster_state_key() -> String {
    ROSTER_STATE_KEY.to_string()
}

fn transaction_key(tx_hash: &str) -> String {
    format!("{PREFIX_TRANSACTION}:{tx_hash}")
}

fn transaction_result_key(tx_hash: &str) -> String {
    format!("{PREFIX_TRANSACTION_RESULT}:{tx_hash}")
}
