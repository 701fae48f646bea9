use rusqlite::Connection;

use crate::block::roster::RosterState;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TransactionResult};
use crate::config::DatabaseConfiguration;
use crate::storage::sqlite::query::DbQuery;
use crate::storage::sqlite::store::DbStore;
use crate::storage::ChainDatabase;
use crate::utilities::hash::HashType;

pub(crate) mod query;
pub(crate) mod store;

mod migrations {
    use refinery::embed_migrations;

    embed_migrations!("migrations");
}

pub(crate) struct SqliteStorage {
    pub(crate) db_store: DbStore,
    pub(crate) db_query: DbQuery,
}

impl SqliteStorage {
    pub fn open(db_conf: &DatabaseConfiguration) -> anyhow::Result<Self> {
        let mut flags = rusqlite::OpenFlags::default();
        if !db_conf.create_if_not_exists {
            flags.remove(rusqlite::OpenFlags::SQLITE_OPEN_CREATE);
        }

        let mut connection = Connection::open_with_flags(&db_conf.sqlite_path, flags)?;
        Self::run_migrations(&mut connection)?;

        log::info!("Starting db backend with path: {}", db_conf.sqlite_path);
        let db_store = DbStore::open(db_conf, flags)?;
        let db_query = DbQuery::open(db_conf, flags)?;
        let storage = Self { db_store, db_query };
        Ok(storage)
    }

    pub fn run_migrations(connection: &mut Connection) -> anyhow::Result<()> {
        log::info!("Running database migrations");
        match migrations::migrations::runner().run(connection) {
            Ok(ok) => {
                log::info!("Database migrations completed:{:?} ", ok);
                Ok(())
            }
            Err(err) => {
                log::error!("Database migrations failed: {}", err);
                Err(anyhow::anyhow!(err))
            }
        }
    }
}

impl ChainDatabase for SqliteStorage {
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

#[cfg(test)]
mod test {
    use crate::config::DatabaseConfiguration;
    use crate::storage::test::chain_database_contract;

    use super::*;

    #[test]
    fn sqlite_storage_contract() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfiguration {
            rocksdb_path: dir.path().join("rocksdb").display().to_string(),
            sqlite_path: dir.path().join("chain.sqlite").display().to_string(),
            create_if_not_exists: true,
        };

        let mut storage = SqliteStorage::open(&config).unwrap();

        chain_database_contract(&mut storage);
    }

    #[test]
    fn missing_database_is_not_created_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfiguration {
            rocksdb_path: String::new(),
            sqlite_path: dir.path().join("chain.sqlite").display().to_string(),
            create_if_not_exists: false,
        };

        assert!(SqliteStorage::open(&config).is_err());
    }
}
