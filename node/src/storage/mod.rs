use crate::block::roster::RosterState;
use crate::block::types::block::Block;
use crate::block::types::transaction::{Transaction, TransactionResult};
use crate::utilities::hash::HashType;

#[cfg(feature = "rocksdb_storage")]
pub(crate) mod rocksdb;
#[cfg(feature = "sqlite_storage")]
pub(crate) mod sqlite;

/// Committed chain. A block is written together with its transactions and results, or not at all.
pub(crate) trait ChainDatabase: Send {
    fn get_block_by_hash(&self, block_hash: &HashType) -> anyhow::Result<Option<Block>>;

    fn get_block_by_height(&self, height: u64) -> anyhow::Result<Option<Block>>;

    fn get_last_block(&self) -> anyhow::Result<Option<Block>>;

    fn get_transaction(&self, tx_hash: &str) -> anyhow::Result<Option<Transaction>>;

    fn get_transaction_result(&self, tx_hash: &str) -> anyhow::Result<Option<TransactionResult>>;

    /// Roster position stored with the last block
    fn get_roster_state(&self) -> anyhow::Result<Option<RosterState>>;

    /// Transactions and results sharing a hash overwrite earlier ones.
    fn store_block(
        &mut self,
        block: &Block,
        transactions: &[Transaction],
        results: &[TransactionResult],
        roster: &RosterState,
    ) -> anyhow::Result<()>;
}

#[cfg(test)]
pub(crate) mod test {
    use serde_json::{json, Map};

    use crate::block::roster::RosterState;
    use crate::block::types::block::{Block, BlockHeader};
    use crate::block::types::transaction::{Transaction, TransactionResult};
    use crate::utilities::hash::HashType;

    use super::ChainDatabase;

    pub(crate) fn block(height: u64, prev_hash: Option<HashType>, txs: &[&str]) -> Block {
        let zero = HashType::default();
        let mut header = BlockHeader {
            height,
            hash: zero,
            prev_hash,
            timestamp: height * 10,
            transactions_hash: zero,
            receipts_hash: zero,
            reps_hash: zero,
            next_reps_hash: zero,
            prev_votes_hash: zero,
            state_root_hash: format!("root-{height}"),
            leader: "V0".to_string(),
            next_leader: "V0".to_string(),
        };
        header.hash = header.calculate_hash().unwrap();
        Block {
            header,
            transactions: txs.iter().map(|tx| tx.to_string()).collect(),
            prev_votes: vec![],
        }
    }

    fn content(txs: &[&str]) -> (Vec<Transaction>, Vec<TransactionResult>) {
        let transactions = txs
            .iter()
            .map(|hash| {
                let mut params = Map::new();
                params.insert("nonce".to_string(), json!(hash));
                Transaction::new(hash.to_string(), params)
            })
            .collect();
        let results = txs
            .iter()
            .map(|hash| TransactionResult::new(hash.to_string(), json!({"status": "0x1"})))
            .collect();
        (transactions, results)
    }

    fn roster(preps: &[&str], produced_since_rotation: u64) -> RosterState {
        RosterState {
            preps: preps.iter().map(|p| p.to_string()).collect(),
            prev_contributors: vec!["V0".to_string()],
            produced_since_rotation,
        }
    }

    /// Behaviour shared by all backends.
    pub(crate) fn chain_database_contract(db: &mut dyn ChainDatabase) {
        assert!(db.get_last_block().unwrap().is_none());
        assert!(db.get_roster_state().unwrap().is_none());

        let genesis = block(0, None, &["g"]);
        let (txs, results) = content(&["g"]);
        db.store_block(&genesis, &txs, &results, &roster(&["V0"], 0)).unwrap();

        let block1 = block(1, Some(genesis.get_hash()), &["t1", "t2"]);
        let (txs, results) = content(&["t1", "t2"]);
        db.store_block(&block1, &txs, &results, &roster(&["V0", "V1"], 1)).unwrap();

        assert_eq!(db.get_last_block().unwrap(), Some(block1.clone()));
        assert_eq!(db.get_block_by_height(0).unwrap(), Some(genesis.clone()));
        assert_eq!(
            db.get_block_by_hash(&block1.get_hash()).unwrap(),
            Some(block1.clone())
        );
        assert!(db.get_block_by_height(2).unwrap().is_none());
        assert!(db
            .get_block_by_hash(&HashType::new([9; 32]))
            .unwrap()
            .is_none());

        let tx = db.get_transaction("t2").unwrap().unwrap();
        assert_eq!(tx.params.get("nonce"), Some(&json!("t2")));
        let result = db.get_transaction_result("t1").unwrap().unwrap();
        assert_eq!(result.status(), Some(&json!("0x1")));
        assert!(db.get_transaction("missing").unwrap().is_none());

        //Same height again is rejected and leaves the chain untouched
        let conflicting = block(1, Some(genesis.get_hash()), &["t3"]);
        let (txs, results) = content(&["t3"]);
        assert!(db.store_block(&conflicting, &txs, &results, &roster(&["X"], 0)).is_err());
        assert!(db.get_transaction("t3").unwrap().is_none());
        assert_eq!(db.get_last_block().unwrap(), Some(block1.clone()));
        assert_eq!(
            db.get_roster_state().unwrap(),
            Some(roster(&["V0", "V1"], 1))
        );

        //Duplicate transaction hashes in a later block overwrite
        let block2 = block(2, Some(block1.get_hash()), &["t1"]);
        let (txs, results) = content(&["t1"]);
        db.store_block(&block2, &txs, &results, &roster(&["V1", "V0"], 0))
            .unwrap();
        assert_eq!(db.get_last_block().unwrap(), Some(block2));
        assert_eq!(
            db.get_roster_state().unwrap(),
            Some(roster(&["V1", "V0"], 0))
        );
    }
}
