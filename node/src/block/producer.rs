use anyhow::anyhow;
use serde_json::{json, Map, Value};

use crate::block::roster::ValidatorRoster;
use crate::block::types::block::{Block, BlockHeader, PrepId, Vote};
use crate::block::types::transaction::{Transaction, TransactionResult};
use crate::config::GenesisConfiguration;
use crate::engine::{InvokeBlock, InvokeResult};
use crate::utilities::hash::{hash_list, hash_value, HashType};

/// Block as it is sent to the engine for execution.
///
/// Its hash covers only what is known before execution. The committed block gets a new hash
/// once receipts, state root and the next roster are known.
#[derive(Debug, Clone)]
pub(crate) struct CandidateBlock {
    pub(crate) height: u64,
    pub(crate) hash: HashType,
    pub(crate) prev_hash: Option<HashType>,
    pub(crate) timestamp: u64,
    pub(crate) leader: PrepId,
    pub(crate) reps_hash: HashType,
    pub(crate) prev_votes: Vec<Option<Vote>>,
}

impl CandidateBlock {
    pub(crate) fn invoke_block(&self) -> InvokeBlock {
        InvokeBlock {
            height: self.height,
            hash: self.hash,
            prev_hash: self.prev_hash,
            timestamp: self.timestamp,
        }
    }
}

/// Transactions and results of an executed block, aligned by position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BlockContent {
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) results: Vec<TransactionResult>,
}

impl BlockContent {
    /// Merges engine-added transactions into the drained batch and pairs every transaction
    /// with its result.
    ///
    /// An added transaction goes where its hash sits in the ordered result map. Drained
    /// transactions sharing a hash share one result entry, so the position counts every
    /// transaction whose result precedes it.
    pub(crate) fn from_invoke_result(
        drained: Vec<Transaction>,
        result: &InvokeResult,
    ) -> anyhow::Result<Self> {
        let mut transactions = drained;

        if let Some(added) = &result.added_transactions {
            if let Some(orphan) = added
                .keys()
                .find(|hash| !result.tx_results.contains_key(*hash))
            {
                return Err(anyhow!("No result for added transaction {orphan}"));
            }

            let ordered = result.tx_results.keys().collect::<Vec<_>>();
            for (index, tx_hash) in ordered.iter().enumerate() {
                let Some(tx) = added.get(*tx_hash) else {
                    continue;
                };
                let params = tx
                    .as_object()
                    .ok_or_else(|| anyhow!("Added transaction {tx_hash} is not an object"))?;
                let preceding = &ordered[..index];
                let position = transactions
                    .iter()
                    .filter(|existing| preceding.contains(&&existing.tx_hash))
                    .count();
                log::debug!("Engine added transaction {tx_hash} at position {position}");
                let added_tx = Transaction::new((*tx_hash).clone(), params.clone());
                transactions.insert(position, added_tx);
            }
        }

        for tx in &transactions {
            if !result.tx_results.contains_key(&tx.tx_hash) {
                return Err(anyhow!("Missing result for transaction {}", tx.tx_hash));
            }
        }
        if let Some(extra) = result
            .tx_results
            .keys()
            .find(|hash| !transactions.iter().any(|tx| &tx.tx_hash == *hash))
        {
            return Err(anyhow!("Result for unknown transaction {extra}"));
        }

        let results = result
            .tx_results
            .iter()
            .map(|(hash, value)| TransactionResult::new(hash.clone(), value.clone()))
            .collect();

        Ok(Self {
            transactions,
            results,
        })
    }
}

/// Assembles candidate and committed blocks. Holds no chain state itself.
pub(crate) struct BlockProducer {
    genesis: GenesisConfiguration,
}

impl BlockProducer {
    pub(crate) fn new(genesis: GenesisConfiguration) -> Self {
        Self { genesis }
    }

    pub(crate) fn candidate_block(
        &self,
        height: u64,
        prev_hash: Option<HashType>,
        timestamp: u64,
        transactions: &[Transaction],
        leader: PrepId,
        reps: &[PrepId],
        prev_votes: Vec<Option<Vote>>,
    ) -> anyhow::Result<CandidateBlock> {
        let transactions_hash = hash_list(transactions)?;
        let hash = hash_value(&json!({
            "height": height,
            "prevHash": prev_hash,
            "timestamp": timestamp,
            "transactionsHash": transactions_hash,
            "leader": leader,
        }))?;

        Ok(CandidateBlock {
            height,
            hash,
            prev_hash,
            timestamp,
            leader,
            reps_hash: hash_list(reps)?,
            prev_votes,
        })
    }

    /// Final block with the engine's outcome. `roster` is the roster after this block's
    /// rotation and registration.
    pub(crate) fn commit_block(
        &self,
        candidate: &CandidateBlock,
        content: &BlockContent,
        roster: &ValidatorRoster,
        state_root_hash: String,
    ) -> anyhow::Result<Block> {
        let mut header = BlockHeader {
            height: candidate.height,
            hash: HashType::default(),
            prev_hash: candidate.prev_hash,
            timestamp: candidate.timestamp,
            transactions_hash: hash_list(&content.transactions)?,
            receipts_hash: hash_list(&content.results)?,
            reps_hash: candidate.reps_hash,
            next_reps_hash: hash_list(roster.preps())?,
            prev_votes_hash: hash_list(&candidate.prev_votes)?,
            state_root_hash,
            leader: candidate.leader.clone(),
            next_leader: roster.next_leader(),
        };
        header.hash = header.calculate_hash()?;

        Ok(Block {
            header,
            transactions: content
                .transactions
                .iter()
                .map(|tx| tx.tx_hash.clone())
                .collect(),
            prev_votes: candidate.prev_votes.clone(),
        })
    }

    /// The single transaction of the genesis block, carrying the initial accounts.
    pub(crate) fn genesis_transaction(&self, timestamp: u64) -> anyhow::Result<Transaction> {
        let mut params = Map::new();
        params.insert("timestamp".to_string(), json!(timestamp));
        params.insert(
            "accounts".to_string(),
            serde_json::to_value(&self.genesis.accounts)?,
        );
        params.insert("message".to_string(), Value::String(self.genesis.message.clone()));
        Transaction::from_params(params)
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use serde_json::json;

    use crate::config::BlockManagerConfiguration;

    use super::*;

    fn tx(hash: &str) -> Transaction {
        Transaction::new(hash.to_string(), Map::new())
    }

    fn invoke_result(results: &[&str], added: Option<Map<String, Value>>) -> InvokeResult {
        InvokeResult {
            state_root_hash: "root".to_string(),
            tx_results: results
                .iter()
                .map(|hash| (hash.to_string(), json!({"status": "0x1"})))
                .collect(),
            prep: None,
            added_transactions: added,
        }
    }

    fn hashes(content: &BlockContent) -> Vec<&str> {
        content
            .transactions
            .iter()
            .map(|tx| tx.tx_hash.as_str())
            .collect()
    }

    #[test]
    fn added_transaction_is_spliced_at_result_position() {
        let mut added = Map::new();
        added.insert("t_added".to_string(), json!({"from": "engine"}));
        let result = invoke_result(&["t_added", "t1", "t2"], Some(added));

        let content = BlockContent::from_invoke_result(vec![tx("t1"), tx("t2")], &result).unwrap();

        assert_eq!(hashes(&content), vec!["t_added", "t1", "t2"]);
        assert_eq!(
            content.transactions[0].params.get("from"),
            Some(&json!("engine"))
        );
        let result_hashes = content
            .results
            .iter()
            .map(|r| r.tx_hash.as_str())
            .collect::<Vec<_>>();
        assert_eq!(result_hashes, vec!["t_added", "t1", "t2"]);
    }

    #[test]
    fn added_transaction_in_the_middle() {
        let mut added = Map::new();
        added.insert("t_added".to_string(), json!({}));
        let result = invoke_result(&["t1", "t_added", "t2"], Some(added));

        let content = BlockContent::from_invoke_result(vec![tx("t1"), tx("t2")], &result).unwrap();

        assert_eq!(hashes(&content), vec!["t1", "t_added", "t2"]);
    }

    #[test]
    fn missing_result_is_rejected() {
        let result = invoke_result(&["t1"], None);

        assert_matches!(
            BlockContent::from_invoke_result(vec![tx("t1"), tx("t2")], &result),
            Err(_)
        );
    }

    #[test]
    fn unknown_result_is_rejected() {
        let result = invoke_result(&["t1", "t9"], None);

        assert_matches!(
            BlockContent::from_invoke_result(vec![tx("t1")], &result),
            Err(_)
        );
    }

    #[test]
    fn added_transaction_without_result_is_rejected() {
        let mut added = Map::new();
        added.insert("t_added".to_string(), json!({}));
        let result = invoke_result(&["t1"], Some(added));

        assert_matches!(
            BlockContent::from_invoke_result(vec![tx("t1")], &result),
            Err(_)
        );
    }

    #[test]
    fn added_transaction_after_duplicate_hashes() {
        let mut added = Map::new();
        added.insert("t_added".to_string(), json!({}));
        let result = invoke_result(&["t1", "t_added", "t2"], Some(added));

        let content =
            BlockContent::from_invoke_result(vec![tx("t1"), tx("t1"), tx("t2")], &result).unwrap();

        assert_eq!(hashes(&content), vec!["t1", "t1", "t_added", "t2"]);
        assert_eq!(content.results.len(), 3);
    }

    #[test]
    fn candidate_hash_is_deterministic() {
        let producer = BlockProducer::new(GenesisConfiguration::default());
        let prev = Some(HashType::new([1; 32]));
        let txs = vec![tx("t1")];

        let first = producer
            .candidate_block(1, prev, 10, &txs, "V0".into(), &[], vec![])
            .unwrap();
        let second = producer
            .candidate_block(1, prev, 10, &txs, "V0".into(), &[], vec![])
            .unwrap();
        let other = producer
            .candidate_block(1, prev, 10, &[], "V0".into(), &[], vec![])
            .unwrap();

        assert_eq!(first.hash, second.hash);
        assert_ne!(first.hash, other.hash);
    }

    #[test]
    fn committed_hash_differs_from_candidate_hash() {
        let producer = BlockProducer::new(GenesisConfiguration::default());
        let roster = ValidatorRoster::new(&BlockManagerConfiguration::default());
        let candidate = producer
            .candidate_block(1, Some(HashType::new([1; 32])), 10, &[tx("t1")], "V0".into(), &[], vec![])
            .unwrap();
        let content = BlockContent {
            transactions: vec![tx("t1")],
            results: vec![TransactionResult::new("t1".into(), json!({"status": "0x1"}))],
        };

        let block = producer
            .commit_block(&candidate, &content, &roster, "root".to_string())
            .unwrap();

        assert_ne!(block.get_hash(), candidate.hash);
        assert_eq!(block.get_hash(), block.header.calculate_hash().unwrap());
        assert_eq!(block.transactions, vec!["t1"]);
        assert_eq!(block.header.next_leader, roster.next_leader());
    }

    #[test]
    fn genesis_transaction_carries_accounts() {
        let producer = BlockProducer::new(GenesisConfiguration::default());

        let tx = producer.genesis_transaction(1).unwrap();

        assert!(tx.tx_hash.starts_with("0x"));
        assert_eq!(tx.params["accounts"].as_array().unwrap().len(), 2);
    }
}
