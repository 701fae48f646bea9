use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::block::types::transaction::TxHash;
use crate::utilities::hash::{hash_value, HashType};

/// Validator identifier, e.g. an account address.
pub type PrepId = String;

/// Stands in for a vote signature. Votes are never verified.
pub(crate) const PLACEHOLDER_SIGNATURE: &str = "block_manager_does_not_support_vote_signature";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub rep: PrepId,
    pub timestamp: u64,
    pub block_height: u64,
    pub block_hash: Option<HashType>,
    pub signature: String,
}

impl Vote {
    pub(crate) fn placeholder(
        rep: PrepId,
        timestamp: u64,
        block_height: u64,
        block_hash: Option<HashType>,
    ) -> Self {
        Self {
            rep,
            timestamp,
            block_height,
            block_hash,
            signature: PLACEHOLDER_SIGNATURE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub height: u64,
    pub hash: HashType,
    /// Absent only for genesis
    pub prev_hash: Option<HashType>,
    pub timestamp: u64,
    pub transactions_hash: HashType,
    pub receipts_hash: HashType,
    pub reps_hash: HashType,
    pub next_reps_hash: HashType,
    pub prev_votes_hash: HashType,
    pub state_root_hash: String,
    pub leader: PrepId,
    pub next_leader: PrepId,
}

impl BlockHeader {
    /// Hash over every header field except the hash itself.
    pub(crate) fn calculate_hash(&self) -> anyhow::Result<HashType> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Preimage<'a> {
            height: u64,
            prev_hash: &'a Option<HashType>,
            timestamp: u64,
            transactions_hash: &'a HashType,
            receipts_hash: &'a HashType,
            reps_hash: &'a HashType,
            next_reps_hash: &'a HashType,
            prev_votes_hash: &'a HashType,
            state_root_hash: &'a str,
            leader: &'a str,
            next_leader: &'a str,
        }

        hash_value(&Preimage {
            height: self.height,
            prev_hash: &self.prev_hash,
            timestamp: self.timestamp,
            transactions_hash: &self.transactions_hash,
            receipts_hash: &self.receipts_hash,
            reps_hash: &self.reps_hash,
            next_reps_hash: &self.next_reps_hash,
            prev_votes_hash: &self.prev_votes_hash,
            state_root_hash: &self.state_root_hash,
            leader: &self.leader,
            next_leader: &self.next_leader,
        })
    }
}

impl Display for BlockHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hash = &self.hash;
        let height = self.height;
        let leader = &self.leader;
        let time = self.timestamp;
        write!(
            f,
            "hash: {hash}, height: {height}, leader: {leader}, timestamp: {time}",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: BlockHeader,
    /// Hashes of the block transactions in block order. Results share the same keys.
    pub transactions: Vec<TxHash>,
    /// Votes for the previous block, leader's position is empty
    pub prev_votes: Vec<Option<Vote>>,
}

impl Block {
    pub fn get_hash(&self) -> HashType {
        self.header.hash
    }

    pub fn get_height(&self) -> u64 {
        self.header.height
    }

    pub fn is_genesis(&self) -> bool {
        self.header.prev_hash.is_none()
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = &self.header;
        write!(f, "{header}, nr of transactions: {}", self.transactions.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn header() -> BlockHeader {
        let zero = HashType::default();
        BlockHeader {
            height: 1,
            hash: zero,
            prev_hash: Some(HashType::new([1; 32])),
            timestamp: 10,
            transactions_hash: zero,
            receipts_hash: zero,
            reps_hash: zero,
            next_reps_hash: zero,
            prev_votes_hash: zero,
            state_root_hash: "root".to_string(),
            leader: "hx1".to_string(),
            next_leader: "hx1".to_string(),
        }
    }

    #[test]
    fn header_hash_ignores_hash_field() {
        let mut header = header();
        let before = header.calculate_hash().unwrap();
        header.hash = before;
        assert_eq!(header.calculate_hash().unwrap(), before);
    }

    #[test]
    fn header_hash_covers_state_root() {
        let mut header = header();
        let before = header.calculate_hash().unwrap();
        header.state_root_hash = "other".to_string();
        assert_ne!(header.calculate_hash().unwrap(), before);
    }

    #[test]
    fn block_json_uses_camel_case() {
        let block = Block {
            header: header(),
            transactions: vec!["0x01".to_string()],
            prev_votes: vec![None],
        };
        let json = serde_json::to_value(&block).unwrap();
        assert!(json["header"].get("prevHash").is_some());
        assert!(json["header"].get("nextLeader").is_some());
        assert_eq!(json["prevVotes"][0], serde_json::Value::Null);

        let parsed: Block = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, block);
    }
}
