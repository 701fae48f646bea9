use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utilities::hash::hash_value;

/// Transaction hash as it was assigned at intake. Opaque to the block manager.
pub type TxHash = String;

/// A pending or committed transaction.
///
/// The request body is opaque key/value data, the block manager only attaches `txHash` to it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Transaction {
    #[serde(rename = "txHash")]
    pub tx_hash: TxHash,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Transaction {
    pub fn new(tx_hash: TxHash, params: Map<String, Value>) -> Self {
        let mut params = params;
        //Hash is kept in its own field only
        params.remove("txHash");
        Self { tx_hash, params }
    }

    /// Assigns a content hash to a request which arrived without one.
    pub fn from_params(params: Map<String, Value>) -> anyhow::Result<Self> {
        let tx_hash = format!("0x{}", hash_value(&params)?);
        Ok(Self::new(tx_hash, params))
    }

    pub fn sender(&self) -> Option<&str> {
        self.params.get("from").and_then(Value::as_str)
    }

    pub fn recipient(&self) -> Option<&str> {
        self.params.get("to").and_then(Value::as_str)
    }
}

impl Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transaction({})", self.tx_hash)
    }
}

/// Outcome of a single transaction as reported by the execution engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransactionResult {
    #[serde(rename = "txHash")]
    pub tx_hash: TxHash,
    #[serde(flatten)]
    pub result: Map<String, Value>,
}

impl TransactionResult {
    /// Re-attaches the transaction hash to the engine's result.
    /// Non-object results are kept under the `result` key.
    pub fn new(tx_hash: TxHash, result: Value) -> Self {
        let mut result = match result {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };
        result.remove("txHash");
        Self { tx_hash, result }
    }

    pub fn status(&self) -> Option<&Value> {
        self.result.get("status")
    }
}
