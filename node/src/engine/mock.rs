use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::block::types::block::PrepId;
use crate::block::types::transaction::Transaction;
use crate::engine::{
    EngineError, ExecutionEngine, InvokeError, InvokeRequest, InvokeResponse, InvokeResult,
    PrecommitRequest, PrepEntry, PrepUpdate, Result,
};

pub(crate) enum MockReply {
    /// Results for every transaction, optionally with a new roster and injected transactions
    Success {
        preps: Option<Vec<PrepId>>,
        added: Vec<(usize, Transaction)>,
    },
    Reject,
    Response(InvokeResponse),
    /// Never answers
    Stall,
}

/// Scripted engine. Replies are consumed in order, a plain success is used once the script runs out.
#[derive(Default)]
pub(crate) struct MockEngine {
    pub(crate) invocations: Mutex<Vec<InvokeRequest>>,
    pub(crate) precommits: Mutex<Vec<PrecommitRequest>>,
    pub(crate) fail_precommit: AtomicBool,
    pub(crate) unreachable: AtomicBool,
    pub(crate) hello_stalls: AtomicBool,
    replies: Mutex<VecDeque<MockReply>>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply_next(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn invocations(&self) -> Vec<InvokeRequest> {
        self.invocations.lock().unwrap().clone()
    }

    pub(crate) fn precommits(&self) -> Vec<PrecommitRequest> {
        self.precommits.lock().unwrap().clone()
    }

    pub(crate) fn success(
        request: &InvokeRequest,
        preps: Option<Vec<PrepId>>,
        added: Vec<(usize, Transaction)>,
    ) -> InvokeResponse {
        let mut ordered = request
            .transactions
            .iter()
            .map(|tx| tx.tx_hash.clone())
            .collect::<Vec<_>>();
        let mut added_transactions = Map::new();
        for (index, tx) in added {
            ordered.insert(index, tx.tx_hash.clone());
            added_transactions.insert(tx.tx_hash.clone(), Value::Object(tx.params));
        }

        let tx_results = ordered
            .into_iter()
            .map(|hash| (hash, json!({"status": "0x1"})))
            .collect::<Map<_, _>>();

        InvokeResponse::Success(InvokeResult {
            state_root_hash: format!("root-{}", request.block.height),
            tx_results,
            prep: preps.map(|preps| PrepUpdate {
                preps: preps.into_iter().map(PrepEntry::Id).collect(),
            }),
            added_transactions: if added_transactions.is_empty() {
                None
            } else {
                Some(added_transactions)
            },
        })
    }
}

#[async_trait]
impl ExecutionEngine for MockEngine {
    async fn hello(&self) -> Result<()> {
        if self.hello_stalls.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(EngineError::Rpc(json!("unreachable")));
        }
        Ok(())
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse> {
        self.invocations.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            None => Ok(Self::success(&request, None, vec![])),
            Some(MockReply::Success { preps, added }) => Ok(Self::success(&request, preps, added)),
            Some(MockReply::Reject) => Ok(InvokeResponse::Error(InvokeError {
                error: json!({"code": -32000, "message": "rejected"}),
            })),
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Stall) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(EngineError::Rpc(json!("stalled")))
            }
        }
    }

    async fn write_precommit_state(&self, request: PrecommitRequest) -> Result<()> {
        self.precommits.lock().unwrap().push(request);
        if self.fail_precommit.load(Ordering::SeqCst) {
            return Err(EngineError::Rpc(json!("precommit failed")));
        }
        Ok(())
    }
}
