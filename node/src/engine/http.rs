use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::{
    EngineError, ExecutionEngine, InvokeError, InvokeRequest, InvokeResponse, PrecommitRequest,
    Result,
};

const METHOD_HELLO: &str = "hello";
const METHOD_INVOKE: &str = "invoke";
const METHOD_WRITE_PRECOMMIT_STATE: &str = "write_precommit_state";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Execution engine reached over JSON-RPC 2.0 on HTTP.
pub(crate) struct HttpExecutionEngine {
    pub(crate) client: reqwest::Client,
    pub(crate) url: String,
    next_id: AtomicU64,
}

impl HttpExecutionEngine {
    pub(crate) fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<JsonRpcResponse> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        log::trace!("Calling engine method {method}");

        let response = self.client.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(EngineError::UnexpectedResponse {
                status: response.status(),
                body: response.text().await?,
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn call_result(&self, method: &str, params: Value) -> Result<Value> {
        let response = self.call(method, params).await?;
        match response.error {
            Some(error) => Err(EngineError::Rpc(error)),
            None => Ok(response.result.unwrap_or(Value::Null)),
        }
    }
}

#[async_trait]
impl ExecutionEngine for HttpExecutionEngine {
    async fn hello(&self) -> Result<()> {
        let result = self.call_result(METHOD_HELLO, json!({})).await?;
        log::info!("Execution engine at {} answered hello: {result}", self.url);
        Ok(())
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse> {
        let params = serde_json::to_value(&request)?;
        let response = self.call(METHOD_INVOKE, params).await?;

        //A JSON-RPC level error is a rejection of the block, not a transport failure
        if let Some(error) = response.error {
            return Ok(InvokeResponse::Error(InvokeError { error }));
        }
        let result = response.result.unwrap_or(Value::Null);
        Ok(serde_json::from_value(result)?)
    }

    async fn write_precommit_state(&self, request: PrecommitRequest) -> Result<()> {
        let params = serde_json::to_value(&request)?;
        self.call_result(METHOD_WRITE_PRECOMMIT_STATE, params)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_is_json_rpc_2() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: METHOD_INVOKE,
            params: json!({"a": 1}),
            id: 7,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "method": "invoke", "params": {"a": 1}, "id": 7})
        );
    }

    #[test]
    fn response_fields_are_optional() {
        let response: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1})).unwrap();
        assert!(response.result.is_none());
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn unreachable_engine_fails_hello() {
        //Nothing listens on port 1
        let engine = HttpExecutionEngine::new("http://127.0.0.1:1".to_string());
        assert!(engine.hello().await.is_err());
    }
}
