//! JSON-RPC broadcast for wallets that only sign.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use crate::error::SolError;

#[async_trait(?Send)]
pub trait SolanaRpc {
    /// `sendTransaction`; returns the transaction signature.
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<String, SolError>;
}

/// Builds the `sendTransaction` request body.
pub fn send_transaction_body(wire: &[u8]) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "sendTransaction",
        "params": [BASE64.encode(wire), {
            "encoding": "base64",
            "skipPreflight": false,
            "preflightCommitment": "confirmed",
            "maxRetries": 3
        }]
    })
}

/// Extracts the signature from a JSON-RPC response, surfacing `error` first.
pub fn parse_send_response(response: &Value) -> Result<String, SolError> {
    if let Some(err) = response.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| err.to_string());
        return Err(SolError::Rpc(message));
    }
    response
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| SolError::Rpc("sendTransaction missing string result".into()))
}

pub struct JsonRpcClient {
    client: reqwest::Client,
    endpoint: String,
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl SolanaRpc for JsonRpcClient {
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<String, SolError> {
        let response: Value = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&send_transaction_body(wire))
            .send()
            .await
            .map_err(|e| SolError::Rpc(format!("request failed: {e}")))?
            .json()
            .await
            .map_err(|e| SolError::Rpc(format!("invalid response: {e}")))?;

        let signature = parse_send_response(&response)?;
        tracing::debug!(%signature, endpoint = %self.endpoint, "transaction broadcast");
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_encodes_transaction_as_base64() {
        let body = send_transaction_body(&[1, 2, 3]);
        assert_eq!(body["method"], "sendTransaction");
        assert_eq!(body["params"][0], "AQID");
        assert_eq!(body["params"][1]["encoding"], "base64");
        assert_eq!(body["params"][1]["preflightCommitment"], "confirmed");
        assert_eq!(body["params"][1]["maxRetries"], 3);
    }

    #[test]
    fn response_result() {
        let sig = parse_send_response(&json!({"jsonrpc": "2.0", "result": "5sig", "id": 1})).unwrap();
        assert_eq!(sig, "5sig");
    }

    #[test]
    fn response_error_wins() {
        let err = parse_send_response(&json!({
            "error": {"code": -32002, "message": "Blockhash not found"},
            "result": "ignored"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "rpc error: Blockhash not found");
    }

    #[test]
    fn response_without_result() {
        assert!(parse_send_response(&json!({"id": 1})).is_err());
    }
}
