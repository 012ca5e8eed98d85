//! Bridge RPC protocol
//!
//! JSON-RPC 2.0 messages exchanged with the host over stdio. Every bridge
//! failure kind has its own error code so hosts can branch without parsing
//! messages.

use crate::bridge::BridgeRequest;
use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

pub const INVALID_STRUCTURE: i32 = -32001;
pub const CONNECTION_ERROR: i32 = -32002;
pub const XML_PARSE_ERROR: i32 = -32003;
pub const AMBIGUOUS_RESULT: i32 = -32004;
pub const QUERY_PARSE_ERROR: i32 = -32005;

/// Incoming call from the host
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Decode the params of a count / retrieve / search call
    pub fn bridge_request(&self) -> Result<BridgeRequest, RpcError> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, "Missing params"))?;
        serde_json::from_value(params)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))
    }
}

/// Error object of a failed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_detail(mut self, detail: &str) -> Self {
        self.data = Some(serde_json::json!({ "detail": detail }));
        self
    }
}

impl From<&BridgeError> for RpcError {
    fn from(error: &BridgeError) -> Self {
        let code = match error {
            BridgeError::InvalidStructure(_) => INVALID_STRUCTURE,
            BridgeError::Connection => CONNECTION_ERROR,
            BridgeError::XmlParse { .. } => XML_PARSE_ERROR,
            BridgeError::AmbiguousResult { .. } => AMBIGUOUS_RESULT,
            BridgeError::QueryParse(_) => QUERY_PARSE_ERROR,
        };

        let rpc_error = RpcError::new(code, error.to_string());
        match error.detail() {
            Some(detail) => rpc_error.with_detail(detail),
            None => rpc_error,
        }
    }
}

/// `result` or `error` member of a response
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(RpcError),
}

/// Reply sent back to the host, one per request
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(flatten)]
    outcome: Outcome,
}

impl RpcResponse {
    pub fn new(id: Option<Value>, outcome: std::result::Result<Value, RpcError>) -> Self {
        let outcome = match outcome {
            Ok(value) => Outcome::Result(value),
            Err(error) => Outcome::Error(error),
        };
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome,
        }
    }

    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RpcError> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(error) => Some(error),
        }
    }
}

/// Adapter identity for the initialize response
#[derive(Debug, Serialize, Deserialize)]
pub struct AdapterInfo {
    pub name: String,
    pub version: String,
}

/// Initialize result
#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "adapterInfo")]
    pub adapter_info: AdapterInfo,
    pub structures: Vec<String>,
    pub methods: Vec<String>,
}

/// Count result
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResult {
    pub count: u64,
}
