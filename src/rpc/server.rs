//! Bridge RPC server
//!
//! Dispatches JSON-RPC requests to a [`BridgeAdapter`]

use crate::bridge::BridgeAdapter;
use crate::rpc::protocol::*;
use crate::sharepoint::Structure;
use serde::Serialize;
use serde_json::Value;

pub const METHODS: &[&str] = &["initialize", "count", "retrieve", "search", "ping"];

/// RPC front end for a bridge adapter
pub struct BridgeServer<A> {
    adapter: A,
}

impl<A: BridgeAdapter> BridgeServer<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Handle one decoded request
    pub async fn handle_request(&self, request: RpcRequest) -> RpcResponse {
        let outcome = if request.jsonrpc != JSONRPC_VERSION {
            Err(RpcError::new(
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ))
        } else {
            self.dispatch(&request).await
        };

        if let Err(error) = &outcome {
            tracing::debug!(
                "{} failed with code {}: {}",
                request.method,
                error.code,
                error.message
            );
        }
        RpcResponse::new(request.id, outcome)
    }

    /// Handle one raw line of input
    pub async fn handle_line(&self, line: &str) -> RpcResponse {
        match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => RpcResponse::new(
                None,
                Err(RpcError::new(PARSE_ERROR, format!("Parse error: {}", e))),
            ),
        }
    }

    async fn dispatch(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        match request.method.as_str() {
            "initialize" => to_result(&InitializeResult {
                adapter_info: AdapterInfo {
                    name: self.adapter.name().to_string(),
                    version: self.adapter.version().to_string(),
                },
                structures: Structure::ALL.iter().map(|s| s.name().to_string()).collect(),
                methods: METHODS.iter().map(|m| m.to_string()).collect(),
            }),

            "count" => {
                let params = request.bridge_request()?;
                let count = self.adapter.count(&params).await.map_err(|e| RpcError::from(&e))?;
                to_result(&CountResult { count })
            }

            "retrieve" => {
                let params = request.bridge_request()?;
                let record = self.adapter.retrieve(&params).await.map_err(|e| RpcError::from(&e))?;
                to_result(&record)
            }

            "search" => {
                let params = request.bridge_request()?;
                let list = self.adapter.search(&params).await.map_err(|e| RpcError::from(&e))?;
                to_result(&list)
            }

            "ping" => Ok(serde_json::json!({})),

            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }
}

fn to_result<T: Serialize>(result: &T) -> Result<Value, RpcError> {
    serde_json::to_value(result).map_err(|e| {
        tracing::error!("Failed to serialize result: {}", e);
        RpcError::new(INTERNAL_ERROR, "Failed to serialize result")
    })
}
