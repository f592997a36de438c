//! JSON-RPC tool surface at `POST /mcp`.
//!
//! A thin adapter over the same dispatch path the REST surface uses:
//! envelopes are parsed here, translated into [`crate::registry::ToolCall`]s,
//! and wrapped back into JSON-RPC responses. Once a body arrives the
//! HTTP status is always 200; every failure, including an unparsable
//! body, travels inside the envelope.
//!
//! | Condition | Code |
//! |-----------|------|
//! | unparsable body | -32700 |
//! | invalid envelope | -32600 |
//! | unknown method or tool | -32601 |
//! | invalid params | -32602 |
//! | unknown document | -32001 |
//! | timeout | -32000 |
//! | internal fault | -32603 |

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::QueryError;
use crate::registry;
use crate::server::{dispatch_tool, AppState};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const TIMEOUT: i64 = -32000;
pub const NOT_FOUND: i64 = -32001;

/// Inbound JSON-RPC envelope.
#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default = "default_jsonrpc")]
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

/// Outbound JSON-RPC envelope. Exactly one of `result` and `error` is
/// present.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    /// Echo of the request id; `null` when the request never parsed.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Handler for `POST /mcp`. The body is taken raw so a malformed one can
/// be answered with an in-envelope parse error instead of an extractor
/// rejection.
pub(crate) async fn handle_rpc(State(state): State<AppState>, body: String) -> Json<RpcResponse> {
    Json(process(&state, &body).await)
}

async fn process(state: &AppState, body: &str) -> RpcResponse {
    let raw: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return RpcResponse::error(Value::Null, PARSE_ERROR, format!("parse error: {}", e))
        }
    };
    let request: RpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => {
            return RpcResponse::error(
                Value::Null,
                INVALID_REQUEST,
                format!("invalid request: {}", e),
            )
        }
    };
    let id = request.id.unwrap_or(Value::Null);
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, INVALID_REQUEST, "invalid jsonrpc version");
    }

    match request.method.as_str() {
        "initialize" => RpcResponse::success(id, initialize_result()),
        "tools/list" => RpcResponse::success(id, json!({ "tools": registry::declared_tools() })),
        "tools/call" => handle_tools_call(state, id, request.params).await,
        "ping" => RpcResponse::success(id, json!({})),
        other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("method not found: {}", other)),
    }
}

/// `initialize` result: protocol info plus the full tool list, so a
/// client learns every invocable tool from the first round trip.
fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": { "tools": { "listChanged": false } },
        "tools": registry::declared_tools(),
    })
}

async fn handle_tools_call(state: &AppState, id: Value, params: Value) -> RpcResponse {
    #[derive(Deserialize)]
    struct CallParams {
        name: String,
        #[serde(default)]
        arguments: Value,
    }

    let call: CallParams = match serde_json::from_value(params) {
        Ok(call) => call,
        Err(e) => return RpcResponse::error(id, INVALID_PARAMS, format!("invalid params: {}", e)),
    };

    match dispatch_tool(state, &call.name, call.arguments).await {
        Ok(payload) => {
            let text = serde_json::to_string_pretty(&payload).unwrap_or_default();
            RpcResponse::success(id, json!({ "content": [{ "type": "text", "text": text }] }))
        }
        Err(err) => RpcResponse::error(id, rpc_code(&err), err.public_message()),
    }
}

/// Map the shared taxonomy onto JSON-RPC codes.
fn rpc_code(err: &QueryError) -> i64 {
    match err {
        QueryError::InvalidArgument(_) => INVALID_PARAMS,
        QueryError::NotFound(_) => NOT_FOUND,
        QueryError::UnknownTool(_) => METHOD_NOT_FOUND,
        QueryError::Timeout(_) => TIMEOUT,
        QueryError::Internal(_) => INTERNAL_ERROR,
    }
}
