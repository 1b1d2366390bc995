//! JSON-RPC message handling shared by the stdio and HTTP transports.

use crate::mcp::server::{McpOpsService, ProtocolError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// JSON-RPC request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    /// `None` only when the member is absent. An explicit `null` is `Some(Null)`.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    /// Notifications carry no id and expect no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none() || self.method.starts_with("notifications/")
    }
}

/// JSON-RPC response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: id.unwrap_or(Value::Null),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id: id.unwrap_or(Value::Null),
        }
    }
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, String> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(|e| format!("Invalid params: {}", e))
}

fn domain_error(id: Option<Value>, err: ProtocolError) -> JsonRpcResponse {
    JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string())
}

/// Handle one MCP request. Returns `None` for notifications.
pub async fn handle_request(
    service: &McpOpsService,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    debug!(method = %request.method, id = ?request.id, "MCP request");

    if request.is_notification() {
        return None;
    }

    let id = request.id;
    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": service.get_server_info(),
                "capabilities": {
                    "tools": {},
                    "resources": {},
                    "prompts": {}
                }
            }),
        ),

        "ping" => JsonRpcResponse::success(id, json!({})),

        "tools/list" => {
            JsonRpcResponse::success(id, json!({ "tools": service.list_tools() }))
        }

        "tools/call" => match parse_params::<CallToolParams>(request.params) {
            Ok(params) => {
                let result = service.call_tool(&params.name, params.arguments).await;

                // Serialize the Content using serde (rmcp types are serializable)
                let content_json = serde_json::to_value(&result.content).unwrap_or_default();
                let mut body = json!({
                    "content": content_json,
                    "isError": result.is_error.unwrap_or(false)
                });
                if let Some(structured) = result.structured_content {
                    body["structuredContent"] = structured;
                }
                JsonRpcResponse::success(id, body)
            }
            Err(message) => JsonRpcResponse::error(id, INVALID_PARAMS, message),
        },

        "resources/list" => {
            JsonRpcResponse::success(id, json!({ "resources": service.list_resources() }))
        }

        "resources/read" => match parse_params::<ReadResourceParams>(request.params) {
            Ok(params) => match service.read_resource(&params.uri) {
                Ok(contents) => JsonRpcResponse::success(id, contents),
                Err(e) => domain_error(id, e),
            },
            Err(message) => JsonRpcResponse::error(id, INVALID_PARAMS, message),
        },

        "prompts/list" => {
            JsonRpcResponse::success(id, json!({ "prompts": service.list_prompts() }))
        }

        "prompts/get" => match parse_params::<GetPromptParams>(request.params) {
            Ok(params) => match service.get_prompt(&params.name) {
                Ok(prompt) => JsonRpcResponse::success(id, prompt),
                Err(e) => domain_error(id, e),
            },
            Err(message) => JsonRpcResponse::error(id, INVALID_PARAMS, message),
        },

        _ => JsonRpcResponse::error(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    };

    Some(response)
}

/// Parse and handle one raw JSON-RPC message.
pub async fn handle_message(service: &McpOpsService, raw: &str) -> Option<JsonRpcResponse> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("Parse error: {}", e),
            ))
        }
    };

    let id = value.get("id").cloned();
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) => handle_request(service, request).await,
        Err(e) => Some(JsonRpcResponse::error(
            id,
            INVALID_REQUEST,
            format!("Invalid request: {}", e),
        )),
    }
}
