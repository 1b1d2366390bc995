//! MCP service exposing Opsbeacon operations as tools.
//!
//! Uses rmcp 0.12.0 model types for MCP-compliant tool results.

use crate::client::{ExecutionArgument, RemoteOperations};
use crate::mcp::tools::{
    get_tool_definitions, ExecuteParams, ExecutionLogsParams, ListCommandsParams,
    ListConnectionsParams, ToolDefinition, ToolError, ToolKind, ToolParams,
};
use rmcp::model::{CallToolResult, Content};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Protocol-level errors surfaced to the host as JSON-RPC errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unsupported URI: {0}")]
    UnsupportedUri(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),
}

/// MCP service dispatching tool calls to the Opsbeacon API.
pub struct McpOpsService {
    client: Arc<dyn RemoteOperations>,
}

impl McpOpsService {
    pub fn new(client: Arc<dyn RemoteOperations>) -> Self {
        Self { client }
    }

    /// Get server info for MCP initialization.
    pub fn get_server_info(&self) -> Value {
        json!({
            "name": "opsbeacon",
            "version": env!("CARGO_PKG_VERSION")
        })
    }

    /// List available tools with their schemas.
    pub fn list_tools(&self) -> &'static [ToolDefinition] {
        get_tool_definitions()
    }

    /// Call a tool by name.
    ///
    /// Failures of a recognized tool are returned as an error result rather
    /// than propagated.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> CallToolResult {
        debug!(tool = name, ?arguments, "Tool called");

        let Some(tool) = ToolKind::from_name(name) else {
            warn!(tool = name, "Unknown tool");
            return CallToolResult::error(vec![Content::text(format!("Unknown tool: {}", name))]);
        };

        match self.dispatch(tool, arguments.unwrap_or_default()).await {
            Ok(value) => render_success(value),
            Err(e) => {
                error!(tool = name, error = %e, "Tool call failed");
                CallToolResult::error(vec![Content::text(format!(
                    "Error {}: {}",
                    tool.error_verb(),
                    e
                ))])
            }
        }
    }

    async fn dispatch(&self, tool: ToolKind, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let value = match tool {
            ToolKind::ListCommands => {
                ListCommandsParams::parse(arguments)?;
                self.client.list_commands().await?
            }
            ToolKind::ListConnections => {
                ListConnectionsParams::parse(arguments)?;
                self.client.list_connections().await?
            }
            ToolKind::Execute => {
                let params = ExecuteParams::parse(arguments)?;
                let args: Vec<ExecutionArgument> =
                    params.arguments.into_iter().map(Into::into).collect();
                self.client
                    .execute_operation(&params.connection, &params.command, &args)
                    .await?
            }
            ToolKind::ExecutionLogs => {
                let params = ExecutionLogsParams::parse(arguments)?;
                self.client
                    .get_execution_logs(&params.timeframe, params.page, params.limit)
                    .await?
            }
        };
        Ok(value)
    }

    pub fn list_resources(&self) -> Vec<Value> {
        Vec::new()
    }

    pub fn read_resource(&self, uri: &str) -> Result<Value, ProtocolError> {
        debug!(uri, "Resource read requested");
        Err(ProtocolError::UnsupportedUri(uri.to_string()))
    }

    pub fn list_prompts(&self) -> Vec<Value> {
        Vec::new()
    }

    pub fn get_prompt(&self, name: &str) -> Result<Value, ProtocolError> {
        debug!(prompt = name, "Prompt requested");
        Err(ProtocolError::UnknownPrompt(name.to_string()))
    }
}

/// One text item plus the same value as a structured JSON artifact.
fn render_success(value: Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    result.structured_content = Some(json!({ "type": "json", "data": value }));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        ListCommands,
        ListConnections,
        Execute(String, String, Vec<ExecutionArgument>),
        Logs(String, u32, u32),
    }

    /// Records calls and answers with a canned response.
    struct FakeRemote {
        calls: Mutex<Vec<Call>>,
        response: fn() -> Result<Value, ClientError>,
    }

    impl FakeRemote {
        fn returning(response: fn() -> Result<Value, ClientError>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                response,
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) -> Result<Value, ClientError> {
            self.calls.lock().unwrap().push(call);
            (self.response)()
        }
    }

    #[async_trait]
    impl RemoteOperations for FakeRemote {
        async fn list_commands(&self) -> Result<Value, ClientError> {
            self.record(Call::ListCommands)
        }

        async fn list_connections(&self) -> Result<Value, ClientError> {
            self.record(Call::ListConnections)
        }

        async fn execute_operation(
            &self,
            connection: &str,
            command: &str,
            arguments: &[ExecutionArgument],
        ) -> Result<Value, ClientError> {
            self.record(Call::Execute(
                connection.to_string(),
                command.to_string(),
                arguments.to_vec(),
            ))
        }

        async fn get_execution_logs(
            &self,
            timeframe: &str,
            page: u32,
            limit: u32,
        ) -> Result<Value, ClientError> {
            self.record(Call::Logs(timeframe.to_string(), page, limit))
        }
    }

    fn ok_items() -> Result<Value, ClientError> {
        Ok(json!([{"id": 1}]))
    }

    fn unauthorized() -> Result<Value, ClientError> {
        Err(ClientError::Status {
            status: 401,
            message: "Unauthorized".to_string(),
        })
    }

    fn service(remote: &Arc<FakeRemote>) -> McpOpsService {
        McpOpsService::new(remote.clone())
    }

    fn args(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    fn text_of(result: &CallToolResult) -> String {
        assert_eq!(result.content.len(), 1);
        let item = serde_json::to_value(&result.content[0]).unwrap();
        assert_eq!(item["type"], "text");
        item["text"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_list_commands_success_carries_artifact() {
        let remote = FakeRemote::returning(ok_items);
        let result = service(&remote).call_tool("list_commands", None).await;

        assert_eq!(result.is_error, Some(false));
        let text = text_of(&result);
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!([{"id": 1}]));
        assert_eq!(
            result.structured_content,
            Some(json!({"type": "json", "data": [{"id": 1}]}))
        );
        assert_eq!(remote.calls(), vec![Call::ListCommands]);
    }

    #[tokio::test]
    async fn test_list_connections_dispatches() {
        let remote = FakeRemote::returning(ok_items);
        service(&remote).call_tool("list_connections", args(json!({}))).await;
        assert_eq!(remote.calls(), vec![Call::ListConnections]);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let remote = FakeRemote::returning(ok_items);
        let result = service(&remote).call_tool("reboot_everything", None).await;

        assert_eq!(text_of(&result), "Unknown tool: reboot_everything");
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_execute_shapes_arguments_in_order() {
        let remote = FakeRemote::returning(ok_items);
        let result = service(&remote)
            .call_tool(
                "execute",
                args(json!({
                    "connection": "db1",
                    "command": "run",
                    "arguments": [
                        {"name": "x", "value": "1"},
                        {"name": "y", "value": "2"},
                        {"name": "x", "value": "1"}
                    ]
                })),
            )
            .await;

        assert_eq!(result.is_error, Some(false));
        assert_eq!(
            remote.calls(),
            vec![Call::Execute(
                "db1".to_string(),
                "run".to_string(),
                vec![
                    ExecutionArgument::new("x", "1"),
                    ExecutionArgument::new("y", "2"),
                    ExecutionArgument::new("x", "1"),
                ]
            )]
        );
    }

    #[tokio::test]
    async fn test_execute_empty_connection_makes_no_call() {
        let remote = FakeRemote::returning(ok_items);
        let result = service(&remote)
            .call_tool("execute", args(json!({"connection": "", "command": "run"})))
            .await;

        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_of(&result),
            "Error executing operation: Both connection and command are required"
        );
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_execute_without_arguments_makes_no_call() {
        let remote = FakeRemote::returning(ok_items);
        let result = service(&remote).call_tool("execute", None).await;

        assert_eq!(
            text_of(&result),
            "Error executing operation: Both connection and command are required"
        );
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_execution_logs_applies_defaults() {
        let remote = FakeRemote::returning(ok_items);
        service(&remote)
            .call_tool("executionlogs", args(json!({"timeframe": "today"})))
            .await;
        assert_eq!(remote.calls(), vec![Call::Logs("today".to_string(), 1, 10)]);
    }

    #[tokio::test]
    async fn test_execution_logs_explicit_paging() {
        let remote = FakeRemote::returning(ok_items);
        service(&remote)
            .call_tool(
                "executionlogs",
                args(json!({"timeframe": "banana", "page": 3, "limit": 50})),
            )
            .await;
        assert_eq!(remote.calls(), vec![Call::Logs("banana".to_string(), 3, 50)]);
    }

    #[tokio::test]
    async fn test_execution_logs_missing_timeframe() {
        let remote = FakeRemote::returning(ok_items);
        let result = service(&remote)
            .call_tool("executionlogs", args(json!({"page": 1})))
            .await;

        assert_eq!(
            text_of(&result),
            "Error getting execution logs: Missing required timeframe argument"
        );
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_becomes_error_text() {
        let remote = FakeRemote::returning(unauthorized);
        let result = service(&remote).call_tool("list_connections", None).await;

        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_of(&result),
            "Error listing connections: HTTP status 401: Unauthorized"
        );
        assert!(result.structured_content.is_none());
    }

    #[tokio::test]
    async fn test_sentinel_payload_is_success() {
        fn sentinel() -> Result<Value, ClientError> {
            Ok(crate::client::normalize_body("not json"))
        }
        let remote = FakeRemote::returning(sentinel);
        let result = service(&remote).call_tool("list_commands", None).await;

        assert_eq!(result.is_error, Some(false));
        assert_eq!(
            result.structured_content.unwrap()["data"],
            json!({"error": "Invalid response format", "response": "not json"})
        );
    }

    #[test]
    fn test_resources_and_prompts() {
        let remote = FakeRemote::returning(ok_items);
        let service = service(&remote);

        assert!(service.list_resources().is_empty());
        assert!(service.list_prompts().is_empty());
        assert_eq!(
            service.read_resource("file:///etc/passwd").unwrap_err().to_string(),
            "Unsupported URI: file:///etc/passwd"
        );
        assert_eq!(
            service.get_prompt("summary").unwrap_err().to_string(),
            "Unknown prompt: summary"
        );
    }

    #[test]
    fn test_list_tools_matches_registry() {
        let remote = FakeRemote::returning(ok_items);
        assert_eq!(service(&remote).list_tools().len(), 4);
    }
}
