//! Tool registry and parameter schemas for the Opsbeacon tools.

use crate::client::{ClientError, ExecutionArgument};
use schemars::generate::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

/// Errors raised while running a recognized tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error(transparent)]
    Remote(#[from] ClientError),
}

// ============================================================================
// Tool Parameter Types
// ============================================================================

/// Parameters for list_commands (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListCommandsParams {}

/// Parameters for list_connections (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListConnectionsParams {}

/// A single `--name value` command argument.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ArgumentParam {
    /// Argument name
    pub name: String,
    /// Argument value
    pub value: String,
}

impl From<ArgumentParam> for ExecutionArgument {
    fn from(param: ArgumentParam) -> Self {
        ExecutionArgument::new(param.name, param.value)
    }
}

/// Parameters for the execute tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExecuteParams {
    /// Name of the connection to use
    pub connection: String,
    /// Name of the command to execute
    pub command: String,
    /// Optional list of arguments
    #[serde(default)]
    pub arguments: Vec<ArgumentParam>,
}

/// Parameters for the executionlogs tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExecutionLogsParams {
    /// Time window: 'today', 'yesterday' or 'last week'. Other values default to the last 7 days.
    pub timeframe: String,
    /// Page number
    #[serde(default = "default_page")]
    #[schemars(range(min = 1))]
    pub page: u32,
    /// Number of logs per page
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1))]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// Parameter struct that knows how to check its raw arguments.
pub trait ToolParams: DeserializeOwned + JsonSchema {
    /// Checks run on the raw argument map before deserialization.
    fn check_required(_arguments: &Map<String, Value>) -> Result<(), ToolError> {
        Ok(())
    }

    /// Validate and deserialize a raw argument map. Null values count as absent.
    fn parse(mut arguments: Map<String, Value>) -> Result<Self, ToolError> {
        arguments.retain(|_, value| !value.is_null());
        Self::check_required(&arguments)?;
        Ok(serde_json::from_value(Value::Object(arguments))?)
    }
}

impl ToolParams for ListCommandsParams {}

impl ToolParams for ListConnectionsParams {}

impl ToolParams for ExecuteParams {
    fn check_required(arguments: &Map<String, Value>) -> Result<(), ToolError> {
        let present = |key: &str| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty())
        };
        if !present("connection") || !present("command") {
            return Err(ToolError::Validation(
                "Both connection and command are required".to_string(),
            ));
        }
        Ok(())
    }
}

impl ToolParams for ExecutionLogsParams {
    fn check_required(arguments: &Map<String, Value>) -> Result<(), ToolError> {
        if !arguments.contains_key("timeframe") {
            return Err(ToolError::Validation(
                "Missing required timeframe argument".to_string(),
            ));
        }
        // Pages are 1-based.
        for key in ["page", "limit"] {
            if arguments.get(key).and_then(Value::as_u64) == Some(0) {
                return Err(ToolError::Validation(format!("{} must be at least 1", key)));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// The closed set of tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ListCommands,
    ListConnections,
    Execute,
    ExecutionLogs,
}

impl ToolKind {
    /// All tools, in advertised order.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::ListCommands,
        ToolKind::ListConnections,
        ToolKind::Execute,
        ToolKind::ExecutionLogs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ListCommands => "list_commands",
            ToolKind::ListConnections => "list_connections",
            ToolKind::Execute => "execute",
            ToolKind::ExecutionLogs => "executionlogs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::ListCommands => "List all available Opsbeacon commands",
            ToolKind::ListConnections => "List all available Opsbeacon connections",
            ToolKind::Execute => "Execute an Opsbeacon operation",
            ToolKind::ExecutionLogs => "Get execution logs for a specific date range",
        }
    }

    /// Verb phrase used in `Error {verb}: {message}` results.
    pub fn error_verb(self) -> &'static str {
        match self {
            ToolKind::ListCommands => "listing commands",
            ToolKind::ListConnections => "listing connections",
            ToolKind::Execute => "executing operation",
            ToolKind::ExecutionLogs => "getting execution logs",
        }
    }

    fn input_schema(self) -> Value {
        match self {
            ToolKind::ListCommands => input_schema::<ListCommandsParams>(),
            ToolKind::ListConnections => input_schema::<ListConnectionsParams>(),
            ToolKind::Execute => input_schema::<ExecuteParams>(),
            ToolKind::ExecutionLogs => input_schema::<ExecutionLogsParams>(),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Tool definition for MCP protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static REGISTRY: LazyLock<Vec<ToolDefinition>> =
    LazyLock::new(|| ToolKind::ALL.into_iter().map(ToolKind::definition).collect());

/// Tool definitions advertised to the host.
pub fn get_tool_definitions() -> &'static [ToolDefinition] {
    &REGISTRY
}

/// Generate an inlined JSON schema object for a parameter type.
fn input_schema<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft2020_12()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();

    let mut value = serde_json::to_value(schema).unwrap_or_default();
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
        map.remove("description");
        map.entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
    }
    value
}
