//! HTTP client for the Opsbeacon remote operations API.

use crate::timeframe::Timeframe;
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.console-dev.opsbeacon.com";

const COMMANDS_PATH: &str = "/workspace/v2/commands";
const CONNECTIONS_PATH: &str = "/workspace/v2/connections";
const EVENT_LOGS_PATH: &str = "/workspace/v2/eventlogs";
const TRIGGER_PATH: &str = "/trigger/v1/api";

/// Errors raised while talking to the Opsbeacon API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid bearer token: {0}")]
    InvalidToken(#[from] header::InvalidHeaderValue),
}

/// One `--name value` pair appended to an execution command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionArgument {
    pub name: String,
    pub value: String,
}

impl ExecutionArgument {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Operations exposed by the remote operations platform.
///
/// Every method returns the decoded JSON body. Bodies that are not JSON come
/// back as `{"error": "Invalid response format", "response": <raw text>}`.
#[async_trait]
pub trait RemoteOperations: Send + Sync {
    async fn list_commands(&self) -> Result<Value, ClientError>;

    async fn list_connections(&self) -> Result<Value, ClientError>;

    async fn execute_operation(
        &self,
        connection: &str,
        command: &str,
        arguments: &[ExecutionArgument],
    ) -> Result<Value, ClientError>;

    async fn get_execution_logs(
        &self,
        timeframe: &str,
        page: u32,
        limit: u32,
    ) -> Result<Value, ClientError>;
}

/// Opsbeacon API client holding at most one lazily opened session.
pub struct OpsbeaconClient {
    base_url: String,
    headers: header::HeaderMap,
    session: Mutex<Option<Client>>,
}

impl OpsbeaconClient {
    /// Create a client. No connection is opened until the first request.
    pub fn new(token: &str, base_url: &str) -> Result<Self, ClientError> {
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            session: Mutex::new(None),
        })
    }

    /// Return the live session, opening a new one if none is held.
    async fn session(&self) -> Result<Client, ClientError> {
        let mut session = self.session.lock().await;
        if let Some(client) = session.as_ref() {
            return Ok(client.clone());
        }

        // Fully built before it is stored.
        let client = Client::builder()
            .default_headers(self.headers.clone())
            .build()?;
        debug!(base_url = %self.base_url, "Opened Opsbeacon session");
        *session = Some(client.clone());
        Ok(client)
    }

    /// Whether a session is currently held.
    #[allow(dead_code)]
    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Drop the current session. Calling this with no open session is a no-op.
    pub async fn close(&self) {
        if self.session.lock().await.take().is_some() {
            info!("Closed Opsbeacon session");
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "GET request");
        let response = self.session().await?.get(url).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl RemoteOperations for OpsbeaconClient {
    async fn list_commands(&self) -> Result<Value, ClientError> {
        self.get(COMMANDS_PATH).await
    }

    async fn list_connections(&self) -> Result<Value, ClientError> {
        self.get(CONNECTIONS_PATH).await
    }

    async fn execute_operation(
        &self,
        connection: &str,
        command: &str,
        arguments: &[ExecutionArgument],
    ) -> Result<Value, ClientError> {
        let payload = json!({
            "commandLine": build_command_line(connection, command, arguments),
        });
        let url = self.url(TRIGGER_PATH);
        debug!(url = %url, %payload, "Executing operation");

        let response = self.session().await?.post(url).json(&payload).send().await?;
        decode(response).await
    }

    async fn get_execution_logs(
        &self,
        timeframe: &str,
        page: u32,
        limit: u32,
    ) -> Result<Value, ClientError> {
        let window = Timeframe::resolve(timeframe);
        let query = [
            ("startDate", window.start_param()),
            ("endDate", window.end_param()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("orderBy", "timestamp".to_string()),
            ("direction", "desc".to_string()),
        ];
        let url = self.url(EVENT_LOGS_PATH);
        debug!(url = %url, ?query, "GET request with query");

        let response = self.session().await?.get(url).query(&query).send().await?;
        decode(response).await
    }
}

/// Build `"<connection> <command> --<name> <value> ..."`.
///
/// Argument order is kept and values are not quoted or escaped.
pub fn build_command_line(
    connection: &str,
    command: &str,
    arguments: &[ExecutionArgument],
) -> String {
    let mut line = format!("{} {}", connection, command);
    for arg in arguments {
        line.push_str(&format!(" --{} {}", arg.name, arg.value));
    }
    line
}

async fn decode(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = if text.trim().is_empty() {
            status.canonical_reason().unwrap_or("Unknown status").to_string()
        } else {
            text
        };
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    Ok(normalize_body(&text))
}

/// Decode a response body, substituting a sentinel object for non-JSON text.
pub fn normalize_body(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, body = text, "Non-JSON response from API");
            json!({
                "error": "Invalid response format",
                "response": text,
            })
        }
    }
}
