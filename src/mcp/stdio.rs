//! Newline-delimited JSON-RPC transport over stdin/stdout.

use crate::mcp::protocol::{handle_message, JsonRpcResponse};
use crate::mcp::server::McpOpsService;
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize stdio response: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serve MCP requests on the process stdin/stdout until stdin closes.
pub async fn run(service: &McpOpsService) -> Result<(), StdioError> {
    info!("Server running with stdio transport");
    serve(service, BufReader::new(io::stdin()), io::stdout()).await
}

/// Serve requests read line by line from `reader`, one at a time.
pub async fn serve<R, W>(service: &McpOpsService, reader: R, mut writer: W) -> Result<(), StdioError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("Received STDIO line");

        if let Some(response) = handle_message(service, &line).await {
            write_response(&mut writer, &response).await?;
        }
    }

    info!("stdin closed, stopping stdio transport");
    Ok(())
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), StdioError>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
