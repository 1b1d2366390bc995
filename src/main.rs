mod client;
mod config;
mod mcp;
mod state;
mod timeframe;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::client::OpsbeaconClient;
use crate::config::{Config, Transport};
use crate::mcp::McpOpsService;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing. Stdout belongs to the stdio transport.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsbeacon_mcp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    tracing::info!("Starting Opsbeacon MCP server");

    let config = Config::from_env().context("Failed to load Opsbeacon configuration")?;
    let client = Arc::new(
        OpsbeaconClient::new(&config.token, &config.api_url)
            .context("Failed to create Opsbeacon client")?,
    );
    let service = Arc::new(McpOpsService::new(client.clone()));

    let outcome = match config.transport {
        Transport::Stdio => {
            tokio::select! {
                result = mcp::stdio::run(&service) => result.context("stdio transport failed"),
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, shutting down");
                    Ok(())
                }
            }
        }
        Transport::Http(addr) => mcp::http::serve(addr, AppState::new(service))
            .await
            .context("HTTP transport failed"),
    };

    client.close().await;
    outcome
}
