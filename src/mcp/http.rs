//! HTTP transport for the MCP server.
//!
//! Accepts JSON-RPC requests on `POST /mcp`.

use crate::mcp::protocol::handle_message;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Build the MCP router.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Handle MCP JSON-RPC requests.
///
/// POST /mcp
///
/// The body is taken raw so malformed input gets a JSON-RPC error object
/// instead of an extractor rejection.
pub async fn mcp_handler(State(app_state): State<AppState>, body: String) -> Response {
    match handle_message(&app_state.service, &body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Serve the MCP router until Ctrl-C.
pub async fn serve(addr: SocketAddr, app_state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("MCP server available at http://{}/mcp", addr);

    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
