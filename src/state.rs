use std::sync::Arc;

use crate::mcp::McpOpsService;

/// Shared state for the HTTP transport.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<McpOpsService>,
}

impl AppState {
    pub fn new(service: Arc<McpOpsService>) -> Self {
        Self { service }
    }
}
