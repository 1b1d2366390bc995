//! MCP (Model Context Protocol) server exposing Opsbeacon operations as tools.

pub mod http;
mod protocol;
mod server;
pub mod stdio;
mod tools;

pub use server::McpOpsService;
