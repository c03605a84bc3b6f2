//! MCP (Model Context Protocol) Server Implementation
//!
//! This module provides an MCP server implementation following the
//! JSON-RPC 2.0 specification and MCP protocol version 2025-06-18,
//! served over streamable HTTP or stdio.


pub mod errors;
pub mod http;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod validation;

pub use errors::{ErrorHandler, McpError, McpResult};
pub use protocol::*;
pub use server::{
    ConnectionState, McpServer, McpServerBuilder, MessageHandler, PromptHandler,
    ResourceHandler, ToolHandler,
};
