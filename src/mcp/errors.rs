//! Protocol-level failures and how they surface on the wire.
//!
//! Handlers return `anyhow::Result`; anything that is an [`McpError`]
//! keeps its JSON-RPC code, everything else becomes an internal error.

use crate::mcp::protocol::*;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

/// Errors reported back to the client as JSON-RPC error objects
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unsupported protocol version: {version}. Supported: {}", supported.join(", "))]
    UnsupportedProtocolVersion {
        version: String,
        supported: Vec<String>,
    },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: String },

    #[error("Prompt not found: {name}")]
    PromptNotFound { name: String },

    #[error("Invalid parameters for tool '{tool}': {message}")]
    InvalidToolParameters { tool: String, message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl McpError {
    /// JSON-RPC error code for this failure
    #[inline]
    pub fn code(&self) -> i32 {
        match self {
            Self::UnsupportedProtocolVersion { .. } => mcp_error_codes::INVALID_PROTOCOL_VERSION,
            Self::ToolNotFound { .. } => mcp_error_codes::TOOL_NOT_FOUND,
            Self::ResourceNotFound { .. } => mcp_error_codes::RESOURCE_NOT_FOUND,
            Self::PromptNotFound { .. } => mcp_error_codes::PROMPT_NOT_FOUND,
            Self::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
            Self::InternalError { .. } => error_codes::INTERNAL_ERROR,
            Self::MethodNotFound { .. } => error_codes::METHOD_NOT_FOUND,
            Self::InvalidToolParameters { .. }
            | Self::InvalidParameters { .. }
            | Self::ValidationError { .. } => error_codes::INVALID_PARAMS,
        }
    }

    /// Structured detail attached to the error object, if any
    fn data(&self) -> Option<Value> {
        match self {
            Self::UnsupportedProtocolVersion { version, supported } => {
                Some(json!({ "supported": supported, "requested": version }))
            }
            Self::ResourceNotFound { uri } => Some(json!({ "uri": uri })),
            Self::ToolNotFound { name } | Self::PromptNotFound { name } => {
                Some(json!({ "name": name }))
            }
            _ => None,
        }
    }

    /// True when the client sent something the server cannot act on
    #[inline]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::InternalError { .. })
    }

    #[inline]
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        JsonRpcError::new(self.code(), self.to_string(), self.data())
    }

    #[inline]
    pub fn to_error_response(&self, id: Option<RequestId>) -> JsonRpcMessage {
        JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(self.to_jsonrpc_error(), id))
    }

    #[inline]
    pub fn log(&self) {
        if self.is_client_error() {
            warn!("Rejected request ({}): {}", self.code(), self);
        } else {
            error!("Server error: {}", self);
        }
    }
}

/// Turns handler failures into JSON-RPC error responses
pub struct ErrorHandler;

impl ErrorHandler {
    #[inline]
    pub fn handle_error(error: &anyhow::Error, id: Option<RequestId>) -> JsonRpcMessage {
        if let Some(mcp_error) = error.downcast_ref::<McpError>() {
            mcp_error.log();
            return mcp_error.to_error_response(id);
        }

        error!("Unexpected error: {:#}", error);
        McpError::InternalError {
            message: format!("{:#}", error),
        }
        .to_error_response(id)
    }
}

pub type McpResult<T> = Result<T, McpError>;
