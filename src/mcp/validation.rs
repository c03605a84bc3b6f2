//! JSON Schema checks for incoming messages and tool arguments.
//!
//! Envelope and method-parameter schemas are compiled once at startup;
//! each registered tool adds its own `inputSchema` under `tool:{name}`.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use anyhow::{Result, anyhow};
use jsonschema::{Draft, JSONSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::debug;

const REQUEST: &str = "jsonrpc_request";
const RESPONSE: &str = "jsonrpc_response";
const ERROR_RESPONSE: &str = "jsonrpc_error_response";
const NOTIFICATION: &str = "jsonrpc_notification";

/// Compiled schemas keyed by name
#[derive(Debug)]
pub struct McpValidator {
    schemas: HashMap<String, JSONSchema>,
}

fn request_id_schema(nullable: bool) -> Value {
    let mut kinds = vec![json!({"type": "string"}), json!({"type": "integer"})];
    if nullable {
        kinds.push(json!({"type": "null"}));
    }
    json!({ "oneOf": kinds })
}

/// A `jsonrpc: "2.0"` object with the given extra members
fn envelope(members: Value, required: &[&str]) -> Value {
    let mut properties = Map::new();
    properties.insert("jsonrpc".to_string(), json!({"type": "string", "const": "2.0"}));
    if let Value::Object(extra) = members {
        properties.extend(extra);
    }

    let mut required_keys = vec!["jsonrpc"];
    required_keys.extend_from_slice(required);

    json!({
        "type": "object",
        "properties": properties,
        "required": required_keys,
    })
}

fn builtin_schemas() -> Vec<(&'static str, Value)> {
    vec![
        (
            REQUEST,
            envelope(
                json!({
                    "method": {"type": "string"},
                    "params": {"type": "object"},
                    "id": request_id_schema(false),
                }),
                &["method", "id"],
            ),
        ),
        (
            RESPONSE,
            envelope(
                json!({ "result": {}, "id": request_id_schema(false) }),
                &["result", "id"],
            ),
        ),
        (
            ERROR_RESPONSE,
            envelope(
                json!({
                    "error": {
                        "type": "object",
                        "properties": {
                            "code": {"type": "integer"},
                            "message": {"type": "string"},
                            "data": {}
                        },
                        "required": ["code", "message"]
                    },
                    "id": request_id_schema(true),
                }),
                &["error", "id"],
            ),
        ),
        (
            NOTIFICATION,
            envelope(
                json!({
                    "method": {"type": "string"},
                    "params": {"type": "object"},
                }),
                &["method"],
            ),
        ),
        (
            "initialize_params",
            json!({
                "type": "object",
                "properties": {
                    "protocolVersion": {"type": "string"},
                    "capabilities": {"type": "object"},
                    "clientInfo": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "version": {"type": "string"}
                        },
                        "required": ["name", "version"]
                    }
                },
                "required": ["protocolVersion", "capabilities", "clientInfo"]
            }),
        ),
        (
            "call_tool_params",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "arguments": {"type": "object"}
                },
                "required": ["name"]
            }),
        ),
        (
            "read_resource_params",
            json!({
                "type": "object",
                "properties": {"uri": {"type": "string"}},
                "required": ["uri"]
            }),
        ),
        (
            "get_prompt_params",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "arguments": {
                        "type": "object",
                        "additionalProperties": {"type": "string"}
                    }
                },
                "required": ["name"]
            }),
        ),
    ]
}

impl McpValidator {
    #[inline]
    pub fn new() -> Result<Self> {
        let mut validator = Self {
            schemas: HashMap::new(),
        };

        for (name, schema) in builtin_schemas() {
            validator.add_schema(name, &schema)?;
        }
        debug!("Compiled {} built-in JSON schemas", validator.schemas.len());

        Ok(validator)
    }

    /// Compile and register a schema under `name`, replacing any previous one
    #[inline]
    pub fn add_schema(&mut self, name: &str, schema: &Value) -> Result<()> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| anyhow!("Failed to compile schema '{}': {}", name, e))?;

        self.schemas.insert(name.to_string(), compiled);
        Ok(())
    }

    #[inline]
    pub fn add_tool_schema(&mut self, tool: &Tool) -> Result<()> {
        self.add_schema(&tool_schema_name(&tool.name), &tool.input_schema)
    }

    /// Check the params of `initialize`, `tools/call`, `resources/read`
    /// and `prompts/get`; other methods pass through unchecked
    #[inline]
    pub fn validate_method_params(&self, method: &str, params: &Value) -> McpResult<()> {
        let schema_name = match method {
            "initialize" => "initialize_params",
            "tools/call" => "call_tool_params",
            "resources/read" => "read_resource_params",
            "prompts/get" => "get_prompt_params",
            _ => return Ok(()),
        };

        self.validate_with_schema(schema_name, params)
            .map_err(|e| McpError::InvalidParameters {
                message: e.to_string(),
            })
    }

    #[inline]
    pub fn validate_tool_arguments(&self, tool: &str, arguments: &Value) -> McpResult<()> {
        self.validate_with_schema(&tool_schema_name(tool), arguments)
            .map_err(|e| McpError::InvalidToolParameters {
                tool: tool.to_string(),
                message: e.to_string(),
            })
    }

    /// Validate `value` against the schema registered as `schema_name`
    #[inline]
    pub fn validate_with_schema(&self, schema_name: &str, value: &Value) -> McpResult<()> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| McpError::InternalError {
                message: format!("Schema '{}' not found", schema_name),
            })?;

        schema.validate(value).map_err(|errors| {
            let details: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect();

            McpError::ValidationError {
                message: format!("'{}' rejected: {}", schema_name, details.join("; ")),
            }
        })
    }

    /// Classify a raw JSON value as one of the JSON-RPC message kinds
    ///
    /// The kind is chosen from the members present (`method` and `id` for a
    /// request, `result` or `error` for responses, `method` alone for a
    /// notification), then the envelope schema for that kind is enforced.
    #[inline]
    pub fn validate_raw_message(&self, value: &Value) -> Result<JsonRpcMessage> {
        let object = value.as_object().ok_or_else(|| McpError::InvalidRequest {
            message: "JSON-RPC message must be an object".to_string(),
        })?;

        let has = |key: &str| object.contains_key(key);

        let message = if has("method") && has("id") {
            JsonRpcMessage::Request(self.decode(REQUEST, value)?)
        } else if has("method") {
            JsonRpcMessage::Notification(self.decode(NOTIFICATION, value)?)
        } else if has("result") {
            JsonRpcMessage::Response(self.decode(RESPONSE, value)?)
        } else if has("error") {
            JsonRpcMessage::ErrorResponse(self.decode(ERROR_RESPONSE, value)?)
        } else {
            return Err(McpError::InvalidRequest {
                message: "Value does not match any known JSON-RPC message type".to_string(),
            }
            .into());
        };

        Ok(message)
    }

    fn decode<T: DeserializeOwned>(&self, schema_name: &str, value: &Value) -> McpResult<T> {
        self.validate_with_schema(schema_name, value)?;
        serde_json::from_value(value.clone()).map_err(|e| McpError::InvalidRequest {
            message: e.to_string(),
        })
    }

    #[inline]
    pub fn is_protocol_version_supported(&self, version: &str) -> bool {
        SUPPORTED_PROTOCOL_VERSIONS.contains(&version)
    }

    /// Supported versions, newest first
    #[inline]
    pub fn supported_protocol_versions(&self) -> Vec<&'static str> {
        SUPPORTED_PROTOCOL_VERSIONS.to_vec()
    }
}

fn tool_schema_name(tool: &str) -> String {
    format!("tool:{}", tool)
}
