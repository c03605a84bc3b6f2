//! MCP Tools Implementation
//!
//! Tool handlers exposing the weather and BMI capabilities.

use crate::capabilities::bmi::calculate_bmi;
use crate::capabilities::weather::{DEFAULT_CITY, get_weather};
use crate::mcp::errors::McpError;
use crate::mcp::protocol::*;
use crate::mcp::server::ToolHandler;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::debug;

/// Weather lookup tool handler
pub struct GetWeatherHandler;

/// BMI calculator tool handler
pub struct CalculateBmiHandler;

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    #[serde(default = "default_city")]
    city: String,
}

fn default_city() -> String {
    DEFAULT_CITY.to_string()
}

#[derive(Debug, Deserialize)]
struct BmiArgs {
    weight_kg: f64,
    height_m: f64,
}

impl GetWeatherHandler {
    /// Create the get_weather tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "get_weather".to_string(),
            description: Some("Get current weather for a city (simulated data).".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "City name (default: San Francisco)",
                        "default": DEFAULT_CITY
                    }
                },
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for GetWeatherHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args: WeatherArgs = parse_arguments(&params)?;
        debug!("Getting weather: city='{}'", args.city);

        json_result(&get_weather(&args.city))
    }
}

impl CalculateBmiHandler {
    /// Create the calculate_bmi tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "calculate_bmi".to_string(),
            description: Some(
                "Calculate BMI given weight in kg and height in meters.".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "weight_kg": {
                        "type": "number",
                        "description": "Body weight in kilograms"
                    },
                    "height_m": {
                        "type": "number",
                        "description": "Height in meters"
                    }
                },
                "required": ["weight_kg", "height_m"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for CalculateBmiHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args: BmiArgs = parse_arguments(&params)?;
        debug!(
            "Calculating BMI: weight_kg={}, height_m={}",
            args.weight_kg, args.height_m
        );

        // An invalid-input BMI is still a successful call; the error lives in the payload
        json_result(&calculate_bmi(args.weight_kg, args.height_m))
    }
}

fn parse_arguments<T: DeserializeOwned>(params: &CallToolParams) -> Result<T> {
    serde_json::from_value(params.arguments_value()).map_err(|e| {
        McpError::InvalidToolParameters {
            tool: params.name.clone(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Wrap a serializable value as both text and structured tool output
fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult> {
    let structured = serde_json::to_value(value)?;

    Ok(CallToolResult {
        content: vec![ToolContent::Text {
            text: serde_json::to_string_pretty(&structured)?,
        }],
        structured_content: Some(structured),
        is_error: Some(false),
    })
}
