//! Capability registry
//!
//! The pure functions behind every exposed capability, and the declaration
//! that binds each of them to a name and parameter contract on the MCP server.

pub mod bmi;
pub mod greeting;
pub mod question;
pub mod weather;

#[cfg(test)]
mod tests;

pub use bmi::{BmiCategory, BmiResult, calculate_bmi};
pub use greeting::get_greeting;
pub use question::ask_question;
pub use weather::{WeatherReport, get_weather};

use crate::config::ServerConfig;
use crate::mcp::McpServer;
use crate::mcp::prompts::AskQuestionHandler;
use crate::mcp::resources::GreetingHandler;
use crate::mcp::tools::{CalculateBmiHandler, GetWeatherHandler};
use anyhow::{Context, Result};

/// Build the MCP server with every capability registered
#[inline]
pub fn build_server(config: &ServerConfig) -> Result<McpServer> {
    McpServer::builder(config.name.clone(), env!("CARGO_PKG_VERSION"))
        .instructions(config.instructions.clone())
        .session_idle_timeout(config.session_idle_timeout())
        .tool(GetWeatherHandler::tool_definition(), GetWeatherHandler)
        .tool(CalculateBmiHandler::tool_definition(), CalculateBmiHandler)
        .resource_template(GreetingHandler::template_definition(), GreetingHandler)
        .prompt(AskQuestionHandler::prompt_definition(), AskQuestionHandler)
        .build()
        .context("Failed to register capabilities")
}
