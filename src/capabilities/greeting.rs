/// URI template the greeting is published under
pub const GREETING_URI_TEMPLATE: &str = "greeting://{name}";

/// Get a personalized greeting
#[inline]
pub fn get_greeting(name: &str) -> String {
    format!("Hello, {name}! Welcome to our Railway-deployed MCP server with HTTP streaming!")
}
