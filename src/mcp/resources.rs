//! MCP Resources Implementation
//!
//! URI template matching and the greeting resource handler.

use crate::capabilities::greeting::{GREETING_URI_TEMPLATE, get_greeting};
use crate::mcp::errors::McpError;
use crate::mcp::protocol::*;
use crate::mcp::server::ResourceHandler;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A level 1 URI template such as `greeting://{name}`.
///
/// Each variable matches a (possibly empty) run of characters that does not
/// contain `/`. Matched values are returned verbatim without percent-decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    /// Parse a template string
    #[inline]
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = template;

        while !rest.is_empty() {
            match rest.find('{') {
                Some(0) => {
                    let end = rest
                        .find('}')
                        .ok_or_else(|| anyhow!("Unclosed variable in URI template '{}'", template))?;
                    let name = rest.get(1..end).unwrap_or_default();
                    if name.is_empty() || name.contains('{') {
                        bail!("Invalid variable name in URI template '{}'", template);
                    }
                    if matches!(segments.last(), Some(Segment::Variable(_))) {
                        bail!("Adjacent variables in URI template '{}'", template);
                    }
                    segments.push(Segment::Variable(name.to_string()));
                    rest = rest.get(end + 1..).unwrap_or_default();
                }
                Some(start) => {
                    let literal = rest.get(..start).unwrap_or_default();
                    if literal.contains('}') {
                        bail!("Unmatched '}}' in URI template '{}'", template);
                    }
                    segments.push(Segment::Literal(literal.to_string()));
                    rest = rest.get(start..).unwrap_or_default();
                }
                None => {
                    if rest.contains('}') {
                        bail!("Unmatched '}}' in URI template '{}'", template);
                    }
                    segments.push(Segment::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// Names of the template variables, in order of appearance
    #[inline]
    pub fn variables(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Variable(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Match a concrete URI, returning the captured variables on success
    #[inline]
    pub fn match_uri(&self, uri: &str) -> Option<HashMap<String, String>> {
        let mut captures = HashMap::new();
        let mut rest = uri;
        let mut segments = self.segments.iter().peekable();

        while let Some(segment) = segments.next() {
            match segment {
                Segment::Literal(literal) => {
                    rest = rest.strip_prefix(literal.as_str())?;
                }
                Segment::Variable(name) => {
                    let end = match segments.peek() {
                        Some(Segment::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let value = rest.get(..end)?;
                    if value.contains('/') {
                        return None;
                    }
                    captures.insert(name.clone(), value.to_string());
                    rest = rest.get(end..)?;
                }
            }
        }

        rest.is_empty().then_some(captures)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for UriTemplate {
    type Err = anyhow::Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for UriTemplate {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Greeting resource handler
pub struct GreetingHandler;

impl GreetingHandler {
    /// Create the greeting resource template definition
    #[inline]
    pub fn template_definition() -> ResourceTemplate {
        ResourceTemplate {
            uri_template: GREETING_URI_TEMPLATE.to_string(),
            name: "get_greeting".to_string(),
            description: Some("Get a personalized greeting.".to_string()),
            mime_type: Some("text/plain".to_string()),
        }
    }
}

#[async_trait]
impl ResourceHandler for GreetingHandler {
    #[inline]
    async fn handle(
        &self,
        uri: &str,
        variables: &HashMap<String, String>,
    ) -> Result<ReadResourceResult> {
        let name = variables.get("name").ok_or_else(|| McpError::ResourceNotFound {
            uri: uri.to_string(),
        })?;
        debug!("Reading greeting resource for '{}'", name);

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("text/plain".to_string()),
                text: get_greeting(name),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_greeting_template() {
        let template = UriTemplate::parse(GREETING_URI_TEMPLATE).expect("template parses");

        assert_eq!(template.variables(), vec!["name"]);
        assert_eq!(template.to_string(), GREETING_URI_TEMPLATE);

        let parsed: UriTemplate = GREETING_URI_TEMPLATE.parse().expect("template parses");
        assert_eq!(parsed, template);
        assert_eq!(parsed.as_str(), "greeting://{name}");
    }

    #[test]
    fn match_extracts_variable_verbatim() {
        let template = UriTemplate::parse("greeting://{name}").expect("template parses");

        let captures = template
            .match_uri("greeting://Ada Lovelace")
            .expect("uri matches");
        assert_eq!(captures["name"], "Ada Lovelace");

        let captures = template.match_uri("greeting://").expect("empty name matches");
        assert_eq!(captures["name"], "");
    }

    #[test]
    fn match_rejects_other_schemes_and_nested_paths() {
        let template = UriTemplate::parse("greeting://{name}").expect("template parses");

        assert!(template.match_uri("farewell://Alice").is_none());
        assert!(template.match_uri("greeting://Alice/extra").is_none());
    }

    #[test]
    fn match_multiple_variables() {
        let template =
            UriTemplate::parse("users://{id}/posts/{post}.json").expect("template parses");

        let captures = template
            .match_uri("users://42/posts/hello.json")
            .expect("uri matches");
        assert_eq!(captures["id"], "42");
        assert_eq!(captures["post"], "hello");

        assert!(template.match_uri("users://42/posts/hello.txt").is_none());
    }

    #[test]
    fn parse_rejects_malformed_templates() {
        assert!(UriTemplate::parse("greeting://{name").is_err());
        assert!(UriTemplate::parse("greeting://{}").is_err());
        assert!(UriTemplate::parse("greeting://name}").is_err());
        assert!(UriTemplate::parse("pair://{a}{b}").is_err());
    }

    #[tokio::test]
    async fn greeting_handler_reads_text() {
        let mut variables = HashMap::new();
        variables.insert("name".to_string(), "Alice".to_string());

        let result = GreetingHandler
            .handle("greeting://Alice", &variables)
            .await
            .expect("greeting resolves");

        assert_eq!(result.contents.len(), 1);
        assert_eq!(result.contents[0].uri, "greeting://Alice");
        assert_eq!(
            result.contents[0].text,
            "Hello, Alice! Welcome to our Railway-deployed MCP server with HTTP streaming!"
        );
    }
}
