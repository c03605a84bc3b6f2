//! MCP Prompts Implementation

use crate::capabilities::question::{DEFAULT_STYLE, ask_question, styles};
use crate::mcp::errors::McpError;
use crate::mcp::protocol::*;
use crate::mcp::server::PromptHandler;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Question prompt handler
pub struct AskQuestionHandler;

impl AskQuestionHandler {
    /// Create the ask_question prompt definition
    #[inline]
    pub fn prompt_definition() -> Prompt {
        let style_names: Vec<&str> = styles().collect();

        Prompt {
            name: "ask_question".to_string(),
            description: Some("Generate a question prompt about a topic.".to_string()),
            arguments: vec![
                PromptArgument {
                    name: "topic".to_string(),
                    description: Some("Subject to ask about".to_string()),
                    required: true,
                },
                PromptArgument {
                    name: "style".to_string(),
                    description: Some(format!(
                        "Phrasing style, one of {} (default: {})",
                        style_names.join(", "),
                        DEFAULT_STYLE
                    )),
                    required: false,
                },
            ],
        }
    }
}

#[async_trait]
impl PromptHandler for AskQuestionHandler {
    #[inline]
    async fn handle(&self, arguments: HashMap<String, String>) -> Result<GetPromptResult> {
        let topic = arguments
            .get("topic")
            .ok_or_else(|| McpError::InvalidParameters {
                message: "Missing required argument 'topic' for prompt 'ask_question'".to_string(),
            })?;
        let style = arguments
            .get("style")
            .map_or(DEFAULT_STYLE, String::as_str);
        debug!("Rendering question prompt: topic='{}', style='{}'", topic, style);

        Ok(GetPromptResult {
            description: Some("Generate a question prompt about a topic.".to_string()),
            messages: vec![PromptMessage {
                role: Role::User,
                content: ToolContent::Text {
                    text: ask_question(topic, style),
                },
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn ask_question_prompt_definition() {
        let prompt = AskQuestionHandler::prompt_definition();

        assert_eq!(prompt.name, "ask_question");
        assert_eq!(prompt.arguments.len(), 2);
        assert_eq!(prompt.arguments[0].name, "topic");
        assert!(prompt.arguments[0].required);
        assert_eq!(prompt.arguments[1].name, "style");
        assert!(!prompt.arguments[1].required);
        assert!(
            prompt.arguments[1]
                .description
                .as_deref()
                .expect("has description")
                .contains("academic")
        );
    }

    #[tokio::test]
    async fn renders_single_user_message() {
        let result = AskQuestionHandler
            .handle(arguments(&[("topic", "space travel"), ("style", "academic")]))
            .await
            .expect("prompt renders");

        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, Role::User);
        assert_eq!(
            result.messages[0].content,
            ToolContent::Text {
                text: "Could you provide detailed information regarding space travel? I'm really interested to learn more!".to_string()
            }
        );
    }

    #[tokio::test]
    async fn style_defaults_to_friendly() {
        let result = AskQuestionHandler
            .handle(arguments(&[("topic", "rust")]))
            .await
            .expect("prompt renders");

        assert_eq!(
            result.messages[0].content,
            ToolContent::Text {
                text: "Could you please tell me more about rust? I'm really interested to learn more!".to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_topic_is_invalid_params() {
        let error = AskQuestionHandler
            .handle(HashMap::new())
            .await
            .expect_err("topic is required");

        assert!(matches!(
            error.downcast_ref::<McpError>(),
            Some(McpError::InvalidParameters { .. })
        ));
    }
}
