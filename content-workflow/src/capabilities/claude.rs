//! Generative text capability backed by the Claude agent SDK.
//!
//! Each invocation is a single-turn `query` with tools disabled. When the
//! request carries a schema it is appended to the system prompt and the
//! collected text is returned as [`GenerationOutput::Text`]; JSON extraction
//! and validation happen in the engine, not here.

use async_trait::async_trait;
use claude_agent_sdk::{query, ClaudeAgentOptions, ContentBlock, Message};
use content_workflow_sdk::log_debug;
use futures::StreamExt;

use super::{GenerationOutput, GenerationRequest, GenerativeTextCapability};
use crate::error::CapabilityError;

#[derive(Debug, Clone, Default)]
pub struct ClaudeTextCapability {
    max_turns: Option<u32>,
}

impl ClaudeTextCapability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    fn system_prompt(request: &GenerationRequest) -> Result<String, CapabilityError> {
        let mut prompt = request.system_prompt.clone();
        if let Some(schema) = &request.schema {
            let schema = serde_json::to_string_pretty(schema)
                .map_err(|e| CapabilityError::Malformed(e.to_string()))?;
            prompt.push_str(
                "\n\nIMPORTANT: Respond with a single JSON object that conforms to this JSON Schema. \
                 Output the JSON only, with no commentary.\n",
            );
            prompt.push_str(&schema);
        }
        Ok(prompt)
    }

    /// Configured model the agent options cannot select; the CLI's own
    /// model answers instead
    fn unapplied_model(request: &GenerationRequest) -> Option<&str> {
        let model = request.model.trim();
        (!model.is_empty()).then_some(model)
    }
}

#[async_trait]
impl GenerativeTextCapability for ClaudeTextCapability {
    async fn invoke(&self, request: GenerationRequest) -> Result<GenerationOutput, CapabilityError> {
        if let Some(model) = Self::unapplied_model(&request) {
            log_debug!(
                "{}: model `{}` not applied, using the Claude CLI default",
                request.purpose,
                model
            );
        }

        let options = ClaudeAgentOptions::builder()
            .system_prompt(Self::system_prompt(&request)?)
            .allowed_tools(vec![])
            .max_turns(self.max_turns.unwrap_or(1))
            .permission_mode(claude_agent_sdk::PermissionMode::BypassPermissions)
            .build();

        let stream = query(&request.user_prompt, Some(options))
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("{}: {}", request.purpose, e)))?;
        let mut stream = Box::pin(stream);

        let mut response_text = String::new();
        while let Some(message) = stream.next().await {
            match message.map_err(|e| CapabilityError::Transport(e.to_string()))? {
                Message::Assistant { message, .. } => {
                    for block in &message.content {
                        if let ContentBlock::Text { text } = block {
                            response_text.push_str(text);
                        }
                    }
                }
                Message::Result { .. } => break,
                _ => {}
            }
        }

        if response_text.trim().is_empty() {
            return Err(CapabilityError::Malformed(format!(
                "{}: model returned no text",
                request.purpose
            )));
        }
        Ok(GenerationOutput::Text(response_text))
    }
}
