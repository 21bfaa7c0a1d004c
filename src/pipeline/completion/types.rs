use serde::{Deserialize, Serialize};

use super::CompletionError;
use crate::models::{ConversationMessage, MessageRole, TokenUsage};

/// One `{role, content}` entry of a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: MessageRole,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationMessage> for WireMessage {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request half of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<WireMessage>,
}

/// Response half of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// Completion provider abstraction (allows mocking).
///
/// Implementations convert every provider failure into `CompletionError`;
/// they never panic into the caller.
pub trait CompletionClient: Send + Sync {
    fn get_completion(
        &self,
        system_prompt: &str,
        history: &[WireMessage],
    ) -> Result<CompletionResponse, CompletionError>;

    /// Run a request built ahead of time.
    fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        self.get_completion(&request.system_prompt, &request.messages)
    }
}
