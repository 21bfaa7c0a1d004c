use chrono::Local;

use crate::models::{ConversationMessage, MessageRole};
use crate::pipeline::completion::WireMessage;

/// Append-only message history of one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<ConversationMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Returns its ordinal.
    pub fn append(&mut self, role: MessageRole, content: &str, internal: bool) -> usize {
        let ordinal = self.messages.len();
        self.messages.push(ConversationMessage {
            ordinal,
            role,
            content: content.to_string(),
            timestamp: Local::now().naive_local(),
            internal,
        });
        ordinal
    }

    pub fn add_assistant_message(&mut self, content: &str) -> usize {
        self.append(MessageRole::Assistant, content, false)
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Messages a chat view should render.
    pub fn visible(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter().filter(|m| !m.internal)
    }

    /// Full history in request form, internal prompts included.
    pub fn wire_history(&self) -> Vec<WireMessage> {
        self.messages.iter().map(WireMessage::from).collect()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_append_order() {
        let mut log = ConversationLog::new();
        assert_eq!(log.append(MessageRole::User, "first", false), 0);
        assert_eq!(log.add_assistant_message("second"), 1);
        assert_eq!(log.append(MessageRole::User, "third", true), 2);
        assert_eq!(log.messages()[2].ordinal, 2);
    }

    #[test]
    fn internal_prompts_are_hidden_but_sent() {
        let mut log = ConversationLog::new();
        log.append(MessageRole::User, "Please generate JSON content", true);
        log.add_assistant_message("{}");

        assert_eq!(log.visible().count(), 1);
        let wire = log.wire_history();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, MessageRole::User);
        assert_eq!(wire[0].content, "Please generate JSON content");
    }

    #[test]
    fn last_returns_latest_message() {
        let mut log = ConversationLog::new();
        assert!(log.last().is_none());
        log.append(MessageRole::User, "hello", false);
        assert_eq!(log.last().unwrap().content, "hello");
        assert_eq!(log.len(), 1);
    }
}
