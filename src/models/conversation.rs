use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::MessageRole;

/// One entry of a session's append-only conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// 0-based position in the session history.
    pub ordinal: usize,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: NaiveDateTime,
    /// Machine-authored prompt that a chat view should not render.
    #[serde(default)]
    pub internal: bool,
}
