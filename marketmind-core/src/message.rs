//! Conversation message: system / user / assistant, plain text content.
//!
//! This mirrors the three roles every LLM chat API accepts. Tool call/result
//! plumbing for a single turn lives in [`crate::state::ToolCall`] and
//! [`crate::state::ToolResult`], not in `Message`.

use serde::{Deserialize, Serialize};

/// One turn in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum Message {
    System(String),
    User(String),
    Assistant(String),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User(content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant(content.into())
    }

    /// Text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Message::System(c) | Message::User(c) | Message::Assistant(c) => c,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Message::System(_) => "system",
            Message::User(_) => "user",
            Message::Assistant(_) => "assistant",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_role_and_content() {
        let m = Message::user("hello");
        assert_eq!(m.role(), "user");
        assert_eq!(m.content(), "hello");
    }

    #[test]
    fn serde_roundtrip() {
        let m = Message::assistant("answer");
        let json = serde_json::to_string(&m).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
