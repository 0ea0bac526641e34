//! Mock LLM for tests.
//!
//! Returns fixed assistant content and tool_calls, with an optional stateful
//! mode for multi-turn scripts (tool_calls on the first invoke, plain text on
//! the rest). No network access, no tokens spent.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;
use crate::state::ToolCall;
use crate::stream::MessageChunk;

/// Fixed-response LLM stand-in.
///
/// `call_count` being `Some` enables stateful mode: the first `invoke()`
/// returns `content`/`tool_calls`, every later call returns `second_content`
/// (or `content` if unset) with no tool calls.
pub struct MockLlm {
    content: String,
    tool_calls: Vec<ToolCall>,
    call_count: Option<AtomicUsize>,
    second_content: Option<String>,
    stream_by_char: AtomicBool,
}

impl MockLlm {
    /// Fixed content, no tool calls. The common case for debate/risk/summary nodes.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
            call_count: None,
            second_content: None,
            stream_by_char: AtomicBool::new(false),
        }
    }

    /// Fixed content and tool_calls.
    pub fn new(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            call_count: None,
            second_content: None,
            stream_by_char: AtomicBool::new(false),
        }
    }

    /// First call returns `tool_calls`; every later call returns `second_content` with none.
    pub fn first_tools_then_end(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        second_content: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            call_count: Some(AtomicUsize::new(0)),
            second_content: Some(second_content.into()),
            stream_by_char: AtomicBool::new(false),
        }
    }

    /// Send each character of the content as a separate stream chunk, for testing
    /// incremental consumers.
    pub fn with_stream_by_char(self) -> Self {
        self.stream_by_char.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let (content, tool_calls) = match &self.call_count {
            Some(c) => {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    (self.content.clone(), self.tool_calls.clone())
                } else {
                    (
                        self.second_content.as_deref().unwrap_or(&self.content).to_string(),
                        vec![],
                    )
                }
            }
            None => (self.content.clone(), self.tool_calls.clone()),
        };
        Ok(LlmResponse {
            content,
            tool_calls,
            usage: None,
        })
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.invoke(messages).await?;

        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                if self.stream_by_char.load(Ordering::SeqCst) {
                    for c in response.content.chars() {
                        let _ = tx.send(MessageChunk { content: c.to_string() }).await;
                    }
                } else {
                    let _ = tx
                        .send(MessageChunk {
                            content: response.content.clone(),
                        })
                        .await;
                }
            }
        }

        Ok(response)
    }
}
