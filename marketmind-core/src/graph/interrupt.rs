//! Human-in-the-loop interrupts.
//!
//! A node that needs external input before continuing returns
//! `Err(AgentError::Other(..))` wrapping a `GraphInterrupt`... in practice
//! nodes raise interrupts by calling `InterruptHandler::interrupt`, which
//! decides whether to pause the run or resume with a stored value.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Payload describing why a node paused and what it needs to resume.
#[derive(Clone, Debug, PartialEq)]
pub struct Interrupt {
    pub node_id: String,
    pub value: Value,
}

impl Interrupt {
    pub fn new(node_id: impl Into<String>, value: Value) -> Self {
        Self {
            node_id: node_id.into(),
            value,
        }
    }
}

/// Raised by a node via an `InterruptHandler` to pause the run for external input.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("graph interrupted at {}: {}", .0.node_id, .0.value)]
pub struct GraphInterrupt(pub Interrupt);

/// Decides how a compiled graph responds to an interrupt raised mid-run.
#[async_trait]
pub trait InterruptHandler: Send + Sync {
    /// Called when a node raises `interrupt`. Returning `Ok(value)` resumes the
    /// node with that value; returning `Err` propagates the interrupt up as a
    /// run failure, pausing the graph at `node_id`.
    async fn handle(&self, interrupt: &Interrupt) -> Result<Value, GraphInterrupt>;
}

/// Default handler: always propagates the interrupt (never auto-resumes).
pub struct DefaultInterruptHandler;

#[async_trait]
impl InterruptHandler for DefaultInterruptHandler {
    async fn handle(&self, interrupt: &Interrupt) -> Result<Value, GraphInterrupt> {
        Err(GraphInterrupt(interrupt.clone()))
    }
}
