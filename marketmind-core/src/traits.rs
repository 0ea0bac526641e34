//! Core `Agent` trait: state in, state out.
//!
//! Any `Agent` can be used as a `Node<Agent::State>` in a `StateGraph` via the
//! blanket impl below; it always returns `Next::Continue`, leaving routing to
//! the graph's linear edges or conditional edges keyed on the updated state.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AgentError;
use crate::graph::{Next, Node};

/// One step of a larger run: receive state, return updated state.
#[async_trait]
pub trait Agent: Send + Sync {
    /// State type this agent reads and writes.
    type State: Clone + Send + Sync + Debug + 'static;

    /// Name used as the node id when added to a `StateGraph`.
    fn name(&self) -> &str;

    /// Runs one step, returning the updated state.
    async fn run(&self, state: Self::State) -> Result<Self::State, AgentError>;
}

#[async_trait]
impl<A> Node<A::State> for A
where
    A: Agent,
{
    fn id(&self) -> &str {
        self.name()
    }

    async fn run(&self, state: A::State) -> Result<(A::State, Next), AgentError> {
        let state = Agent::run(self, state).await?;
        Ok((state, Next::Continue))
    }
}
