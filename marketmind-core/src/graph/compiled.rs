//! Compiled, executable state graph: produced by `StateGraph::compile*`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::channels::BoxedStateUpdater;
use crate::error::AgentError;
use crate::graph::conditional::NextEntry;
use crate::graph::interrupt::InterruptHandler;
use crate::graph::logging::{log_graph_complete, log_graph_error, log_graph_start, log_state_update};
use crate::graph::node::Node;
use crate::graph::node_middleware::NodeMiddleware;
use crate::graph::retry::RetryPolicy;
use crate::graph::run_context::RunContext;
use crate::graph::{Next, END};
use crate::memory::{Checkpoint, CheckpointMetadata, CheckpointSource, Checkpointer, RunnableConfig, Store};
use crate::stream::StreamEvent;

/// Safety valve against runaway conditional-edge cycles; no real analysis
/// graph comes close to this many steps.
const MAX_STEPS: usize = 1000;

/// An executable graph produced by `StateGraph::compile()` (or one of its
/// `compile_with_*` variants). Immutable; call `invoke` or `stream` to run it.
pub struct CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub(crate) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(crate) first_node_id: String,
    pub(crate) edge_order: Vec<String>,
    pub(crate) next_map: HashMap<String, NextEntry<S>>,
    pub(crate) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(crate) store: Option<Arc<dyn Store>>,
    pub(crate) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    pub(crate) state_updater: BoxedStateUpdater<S>,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) interrupt_handler: Option<Arc<dyn InterruptHandler>>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Runs the graph to completion, returning the final state.
    ///
    /// If a checkpointer is attached and `config.thread_id` is set, the final
    /// state is saved as a checkpoint after the run.
    pub async fn invoke(&self, state: S, config: &RunnableConfig) -> Result<S, AgentError> {
        self.run(state, config, None).await
    }

    /// Like `invoke`, but emits a `StreamEvent` after every node via `writer`.
    pub async fn stream(
        &self,
        state: S,
        config: &RunnableConfig,
        writer: mpsc::UnboundedSender<StreamEvent<S>>,
    ) -> Result<S, AgentError> {
        self.run(state, config, Some(writer)).await
    }

    async fn run(
        &self,
        mut state: S,
        config: &RunnableConfig,
        writer: Option<mpsc::UnboundedSender<StreamEvent<S>>>,
    ) -> Result<S, AgentError> {
        let thread_id = config.thread_id.clone();
        log_graph_start(thread_id.as_deref());
        let started = Instant::now();

        let mut current = self.first_node_id.clone();
        let mut steps = 0usize;
        let run_context: RunContext<S> = RunContext::new(config.clone()).with_store(self.store.clone());

        loop {
            if steps >= MAX_STEPS {
                let err = AgentError::Graph(format!("exceeded {MAX_STEPS} steps (possible cycle)"));
                log_graph_error(thread_id.as_deref(), &current, &err);
                return Err(err);
            }
            steps += 1;

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| AgentError::Graph(format!("node not found at runtime: {current}")))?
                .clone();

            let (next_state, next) = self
                .run_node_with_retry(&current, node, state.clone(), &run_context)
                .await?;

            let mut merged = state;
            self.state_updater.apply_update(&mut merged, &next_state);
            state = merged;

            log_state_update(&current, &next, &state);
            if let Some(writer) = &writer {
                let _ = writer.send(StreamEvent::Updates {
                    node_id: current.clone(),
                    state: state.clone(),
                });
            }

            let resolved = match next {
                Next::End => break,
                Next::Node(id) => id,
                Next::Continue => match self.next_map.get(&current) {
                    Some(NextEntry::Unconditional(to)) => to.clone(),
                    Some(NextEntry::Conditional(router)) => router.resolve(&state),
                    None => END.to_string(),
                },
            };

            if resolved == END {
                break;
            }
            current = resolved;
        }

        if let (Some(checkpointer), Some(tid)) = (&self.checkpointer, &thread_id) {
            let checkpoint = Checkpoint::new(
                uuid::Uuid::new_v4().to_string(),
                state.clone(),
                CheckpointMetadata {
                    source: CheckpointSource::Loop,
                    step: steps as i64,
                    created_at: Some(std::time::SystemTime::now()),
                    parents: HashMap::new(),
                },
            );
            let mut save_config = config.clone();
            save_config.thread_id = Some(tid.clone());
            checkpointer.put(&save_config, &checkpoint).await?;
        }

        log_graph_complete(thread_id.as_deref(), steps, started.elapsed());
        Ok(state)
    }

    async fn run_node_with_retry(
        &self,
        node_id: &str,
        node: Arc<dyn Node<S>>,
        state: S,
        ctx: &RunContext<S>,
    ) -> Result<(S, Next), AgentError> {
        let mut attempt = 0u32;
        loop {
            let result = self.run_node_once(node_id, node.clone(), state.clone(), ctx).await;
            match result {
                Ok(ok) => return Ok(ok),
                Err(err) if attempt < self.retry_policy.max_retries() => {
                    let delay = self.retry_policy.delay_for(attempt);
                    tracing::warn!(node_id, attempt, error = %err, "node failed, retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_node_once(
        &self,
        node_id: &str,
        node: Arc<dyn Node<S>>,
        state: S,
        ctx: &RunContext<S>,
    ) -> Result<(S, Next), AgentError> {
        match &self.middleware {
            Some(middleware) => {
                let inner: Box<
                    dyn FnOnce(
                            S,
                        ) -> std::pin::Pin<
                            Box<dyn std::future::Future<Output = Result<(S, Next), AgentError>> + Send>,
                        > + Send,
                > = Box::new(move |s: S| Box::pin(async move { node.run(s).await }));
                middleware.around_run(node_id, state, inner).await
            }
            None => node.run_with_context(state, ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StateGraph;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter(i32);

    struct Increment;

    #[async_trait]
    impl Node<Counter> for Increment {
        fn id(&self) -> &str {
            "increment"
        }
        async fn run(&self, state: Counter) -> Result<(Counter, Next), AgentError> {
            Ok((Counter(state.0 + 1), Next::Continue))
        }
    }

    #[tokio::test]
    async fn invoke_runs_linear_chain_to_completion() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("increment", Arc::new(Increment));
        graph.add_edge(crate::graph::START, "increment");
        graph.add_edge("increment", END);
        let compiled = graph.compile().unwrap();

        let result = compiled
            .invoke(Counter(0), &RunnableConfig::default())
            .await
            .unwrap();
        assert_eq!(result, Counter(1));
    }

    #[tokio::test]
    async fn invoke_follows_conditional_routing() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("increment", Arc::new(Increment));
        graph.add_edge(crate::graph::START, "increment");
        graph.add_conditional_edges(
            "increment",
            Arc::new(|s: &Counter| if s.0 < 3 { "increment".to_string() } else { END.to_string() }),
            None,
        );
        let compiled = graph.compile().unwrap();

        let result = compiled
            .invoke(Counter(0), &RunnableConfig::default())
            .await
            .unwrap();
        assert_eq!(result, Counter(3));
    }

    #[tokio::test]
    async fn invoke_checkpoints_final_state_when_configured() {
        use crate::memory::MemorySaver;

        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("increment", Arc::new(Increment));
        graph.add_edge(crate::graph::START, "increment");
        graph.add_edge("increment", END);
        let checkpointer: Arc<dyn Checkpointer<Counter>> = Arc::new(MemorySaver::new());
        let compiled = graph.compile_with_checkpointer(checkpointer.clone()).unwrap();

        let config = RunnableConfig::new("thread-1");
        compiled.invoke(Counter(0), &config).await.unwrap();

        let (saved, _) = checkpointer.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(saved.channel_values, Counter(1));
    }
}
