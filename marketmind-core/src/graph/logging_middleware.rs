//! Node middleware that logs start/complete/error around every node run.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Instant;

use crate::error::AgentError;
use crate::graph::logging::{log_node_complete, log_node_start};
use crate::graph::node_middleware::NodeMiddleware;
use crate::graph::Next;

/// Wraps every node's `run` with start/complete/error logging.
pub struct LoggingNodeMiddleware;

#[async_trait]
impl<S> NodeMiddleware<S> for LoggingNodeMiddleware
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: Box<
            dyn FnOnce(
                    S,
                ) -> std::pin::Pin<
                    Box<dyn std::future::Future<Output = Result<(S, Next), AgentError>> + Send>,
                > + Send,
        >,
    ) -> Result<(S, Next), AgentError> {
        log_node_start(node_id);
        let started = Instant::now();
        let result = inner(state).await;
        match &result {
            Ok(_) => log_node_complete(node_id, started.elapsed()),
            Err(e) => tracing::error!(node_id, error = %e, "node failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;

    #[tokio::test]
    async fn passes_state_and_result_through() {
        let middleware = LoggingNodeMiddleware;
        let result = middleware
            .around_run(
                "n1",
                42i32,
                Box::new(|s: i32| -> Pin<Box<dyn std::future::Future<Output = Result<(i32, Next), AgentError>> + Send>> {
                    Box::pin(async move { Ok((s + 1, Next::Continue)) })
                }),
            )
            .await
            .unwrap();
        assert_eq!(result.0, 43);
        assert_eq!(result.1, Next::Continue);
    }
}
