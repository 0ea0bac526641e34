//! Per-run context passed to `Node::run_with_context`.
//!
//! Lighter than `Runtime<C, S>`: no caller-supplied context value, just what
//! the compiled graph itself carries (config, store, stream writer).

use std::fmt::Debug;
use std::sync::Arc;

use crate::memory::{RunnableConfig, Store};
use crate::stream::StreamEvent;

/// Context a compiled graph hands each node alongside its state.
pub struct RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub config: RunnableConfig,
    pub store: Option<Arc<dyn Store>>,
    pub stream_writer: Option<Arc<dyn Fn(StreamEvent<S>) + Send + Sync>>,
}

impl<S> RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(config: RunnableConfig) -> Self {
        Self {
            config,
            store: None,
            stream_writer: None,
        }
    }

    pub fn with_store(mut self, store: Option<Arc<dyn Store>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_stream_writer(mut self, writer: Option<Arc<dyn Fn(StreamEvent<S>) + Send + Sync>>) -> Self {
        self.stream_writer = writer;
        self
    }

    /// Emits an event on the stream writer, if one is attached. No-op otherwise.
    pub fn emit(&self, event: StreamEvent<S>) {
        if let Some(writer) = &self.stream_writer {
            writer(event);
        }
    }
}

impl<S> Debug for RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("store", &self.store.is_some())
            .field("stream_writer", &self.stream_writer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_is_noop_without_writer() {
        let ctx: RunContext<i32> = RunContext::new(RunnableConfig::default());
        ctx.emit(StreamEvent::Values(1));
    }

    #[test]
    fn emit_invokes_attached_writer() {
        use std::sync::atomic::{AtomicBool, Ordering};
        let called = Arc::new(AtomicBool::new(false));
        let called2 = called.clone();
        let ctx: RunContext<i32> = RunContext::new(RunnableConfig::default())
            .with_stream_writer(Some(Arc::new(move |_event| {
                called2.store(true, Ordering::SeqCst);
            })));
        ctx.emit(StreamEvent::Values(1));
        assert!(called.load(Ordering::SeqCst));
    }
}
