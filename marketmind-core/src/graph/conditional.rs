//! Conditional routing: choose the next node from a function of the state.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// A routing function: inspects state, returns a routing key.
///
/// The key is either a node id directly, or a key to look up in a `path_map`.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional edge attached to a source node: routing function plus optional path map.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub path: ConditionalRouterFn<S>,
    pub path_map: Option<HashMap<String, String>>,
}

impl<S> ConditionalRouter<S> {
    pub fn new(path: ConditionalRouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id for `state`: calls `path`, then looks the
    /// result up in `path_map` when present (falling back to the key itself
    /// if the map doesn't contain it).
    pub fn resolve(&self, state: &S) -> String {
        let key = (self.path)(state);
        match &self.path_map {
            Some(map) => map.get(&key).cloned().unwrap_or(key),
            None => key,
        }
    }
}

/// What a source node's outgoing edge resolves to once compiled.
#[derive(Clone)]
pub enum NextEntry<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Always goes to the named node (or `END`).
    Unconditional(String),
    /// Resolved at runtime from the updated state.
    Conditional(ConditionalRouter<S>),
}
