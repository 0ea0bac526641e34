//! Run configuration: identifies a thread for checkpointing and a user for store isolation.

/// Configuration passed to `CompiledStateGraph::invoke` / `stream`.
///
/// `thread_id` is required whenever a checkpointer is attached; `user_id` is
/// the namespace root nodes typically use when reading/writing a `Store`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunnableConfig {
    /// Identifies the conversation/run being checkpointed.
    pub thread_id: Option<String>,
    /// Loads a specific checkpoint instead of the latest (time-travel / branch).
    pub checkpoint_id: Option<String>,
    /// Namespace for nested subgraphs; empty string at the top level.
    pub checkpoint_ns: String,
    /// Identifies the user/tenant for `Store` namespace isolation.
    pub user_id: Option<String>,
}

impl RunnableConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Default::default()
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_thread_id_and_defaults_rest() {
        let config = RunnableConfig::new("t1");
        assert_eq!(config.thread_id.as_deref(), Some("t1"));
        assert_eq!(config.checkpoint_ns, "");
        assert!(config.user_id.is_none());
    }
}
