//! In-memory `Checkpointer`. Not persistent; for dev and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use crate::memory::checkpointer::{CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;

/// Keyed by (thread_id, checkpoint_ns); holds every checkpoint ever written
/// for that key, in insertion order, so `list` can paginate and `get_tuple`
/// can resolve a specific `checkpoint_id` or fall back to the latest.
pub struct MemorySaver<S> {
    checkpoints: Arc<RwLock<HashMap<(String, String), Vec<(Checkpoint<S>, CheckpointMetadata)>>>>,
}

impl<S> MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            checkpoints: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn thread_id_required(config: &RunnableConfig) -> Result<String, CheckpointError> {
        config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)
    }
}

impl<S> Default for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let key = (thread_id, config.checkpoint_ns.clone());
        let mut guard = self.checkpoints.write().await;
        guard
            .entry(key)
            .or_default()
            .push((checkpoint.clone(), checkpoint.metadata.clone()));
        Ok(checkpoint.id.clone())
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let key = (thread_id, config.checkpoint_ns.clone());
        let guard = self.checkpoints.read().await;
        let Some(entries) = guard.get(&key) else {
            return Ok(None);
        };
        let found = match &config.checkpoint_id {
            Some(id) => entries.iter().find(|(c, _)| &c.id == id),
            None => entries.last(),
        };
        Ok(found.cloned())
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let key = (thread_id, config.checkpoint_ns.clone());
        let guard = self.checkpoints.read().await;
        let mut items: Vec<CheckpointListItem> = guard
            .get(&key)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(c, m)| CheckpointListItem {
                        checkpoint_id: c.id.clone(),
                        metadata: m.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(a) = after {
            if let Some(pos) = items.iter().position(|i| i.checkpoint_id == a) {
                items = items[pos + 1..].to_vec();
            }
        }
        if let Some(b) = before {
            if let Some(pos) = items.iter().position(|i| i.checkpoint_id == b) {
                items = items[..pos].to_vec();
            }
        }
        if let Some(n) = limit {
            let len = items.len();
            if len > n {
                items = items[len - n..].to_vec();
            }
        }
        Ok(items)
    }
}
