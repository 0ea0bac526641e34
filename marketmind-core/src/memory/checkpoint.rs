//! Checkpoint data model: a versioned snapshot of graph state plus its metadata.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Current on-disk checkpoint schema version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Task id marking a write that recorded a node error.
pub const ERROR: &str = "__error__";
/// Task id marking a write that triggered an interrupt.
pub const INTERRUPT: &str = "__interrupt__";
/// Task id marking a write supplied to resume an interrupted run.
pub const RESUME: &str = "__resume__";
/// Task id marking a write that scheduled a future task.
pub const SCHEDULED: &str = "__scheduled__";

/// Per-channel version counters, bumped each time a channel is written.
pub type ChannelVersions = HashMap<String, u64>;

/// What triggered a checkpoint to be written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointSource {
    /// The initial state supplied to `invoke`/`stream`.
    Input,
    /// A normal step of the run loop.
    Loop,
    /// An out-of-band state update (e.g. human edit between steps).
    Update,
    /// Forked from an earlier checkpoint (time-travel branch).
    Fork,
}

/// A write pending application, recorded alongside a checkpoint for replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub task_id: String,
    pub channel: String,
    pub value: serde_json::Value,
}

/// Metadata describing why and when a checkpoint was written.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    pub step: i64,
    pub created_at: Option<SystemTime>,
    pub parents: HashMap<String, String>,
}

/// A single checkpoint: the full state plus bookkeeping needed to resume or branch.
#[derive(Clone, Debug)]
pub struct Checkpoint<S> {
    pub v: u32,
    pub id: String,
    pub ts: String,
    pub channel_values: S,
    pub channel_versions: ChannelVersions,
    pub versions_seen: HashMap<String, HashMap<String, u64>>,
    pub updated_channels: Option<Vec<String>>,
    pub pending_sends: Vec<PendingWrite>,
    pub metadata: CheckpointMetadata,
}

impl<S> Checkpoint<S> {
    /// Builds a fresh checkpoint for `state`, stamped with the current time.
    pub fn new(id: impl Into<String>, state: S, metadata: CheckpointMetadata) -> Self {
        Self {
            v: CHECKPOINT_VERSION,
            id: id.into(),
            ts: chrono::Utc::now().to_rfc3339(),
            channel_values: state,
            channel_versions: ChannelVersions::new(),
            versions_seen: HashMap::new(),
            updated_channels: None,
            pending_sends: Vec::new(),
            metadata,
        }
    }
}

/// A checkpoint summary as returned by `Checkpointer::list`.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}

/// A full checkpoint plus the config needed to address it and its parent.
#[derive(Clone, Debug)]
pub struct CheckpointTuple<S> {
    pub config: crate::memory::config::RunnableConfig,
    pub checkpoint: Checkpoint<S>,
    pub metadata: CheckpointMetadata,
    pub parent_config: Option<crate::memory::config::RunnableConfig>,
}

/// Maps the reserved pseudo-channel names to stable sort indices, so pending
/// writes for errors/interrupts/resumes/scheduled tasks sort before normal
/// channel writes regardless of insertion order.
pub fn writes_idx_map() -> HashMap<&'static str, i64> {
    [(ERROR, -1), (SCHEDULED, -2), (INTERRUPT, -3), (RESUME, -4)]
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checkpoint_uses_current_version() {
        let metadata = CheckpointMetadata {
            source: CheckpointSource::Input,
            step: 0,
            created_at: None,
            parents: HashMap::new(),
        };
        let checkpoint = Checkpoint::new("c1", 42i32, metadata);
        assert_eq!(checkpoint.v, CHECKPOINT_VERSION);
        assert_eq!(checkpoint.channel_values, 42);
    }

    #[test]
    fn writes_idx_map_orders_reserved_channels_before_any_real_channel() {
        let map = writes_idx_map();
        assert!(map[ERROR] < 0);
        assert!(map[SCHEDULED] < map[ERROR]);
    }
}
