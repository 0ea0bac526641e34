//! The progress broadcaster (C7): one logical topic per task_id, fed by
//! `TaskLifecycleManager`'s [`marketmind_tasks::ProgressSink`] and drained by
//! WebSocket subscribers at `/analysis/ws/task/{task_id}`.
//!
//! Per-subscriber order is preserved (each gets its own broadcast receiver
//! cursor); cross-subscriber simultaneity is not guaranteed. Events are not
//! persisted — a late subscriber starts from "now", since a topic with no
//! receivers simply drops what it sends.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;

use marketmind_tasks::ProgressSink;

const CHANNEL_CAPACITY: usize = 256;

/// Server -> client progress message, matching the WebSocket wire shape.
#[derive(Clone, Debug, Serialize)]
pub struct ProgressWireEvent {
    pub task_id: String,
    pub node: String,
    pub display_name: String,
    pub progress: f64,
    pub message: Option<String>,
    pub ts: chrono::DateTime<chrono::Utc>,
}

pub struct ProgressBroadcaster {
    topics: Mutex<HashMap<String, broadcast::Sender<ProgressWireEvent>>>,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self { topics: Mutex::new(HashMap::new()) }
    }

    /// Subscribes to `task_id`'s topic, creating it if this is the first
    /// subscriber (or the first publish, whichever comes first).
    pub fn subscribe(&self, task_id: &str) -> broadcast::Receiver<ProgressWireEvent> {
        let mut topics = self.topics.lock().unwrap();
        topics
            .entry(task_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish(&self, event: ProgressWireEvent) {
        let mut topics = self.topics.lock().unwrap();
        let sender = topics
            .entry(event.task_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        // No receivers is not an error: a topic with nobody listening yet
        // (or anymore) just drops the event, per "late subscriber starts
        // from now".
        let _ = sender.send(event);
    }

    /// Drops a task's topic once it's known nobody will subscribe again.
    /// Not required for correctness (channels are cheap), but keeps the map
    /// from growing unbounded across a long-running process.
    pub fn forget(&self, task_id: &str) {
        self.topics.lock().unwrap().remove(task_id);
    }
}

impl ProgressSink for ProgressBroadcaster {
    fn push(&self, task_id: &str, node_display_name: &str, percent: f64) {
        self.publish(ProgressWireEvent {
            task_id: task_id.to_string(),
            node: node_display_name.to_string(),
            display_name: node_display_name.to_string(),
            progress: percent,
            message: None,
            ts: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_before_subscribe_is_silently_dropped() {
        let b = ProgressBroadcaster::new();
        b.push("t1", "analyst", 10.0);
        let mut rx = b.subscribe("t1");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn subscriber_receives_events_published_after_subscribe() {
        let b = ProgressBroadcaster::new();
        let mut rx = b.subscribe("t1");
        b.push("t1", "analyst", 25.0);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.task_id, "t1");
        assert_eq!(event.progress, 25.0);
    }

    #[test]
    fn topics_are_independent_per_task() {
        let b = ProgressBroadcaster::new();
        let mut rx_a = b.subscribe("a");
        let _rx_b = b.subscribe("b");
        b.push("b", "node", 50.0);
        assert!(rx_a.try_recv().is_err());
    }
}
