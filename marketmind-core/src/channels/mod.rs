//! State merge channels.
//!
//! The graph engine itself only needs one concept here: how to fold a node's
//! returned state back into the running state (`StateUpdater`). The richer
//! per-field channel types (topics, barriers, aggregates) this module grew
//! for other use cases aren't needed by the analysis graph, which merges
//! whole-state or per-field via [`updater::FieldBasedUpdater`].

mod updater;

pub use updater::{boxed_updater, BoxedStateUpdater, FieldBasedUpdater, ReplaceUpdater, StateUpdater};
