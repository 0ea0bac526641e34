//! Agent record store: loads declarative analyst records from YAML phase
//! files, validates them, and derives the lookup/progress maps the graph
//! controller and progress channel need.
//!
//! Default records are embedded at compile time (canonical source:
//! `marketmind-core/records/*.yaml`) and used when no configured directory is
//! present, the same pattern the rest of this crate uses for default prompt
//! text.

mod derive;
mod load;
mod store;

pub use derive::{derive_icon, derive_internal_key, derive_node_label, derive_tool_category};
pub use load::{default_from_embedded, load_dir, LoadError};
pub use store::{AgentRecord, AgentRecordStore, ANALYST_PROGRESS_FLOOR, ANALYST_PROGRESS_CEILING};
