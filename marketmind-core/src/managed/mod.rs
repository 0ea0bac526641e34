//! Managed values injected into runtime context: runtime-owned, not part of state.
//!
//! `IsLastStep` is the only managed value the analysis graph currently needs
//! (bounding the generic agent's ReAct loop); the type is kept generic so
//! other runtime-managed values can be added the same way.

use std::fmt::Debug;

/// A value owned by the runtime rather than the graph state, injected before each node call.
pub trait ManagedValue: Clone + Send + Sync + Debug + 'static {}

/// Signals to a node that this is the final allowed step before the runtime forces
/// termination (used by the generic agent's bounded ReAct loop).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct IsLastStep(pub bool);

impl ManagedValue for IsLastStep {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_last_step_defaults_to_false() {
        assert_eq!(IsLastStep::default(), IsLastStep(false));
    }
}
