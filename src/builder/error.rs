//! Chart construction errors.

use thiserror::Error;

/// Structural violations detected when a chart is built.
///
/// Offending identifiers are carried in their `Debug` rendering so the
/// error type stays independent of the identifier type.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The builder was given no states at all.
    #[error("chart has no states")]
    EmptyChart,

    /// The same identifier was declared twice.
    #[error("state {0} is declared more than once")]
    DuplicateState(String),

    /// A state names a parent that was never declared.
    #[error("state {state} names unknown parent {parent}")]
    UnknownParent { state: String, parent: String },

    /// A transition targets a state that was never declared.
    #[error("state {state} has a transition to unknown target {target}")]
    UnknownTarget { state: String, target: String },

    /// A state names an initial substate that was never declared.
    #[error("state {state} names unknown initial substate {initial}")]
    UnknownInitial { state: String, initial: String },

    /// The declared initial substate is not a child of the state.
    #[error("initial substate {initial} is not a child of {state}")]
    InitialNotChild { state: String, initial: String },

    /// A composite state lacks an initial substate.
    #[error("composite state {0} has no initial substate")]
    MissingInitial(String),

    /// A history kind was set on a state without substates.
    #[error("state {0} has a history kind but no substates")]
    HistoryOnLeaf(String),

    /// The parent links form a cycle instead of a tree.
    #[error("superstate chain of {0} is cyclic")]
    CyclicHierarchy(String),
}
