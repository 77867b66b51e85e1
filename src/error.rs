//! Lifecycle errors shared by the passive and active façades.

use thiserror::Error;

/// Violations of the machine lifecycle, surfaced synchronously to the
/// caller of `initialize`, `fire` or `stop`.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `fire` or `start` was called before `initialize` (or before a
    /// snapshot with a current state was loaded).
    #[error("state machine is not initialized")]
    NotInitialized,

    /// `initialize` was called twice, or after `load`.
    #[error("state machine is already initialized")]
    AlreadyInitialized,

    /// `initialize` named a state the chart does not contain.
    #[error("unknown state {0}")]
    UnknownState(String),

    /// The worker thread ended with a panic; re-raised from `stop`.
    #[error("worker faulted: {0}")]
    WorkerFault(String),
}
