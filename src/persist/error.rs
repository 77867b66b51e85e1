//! Persistence error types.

use crate::core::state::DynError;
use thiserror::Error;

/// Errors raised while saving or restoring a machine.
#[derive(Debug, Error)]
pub enum PersistError {
    /// `load` was called on an already initialized machine.
    #[error("state machine is already initialized")]
    AlreadyInitialized,

    /// A loaded history entry names a leaf that is not a descendant of
    /// its composite.
    #[error("history state {leaf} is not a descendant of {composite}")]
    InvalidHistoryState { composite: String, leaf: String },

    /// A loaded identifier does not exist in the chart.
    #[error("snapshot names unknown state {0}")]
    UnknownState(String),

    /// The snapshot was written by an incompatible format version.
    #[error("unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Failure inside the saver or loader implementation.
    #[error("snapshot backend error: {0}")]
    Backend(#[source] DynError),
}
