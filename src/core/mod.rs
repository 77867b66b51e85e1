//! Core data model: definitions, chart, runtime container.

pub mod chart;
pub(crate) mod container;
pub mod context;
pub mod state;

pub use chart::StateChart;
pub use context::TransitionContext;
pub use state::{DynError, EventId, HistoryKind, StateDef, StateId, TransitionDef};
