//! Strata: a hierarchical state machine library
//!
//! Strata implements UML statechart semantics over a declarative state
//! graph: composite states with initial-substate descent, shallow and
//! deep history, internal and external transitions, guarded candidate
//! lists with hierarchical event bubbling, and least-common-ancestor
//! exit/entry sequencing.
//!
//! # Core Concepts
//!
//! - **Chart**: the immutable graph of states and transitions, built
//!   once through [`ChartBuilder`] and shareable between machines
//! - **Passive machine**: [`StateMachine`] fires events synchronously
//!   on the caller's thread
//! - **Active machine**: [`ActiveStateMachine`] owns a worker thread
//!   and a priority-aware event queue
//! - **Observers & extensions**: every firing emits a
//!   [`TransitionEvent`] stream; [`Extension`]s additionally observe
//!   the machine lifecycle
//! - **Persistence**: current state and history snapshot through the
//!   [`SnapshotSaver`]/[`SnapshotLoader`] contracts
//!
//! # Example
//!
//! ```rust
//! use strata::{ChartBuilder, HistoryKind, StateMachine};
//!
//! let chart = ChartBuilder::<&str, &str, ()>::new()
//!     .state("player", |s| {
//!         s.initial("stopped")
//!             .history(HistoryKind::Shallow)
//!             .on("off", |t| t.go_to("idle"))
//!     })
//!     .state("stopped", |s| s.parent("player").on("play", |t| t.go_to("playing")))
//!     .state("playing", |s| s.parent("player").on("stop", |t| t.go_to("stopped")))
//!     .state("idle", |s| s.on("on", |t| t.go_to("player")))
//!     .build()?;
//!
//! let mut machine = StateMachine::new(chart);
//! machine.initialize("player")?;
//!
//! machine.fire("play")?;
//! assert_eq!(machine.current_state(), Some(&"playing"));
//!
//! // Leaving the player records history; re-entering restores it.
//! machine.fire("off")?;
//! machine.fire("on")?;
//! assert_eq!(machine.current_state(), Some(&"playing"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod error;
pub mod extension;
mod machine;
pub mod persist;
pub mod report;
pub mod runner;

pub use crate::builder::{BuildError, ChartBuilder, StateBuilder, TransitionBuilder};
pub use crate::core::{DynError, EventId, HistoryKind, StateChart, StateId, TransitionContext};
pub use crate::engine::TransitionEvent;
pub use crate::error::LifecycleError;
pub use crate::extension::Extension;
pub use crate::machine::StateMachine;
pub use crate::persist::{PersistError, Snapshot, SnapshotLoader, SnapshotSaver};
pub use crate::report::{PlantUmlReporter, ReportGenerator};
pub use crate::runner::ActiveStateMachine;
