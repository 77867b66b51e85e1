//! Passive state machine façade.
//!
//! Runs every firing to completion on the caller's thread. Nothing is
//! queued and no worker exists; the caller must serialize access, which
//! the `&mut self` receivers enforce at compile time.

use crate::engine::{Engine, Observer, TransitionEvent};
use crate::error::LifecycleError;
use crate::extension::Extension;
use crate::persist::{self, PersistError, SnapshotLoader, SnapshotSaver};
use crate::report::ReportGenerator;
use crate::{EventId, StateChart, StateId};
use std::sync::Arc;

/// Synchronous state machine driving a shared [`StateChart`].
///
/// ```
/// use strata::{ChartBuilder, StateMachine};
///
/// let chart = ChartBuilder::<&str, &str, ()>::new()
///     .state("off", |s| s.on("toggle", |t| t.go_to("on")))
///     .state("on", |s| s.on("toggle", |t| t.go_to("off")))
///     .build()?;
///
/// let mut machine = StateMachine::new(chart);
/// machine.initialize("off")?;
/// machine.fire("toggle")?;
/// assert_eq!(machine.current_state(), Some(&"on"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct StateMachine<S, E, A> {
    engine: Engine<S, E, A>,
    initialized: bool,
    pending_initialization: bool,
}

impl<S, E, A> StateMachine<S, E, A>
where
    S: StateId,
    E: EventId,
{
    /// Create a machine over `chart`. Accepts an owned chart or an
    /// `Arc` shared with other machines.
    pub fn new(chart: impl Into<Arc<StateChart<S, E, A>>>) -> Self {
        Self::with_name(chart, None)
    }

    /// Like [`new`](Self::new), with a display name used in logs and
    /// reports.
    pub fn with_name(
        chart: impl Into<Arc<StateChart<S, E, A>>>,
        name: Option<&str>,
    ) -> Self {
        Self {
            engine: Engine::new(chart.into(), name.map(str::to_owned)),
            initialized: false,
            pending_initialization: false,
        }
    }

    /// Set the initial state. Entry actions do not run here; they run
    /// at the start of the first `fire`, so observers registered after
    /// `initialize` still see the initial entry.
    pub fn initialize(&mut self, initial: S) -> Result<(), LifecycleError> {
        if self.initialized {
            return Err(LifecycleError::AlreadyInitialized);
        }
        let idx = self
            .engine
            .resolve(&initial)
            .ok_or_else(|| LifecycleError::UnknownState(format!("{initial:?}")))?;
        self.engine.container_mut().set_initial(idx);
        self.initialized = true;
        self.pending_initialization = true;
        Ok(())
    }

    /// Fire an event without an argument.
    pub fn fire(&mut self, event: E) -> Result<(), LifecycleError> {
        self.dispatch(&event, None)
    }

    /// Fire an event carrying an argument.
    pub fn fire_with(&mut self, event: E, argument: A) -> Result<(), LifecycleError> {
        self.dispatch(&event, Some(&argument))
    }

    fn dispatch(&mut self, event: &E, argument: Option<&A>) -> Result<(), LifecycleError> {
        if !self.initialized {
            return Err(LifecycleError::NotInitialized);
        }
        if self.pending_initialization {
            self.engine.enter_initial();
            self.pending_initialization = false;
        }
        if self.engine.container().current().is_none() {
            // A loaded snapshot without a current state consumes the
            // initialize slot but leaves the machine unfireable.
            return Err(LifecycleError::NotInitialized);
        }
        self.engine.fire(event, argument);
        Ok(())
    }

    /// Write the current state and history through `saver`.
    pub fn save(&self, saver: &mut dyn SnapshotSaver<S>) -> Result<(), PersistError> {
        persist::save_machine(&self.engine, saver)
    }

    /// Restore state and history through `loader`. Only legal before
    /// `initialize`; consumes the initialize slot even when the loaded
    /// current state is empty.
    pub fn load(&mut self, loader: &mut dyn SnapshotLoader<S>) -> Result<(), PersistError> {
        if self.initialized {
            return Err(PersistError::AlreadyInitialized);
        }
        persist::load_machine(&mut self.engine, loader)?;
        self.initialized = true;
        self.pending_initialization = false;
        Ok(())
    }

    /// Register an observer for the transition event stream.
    pub fn add_observer<F>(&mut self, observer: F)
    where
        F: Fn(&TransitionEvent<'_, S, E, A>) + Send + Sync + 'static,
    {
        self.engine.add_observer(Box::new(observer) as Observer<S, E, A>);
    }

    /// Register an extension.
    pub fn add_extension(&mut self, ext: Arc<dyn Extension<S, E, A>>) {
        self.engine.add_extension(ext);
    }

    /// Remove all registered extensions.
    pub fn clear_extensions(&mut self) {
        self.engine.clear_extensions();
    }

    /// Run a report generator over the chart.
    pub fn report<R: ReportGenerator<S, E, A> + ?Sized>(&self, reporter: &mut R) {
        reporter.report(self.engine.name(), self.engine.chart(), self.engine.initial_id());
    }

    /// The current (deepest active) state, if the machine has entered
    /// one.
    pub fn current_state(&self) -> Option<&S> {
        self.engine.current_id()
    }

    /// The machine's display name.
    pub fn name(&self) -> Option<&str> {
        self.engine.name()
    }

    /// Whether `initialize` or `load` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
