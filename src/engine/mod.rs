//! The transition engine.
//!
//! Owns the chart (shared, immutable) and the runtime container, and
//! implements entry/exit sequencing and event dispatch. The engine is
//! driven either directly by the passive façade or by the active
//! runner's worker; it performs no synchronization of its own.

pub mod events;
mod states;
mod transitions;

pub use events::{Observer, TransitionEvent};

use crate::core::container::StateContainer;
use crate::core::state::{DynError, StateIdx};
use crate::core::StateChart;
use crate::extension::Extension;
use crate::{EventId, StateId};
use std::sync::Arc;

/// Borrowed event context threaded through entry/exit helpers. `None`
/// marks the initial-entry path, where no event is in scope.
pub(crate) struct EventRef<'a, E, A> {
    pub(crate) event: &'a E,
    pub(crate) argument: Option<&'a A>,
}

// Manual impls: the fields are references, so copying never requires
// `E: Copy` or `A: Copy`.
impl<E, A> Clone for EventRef<'_, E, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, A> Copy for EventRef<'_, E, A> {}

pub(crate) struct Engine<S, E, A> {
    chart: Arc<StateChart<S, E, A>>,
    container: StateContainer<S, E, A>,
    observers: Vec<Observer<S, E, A>>,
}

impl<S, E, A> Engine<S, E, A>
where
    S: StateId,
    E: EventId,
{
    pub(crate) fn new(chart: Arc<StateChart<S, E, A>>, name: Option<String>) -> Self {
        Self {
            chart,
            container: StateContainer::new(name),
            observers: Vec::new(),
        }
    }

    pub(crate) fn chart(&self) -> &Arc<StateChart<S, E, A>> {
        &self.chart
    }

    pub(crate) fn container(&self) -> &StateContainer<S, E, A> {
        &self.container
    }

    pub(crate) fn container_mut(&mut self) -> &mut StateContainer<S, E, A> {
        &mut self.container
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.container.name()
    }

    pub(crate) fn current_id(&self) -> Option<&S> {
        self.container.current().map(|idx| self.chart.id_of(idx))
    }

    pub(crate) fn initial_id(&self) -> Option<&S> {
        self.container.initial().map(|idx| self.chart.id_of(idx))
    }

    pub(crate) fn resolve(&self, id: &S) -> Option<StateIdx> {
        self.chart.idx_of(id)
    }

    pub(crate) fn add_observer(&mut self, observer: Observer<S, E, A>) {
        self.observers.push(observer);
    }

    pub(crate) fn add_extension(&self, ext: Arc<dyn Extension<S, E, A>>) {
        self.container.add_extension(ext);
    }

    pub(crate) fn clear_extensions(&self) {
        self.container.clear_extensions();
    }

    pub(crate) fn extensions_snapshot(&self) -> Vec<Arc<dyn Extension<S, E, A>>> {
        self.container.extensions_snapshot()
    }

    /// Notify observers first, then extensions, each in registration
    /// order, synchronously on the firing thread.
    pub(crate) fn emit(&self, event: &TransitionEvent<'_, S, E, A>) {
        for observer in &self.observers {
            observer(event);
        }
        for ext in self.container.extensions_snapshot() {
            ext.transition_event(event);
        }
    }

    /// Report a guard or action fault. Outside an event context (initial
    /// entry) the fault is logged instead, since the exception event
    /// structurally carries the triggering event.
    pub(crate) fn emit_exception(&self, ev: Option<EventRef<'_, E, A>>, error: &DynError) {
        match (ev, self.container.current()) {
            (Some(EventRef { event, argument }), Some(current)) => {
                let state = self.chart.id_of(current);
                self.emit(&TransitionEvent::ExceptionThrown {
                    event,
                    argument,
                    state,
                    error: &**error,
                });
            }
            _ => {
                tracing::error!(error = %error, "action fault outside event dispatch");
            }
        }
    }
}
