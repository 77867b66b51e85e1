//! Observable outcomes of event dispatch.

/// Event emitted while a firing is processed.
///
/// Observers and extensions receive these synchronously on the firing
/// thread, in emission order. A declined event is a first-class outcome,
/// not an error.
pub enum TransitionEvent<'a, S, E, A> {
    /// No transition at any level accepted the event.
    Declined {
        event: &'a E,
        argument: Option<&'a A>,
        /// The state the event was fired in; unchanged by the firing.
        state: &'a S,
    },
    /// A transition's guard accepted the event; exit actions have not
    /// run yet, so `from` is the pre-exit current state.
    Begin {
        event: &'a E,
        argument: Option<&'a A>,
        from: &'a S,
    },
    /// The transition ran to completion; `new_state` is the post-entry
    /// current state.
    Completed {
        event: &'a E,
        argument: Option<&'a A>,
        new_state: &'a S,
    },
    /// A guard or action faulted. The firing continues: a faulting guard
    /// counts as false, a faulting action is skipped and the remaining
    /// sequence still runs.
    ExceptionThrown {
        event: &'a E,
        argument: Option<&'a A>,
        state: &'a S,
        error: &'a (dyn std::error::Error + Send + Sync),
    },
}

impl<S, E, A> TransitionEvent<'_, S, E, A> {
    /// The event id this outcome belongs to.
    pub fn event(&self) -> &E {
        match self {
            Self::Declined { event, .. }
            | Self::Begin { event, .. }
            | Self::Completed { event, .. }
            | Self::ExceptionThrown { event, .. } => event,
        }
    }
}

/// Multicast observer; notified in registration order.
pub type Observer<S, E, A> = Box<dyn Fn(&TransitionEvent<'_, S, E, A>) + Send + Sync>;
