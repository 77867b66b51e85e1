//! State and transition definitions.
//!
//! Definitions are immutable once a chart is built. States form a tree via
//! the superstate link; each state owns its entry/exit actions and the
//! transitions declared on it, keyed by event and ordered by declaration.

use crate::core::context::TransitionContext;
use std::fmt::Debug;
use std::hash::Hash;

/// Opaque error type produced by user-supplied guards and actions.
///
/// Faults of this kind never abort a firing; they are surfaced through
/// [`TransitionEvent::ExceptionThrown`](crate::engine::TransitionEvent) and
/// the exit/entry sequence runs to completion.
pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Entry or exit action attached to a state, run in declaration order.
pub type StateAction = Box<dyn Fn() -> Result<(), DynError> + Send + Sync>;

/// Guard predicate attached to a transition.
///
/// An absent guard counts as `true`; a guard returning `Err` counts as
/// `false` and raises an exception event.
pub type GuardFn<S, E, A> =
    Box<dyn Fn(&TransitionContext<'_, S, E, A>) -> Result<bool, DynError> + Send + Sync>;

/// Action attached to a transition, run between the exit and entry chains.
pub type TransitionAction<S, E, A> =
    Box<dyn Fn(&TransitionContext<'_, S, E, A>) -> Result<(), DynError> + Send + Sync>;

/// Identifier type for states.
///
/// Blanket-implemented; any cheap, comparable, hashable value works —
/// enums, `&'static str`, integers.
pub trait StateId: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + Debug + Send + Sync + 'static> StateId for T {}

/// Identifier type for events. Same shape as [`StateId`].
pub trait EventId: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + Debug + Send + Sync + 'static> EventId for T {}

/// History behavior of a composite state.
///
/// Governs which substate is entered when the composite is re-entered
/// after having been exited.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum HistoryKind {
    /// Always enter the declared initial substate.
    #[default]
    None,
    /// Re-enter the last active immediate substate; deeper levels follow
    /// their own entry rules.
    Shallow,
    /// Re-enter the full path down to the last active leaf.
    Deep,
}

/// Index of a state in the chart arena.
pub(crate) type StateIdx = usize;

/// A single transition declared on a state.
///
/// `target == None` marks an internal transition: actions run, but no
/// state is exited or entered. The source is the owning state.
pub struct TransitionDef<S, E, A> {
    pub(crate) target: Option<StateIdx>,
    pub(crate) guard: Option<GuardFn<S, E, A>>,
    pub(crate) actions: Vec<TransitionAction<S, E, A>>,
}

impl<S, E, A> TransitionDef<S, E, A> {
    /// Whether this transition is internal (has no target).
    pub fn is_internal(&self) -> bool {
        self.target.is_none()
    }
}

/// Immutable definition of one state in the hierarchy.
pub struct StateDef<S, E, A> {
    pub(crate) id: S,
    pub(crate) superstate: Option<StateIdx>,
    pub(crate) substates: Vec<StateIdx>,
    pub(crate) initial: Option<StateIdx>,
    pub(crate) history: HistoryKind,
    pub(crate) level: usize,
    pub(crate) entry_actions: Vec<StateAction>,
    pub(crate) exit_actions: Vec<StateAction>,
    // Declaration-ordered so that reports and candidate search are stable.
    pub(crate) transitions: Vec<(E, Vec<TransitionDef<S, E, A>>)>,
}

impl<S, E, A> StateDef<S, E, A>
where
    E: Eq,
{
    /// The state's identifier.
    pub fn id(&self) -> &S {
        &self.id
    }

    /// Depth from the root of this state's tree; roots are level 0.
    pub fn level(&self) -> usize {
        self.level
    }

    /// The state's history kind.
    pub fn history(&self) -> HistoryKind {
        self.history
    }

    /// Whether the state has substates.
    pub fn is_composite(&self) -> bool {
        !self.substates.is_empty()
    }

    pub(crate) fn transitions_for(&self, event: &E) -> Option<&[TransitionDef<S, E, A>]> {
        self.transitions
            .iter()
            .find(|(e, _)| e == event)
            .map(|(_, list)| list.as_slice())
    }
}
