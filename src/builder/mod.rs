//! Fluent construction of state charts.
//!
//! The builder collects state declarations and validates the whole graph
//! in [`ChartBuilder::build`]; every structural invariant violation is
//! reported as a [`BuildError`] instead of surfacing later at runtime.
//!
//! ```
//! use strata::{ChartBuilder, HistoryKind};
//!
//! let chart = ChartBuilder::<&str, &str, ()>::new()
//!     .state("door", |s| s.initial("closed").history(HistoryKind::Shallow))
//!     .state("closed", |s| s.parent("door").on("open", |t| t.go_to("opened")))
//!     .state("opened", |s| s.parent("door").on("close", |t| t.go_to("closed")))
//!     .build()?;
//!
//! assert_eq!(chart.substates(&"door"), vec![&"closed", &"opened"]);
//! # Ok::<(), strata::BuildError>(())
//! ```

pub mod error;

pub use error::BuildError;

use crate::core::context::TransitionContext;
use crate::core::state::{
    DynError, GuardFn, StateAction, StateDef, StateIdx, TransitionAction, TransitionDef,
};
use crate::core::StateChart;
use crate::{EventId, HistoryKind, StateId};
use std::collections::HashMap;
use std::fmt::Debug;

/// Builder for a single transition, opened by [`StateBuilder::on`].
///
/// Without [`go_to`](Self::go_to) the transition is internal: its actions
/// run but no state is exited or entered.
pub struct TransitionBuilder<S, E, A> {
    target: Option<S>,
    guard: Option<GuardFn<S, E, A>>,
    actions: Vec<TransitionAction<S, E, A>>,
}

impl<S, E, A> TransitionBuilder<S, E, A> {
    fn new() -> Self {
        Self {
            target: None,
            guard: None,
            actions: Vec::new(),
        }
    }

    /// Set the target state, making the transition external.
    pub fn go_to(mut self, target: S) -> Self {
        self.target = Some(target);
        self
    }

    /// Attach a guard predicate. An absent guard counts as `true`.
    pub fn when<F>(mut self, guard: F) -> Self
    where
        F: Fn(&TransitionContext<'_, S, E, A>) -> Result<bool, DynError> + Send + Sync + 'static,
    {
        self.guard = Some(Box::new(guard));
        self
    }

    /// Append an action, run between the exit and entry chains.
    pub fn run<F>(mut self, action: F) -> Self
    where
        F: Fn(&TransitionContext<'_, S, E, A>) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.actions.push(Box::new(action));
        self
    }
}

/// Builder for a single state, opened by [`ChartBuilder::state`].
pub struct StateBuilder<S, E, A> {
    parent: Option<S>,
    initial: Option<S>,
    history: HistoryKind,
    entry_actions: Vec<StateAction>,
    exit_actions: Vec<StateAction>,
    transitions: Vec<(E, TransitionBuilder<S, E, A>)>,
}

impl<S, E, A> StateBuilder<S, E, A> {
    fn new() -> Self {
        Self {
            parent: None,
            initial: None,
            history: HistoryKind::None,
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Declare the state a child of `parent`.
    pub fn parent(mut self, parent: S) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declare the initial substate entered on descent.
    pub fn initial(mut self, initial: S) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Set the history kind. Only meaningful on composite states.
    pub fn history(mut self, kind: HistoryKind) -> Self {
        self.history = kind;
        self
    }

    /// Append an entry action, run in declaration order.
    pub fn on_entry<F>(mut self, action: F) -> Self
    where
        F: Fn() -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.entry_actions.push(Box::new(action));
        self
    }

    /// Append an exit action, run in declaration order.
    pub fn on_exit<F>(mut self, action: F) -> Self
    where
        F: Fn() -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.exit_actions.push(Box::new(action));
        self
    }

    /// Declare a transition for `event`. Repeated declarations for the
    /// same event form an ordered candidate list.
    pub fn on<F>(mut self, event: E, configure: F) -> Self
    where
        F: FnOnce(TransitionBuilder<S, E, A>) -> TransitionBuilder<S, E, A>,
    {
        self.transitions
            .push((event, configure(TransitionBuilder::new())));
        self
    }
}

/// Collects state declarations and produces a validated [`StateChart`].
pub struct ChartBuilder<S, E, A> {
    states: Vec<(S, StateBuilder<S, E, A>)>,
}

impl<S, E, A> Default for ChartBuilder<S, E, A>
where
    S: StateId,
    E: EventId,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E, A> ChartBuilder<S, E, A>
where
    S: StateId,
    E: EventId,
{
    /// Create an empty builder.
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    /// Declare a state. Declaration order fixes substate order and
    /// report order.
    pub fn state<F>(mut self, id: S, configure: F) -> Self
    where
        F: FnOnce(StateBuilder<S, E, A>) -> StateBuilder<S, E, A>,
    {
        self.states.push((id, configure(StateBuilder::new())));
        self
    }

    /// Validate the declarations and build the chart.
    pub fn build(self) -> Result<StateChart<S, E, A>, BuildError> {
        if self.states.is_empty() {
            return Err(BuildError::EmptyChart);
        }

        let mut index: HashMap<S, StateIdx> = HashMap::new();
        for (pos, (id, _)) in self.states.iter().enumerate() {
            if index.insert(id.clone(), pos).is_some() {
                return Err(BuildError::DuplicateState(fmt(id)));
            }
        }

        // Resolve parent links and collect substates in declaration order.
        let mut supers: Vec<Option<StateIdx>> = vec![None; self.states.len()];
        let mut subs: Vec<Vec<StateIdx>> = vec![Vec::new(); self.states.len()];
        for (pos, (id, draft)) in self.states.iter().enumerate() {
            if let Some(parent) = &draft.parent {
                let parent_idx =
                    *index.get(parent).ok_or_else(|| BuildError::UnknownParent {
                        state: fmt(id),
                        parent: fmt(parent),
                    })?;
                supers[pos] = Some(parent_idx);
                subs[parent_idx].push(pos);
            }
        }

        // The parent relation must be a tree.
        for (pos, (id, _)) in self.states.iter().enumerate() {
            let mut cursor = supers[pos];
            let mut steps = 0;
            while let Some(up) = cursor {
                steps += 1;
                if steps > self.states.len() {
                    return Err(BuildError::CyclicHierarchy(fmt(id)));
                }
                cursor = supers[up];
            }
        }

        let mut levels: Vec<usize> = vec![0; self.states.len()];
        for pos in 0..self.states.len() {
            let mut level = 0;
            let mut cursor = supers[pos];
            while let Some(up) = cursor {
                level += 1;
                cursor = supers[up];
            }
            levels[pos] = level;
        }

        // Initial-substate and history checks.
        let mut initials: Vec<Option<StateIdx>> = vec![None; self.states.len()];
        for (pos, (id, draft)) in self.states.iter().enumerate() {
            match &draft.initial {
                Some(initial) => {
                    let initial_idx =
                        *index.get(initial).ok_or_else(|| BuildError::UnknownInitial {
                            state: fmt(id),
                            initial: fmt(initial),
                        })?;
                    if !subs[pos].contains(&initial_idx) {
                        return Err(BuildError::InitialNotChild {
                            state: fmt(id),
                            initial: fmt(initial),
                        });
                    }
                    initials[pos] = Some(initial_idx);
                }
                None => {
                    if !subs[pos].is_empty() {
                        return Err(BuildError::MissingInitial(fmt(id)));
                    }
                }
            }
            if draft.history != HistoryKind::None && subs[pos].is_empty() {
                return Err(BuildError::HistoryOnLeaf(fmt(id)));
            }
        }

        // Assemble the arena, resolving transition targets.
        let mut arena: Vec<StateDef<S, E, A>> = Vec::with_capacity(self.states.len());
        for (pos, (id, draft)) in self.states.into_iter().enumerate() {
            let mut transitions: Vec<(E, Vec<TransitionDef<S, E, A>>)> = Vec::new();
            for (event, t) in draft.transitions {
                let target = match t.target {
                    Some(target_id) => Some(*index.get(&target_id).ok_or_else(|| {
                        BuildError::UnknownTarget {
                            state: fmt(&id),
                            target: fmt(&target_id),
                        }
                    })?),
                    None => None,
                };
                let def = TransitionDef {
                    target,
                    guard: t.guard,
                    actions: t.actions,
                };
                match transitions.iter_mut().find(|(e, _)| *e == event) {
                    Some((_, list)) => list.push(def),
                    None => transitions.push((event, vec![def])),
                }
            }

            arena.push(StateDef {
                id,
                superstate: supers[pos],
                substates: std::mem::take(&mut subs[pos]),
                initial: initials[pos],
                history: draft.history,
                level: levels[pos],
                entry_actions: draft.entry_actions,
                exit_actions: draft.exit_actions,
                transitions,
            });
        }

        Ok(StateChart::from_arena(arena))
    }
}

fn fmt<T: Debug>(value: &T) -> String {
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    type Builder = ChartBuilder<&'static str, &'static str, ()>;

    #[test]
    fn empty_builder_is_rejected() {
        assert!(matches!(Builder::new().build(), Err(BuildError::EmptyChart)));
    }

    #[test]
    fn duplicate_states_are_rejected() {
        let result = Builder::new()
            .state("a", |s| s)
            .state("a", |s| s)
            .build();
        assert!(matches!(result, Err(BuildError::DuplicateState(_))));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let result = Builder::new().state("a", |s| s.parent("ghost")).build();
        assert!(matches!(result, Err(BuildError::UnknownParent { .. })));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let result = Builder::new()
            .state("a", |s| s.on("e", |t| t.go_to("ghost")))
            .build();
        assert!(matches!(result, Err(BuildError::UnknownTarget { .. })));
    }

    #[test]
    fn composite_without_initial_is_rejected() {
        let result = Builder::new()
            .state("a", |s| s)
            .state("b", |s| s.parent("a"))
            .build();
        assert!(matches!(result, Err(BuildError::MissingInitial(_))));
    }

    #[test]
    fn initial_must_be_a_child() {
        let result = Builder::new()
            .state("a", |s| s.initial("c"))
            .state("b", |s| s.parent("a"))
            .state("c", |s| s)
            .build();
        assert!(matches!(result, Err(BuildError::InitialNotChild { .. })));
    }

    #[test]
    fn history_on_a_leaf_is_rejected() {
        let result = Builder::new()
            .state("a", |s| s.history(HistoryKind::Deep))
            .build();
        assert!(matches!(result, Err(BuildError::HistoryOnLeaf(_))));
    }

    #[test]
    fn cyclic_parents_are_rejected() {
        let result = Builder::new()
            .state("a", |s| s.parent("b"))
            .state("b", |s| s.parent("a"))
            .build();
        assert!(matches!(result, Err(BuildError::CyclicHierarchy(_))));
    }

    #[test]
    fn candidates_for_one_event_stay_ordered() {
        let chart = Builder::new()
            .state("a", |s| {
                s.on("e", |t| t.go_to("b").when(|_| Ok(false)))
                    .on("e", |t| t.go_to("c"))
            })
            .state("b", |s| s)
            .state("c", |s| s)
            .build()
            .unwrap();

        let targets: Vec<_> = chart.transitions(&"a");
        assert_eq!(targets, vec![(&"e", Some(&"b")), (&"e", Some(&"c"))]);
    }

    #[test]
    fn well_formed_chart_builds() {
        let chart = Builder::new()
            .state("root", |s| s.initial("leaf").history(HistoryKind::Deep))
            .state("leaf", |s| s.parent("root"))
            .build()
            .unwrap();

        assert_eq!(chart.len(), 2);
        assert_eq!(chart.history_kind(&"root"), HistoryKind::Deep);
    }
}
