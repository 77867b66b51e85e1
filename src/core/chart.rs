//! The immutable state chart.
//!
//! States live in an arena; the superstate/substate relation is expressed
//! with arena indices so the tree carries no ownership cycles. A chart is
//! produced by [`ChartBuilder`](crate::builder::ChartBuilder) and never
//! mutated afterwards, which lets runtimes share it behind an [`Arc`].
//!
//! [`Arc`]: std::sync::Arc

use crate::core::state::{StateDef, StateIdx};
use crate::HistoryKind;
use std::collections::HashMap;
use std::hash::Hash;

/// Immutable graph of state definitions, indexed by identifier.
pub struct StateChart<S, E, A> {
    states: Vec<StateDef<S, E, A>>,
    index: HashMap<S, StateIdx>,
}

impl<S, E, A> StateChart<S, E, A>
where
    S: Clone + Eq + Hash,
    E: Eq,
{
    pub(crate) fn from_arena(states: Vec<StateDef<S, E, A>>) -> Self {
        let index = states
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id.clone(), idx))
            .collect();
        Self { states, index }
    }

    /// Number of states in the chart.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the chart contains no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether `id` names a state in this chart.
    pub fn contains(&self, id: &S) -> bool {
        self.index.contains_key(id)
    }

    /// All state definitions, in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &StateDef<S, E, A>> {
        self.states.iter()
    }

    /// The parent of `id`, if it has one.
    pub fn superstate(&self, id: &S) -> Option<&S> {
        let state = self.state(self.idx_of(id)?);
        state.superstate.map(|sup| &self.state(sup).id)
    }

    /// The substates of `id`, in declaration order.
    pub fn substates(&self, id: &S) -> Vec<&S> {
        match self.idx_of(id) {
            Some(idx) => self
                .state(idx)
                .substates
                .iter()
                .map(|&child| &self.state(child).id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The initial substate of `id`, if `id` is composite.
    pub fn initial_substate(&self, id: &S) -> Option<&S> {
        let state = self.state(self.idx_of(id)?);
        state.initial.map(|init| &self.state(init).id)
    }

    /// The history kind of `id`. Unknown states report `HistoryKind::None`.
    pub fn history_kind(&self, id: &S) -> HistoryKind {
        self.idx_of(id)
            .map(|idx| self.state(idx).history)
            .unwrap_or_default()
    }

    /// Whether `a` is a (strict) transitive descendant of `b`.
    pub fn is_descendant_of(&self, a: &S, b: &S) -> bool {
        match (self.idx_of(a), self.idx_of(b)) {
            (Some(a), Some(b)) => self.is_descendant(a, b),
            _ => false,
        }
    }

    /// The deepest state containing both `a` and `b`, where a composite
    /// counts as containing itself. `None` when the states live in
    /// different root trees.
    pub fn common_ancestor(&self, a: &S, b: &S) -> Option<&S> {
        let (a, b) = (self.idx_of(a)?, self.idx_of(b)?);
        self.common_ancestor_idx(a, b).map(|idx| &self.state(idx).id)
    }

    /// The chain from `id` up to its root, starting with `id` itself.
    pub fn path_to_root(&self, id: &S) -> Vec<&S> {
        match self.idx_of(id) {
            Some(idx) => self
                .ancestor_chain(idx)
                .into_iter()
                .map(|i| &self.state(i).id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The transitions declared on `id` as `(event, target)` pairs in
    /// declaration order; an internal transition reports `None`.
    pub fn transitions(&self, id: &S) -> Vec<(&E, Option<&S>)> {
        let Some(idx) = self.idx_of(id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (event, list) in &self.state(idx).transitions {
            for t in list {
                out.push((event, t.target.map(|tgt| &self.state(tgt).id)));
            }
        }
        out
    }

    // ---- arena-level access, used by the engine ----

    pub(crate) fn idx_of(&self, id: &S) -> Option<StateIdx> {
        self.index.get(id).copied()
    }

    pub(crate) fn state(&self, idx: StateIdx) -> &StateDef<S, E, A> {
        &self.states[idx]
    }

    pub(crate) fn id_of(&self, idx: StateIdx) -> &S {
        &self.states[idx].id
    }

    /// Strict descendant check on arena indices.
    pub(crate) fn is_descendant(&self, a: StateIdx, b: StateIdx) -> bool {
        let mut cursor = self.state(a).superstate;
        while let Some(idx) = cursor {
            if idx == b {
                return true;
            }
            cursor = self.state(idx).superstate;
        }
        false
    }

    /// Ancestor-or-self chain from `idx` to its root, inclusive.
    pub(crate) fn ancestor_chain(&self, idx: StateIdx) -> Vec<StateIdx> {
        let mut chain = vec![idx];
        let mut cursor = self.state(idx).superstate;
        while let Some(i) = cursor {
            chain.push(i);
            cursor = self.state(i).superstate;
        }
        chain
    }

    /// Lowest common ancestor-or-self of `a` and `b`.
    pub(crate) fn common_ancestor_idx(&self, a: StateIdx, b: StateIdx) -> Option<StateIdx> {
        let mut above_a = self.ancestor_chain(a);
        let mut above_b = self.ancestor_chain(b);

        // Walk both chains root-first; the last index they agree on is
        // the deepest shared ancestor.
        above_a.reverse();
        above_b.reverse();
        let mut shared = None;
        for (x, y) in above_a.iter().zip(above_b.iter()) {
            if x == y {
                shared = Some(*x);
            } else {
                break;
            }
        }
        shared
    }

    /// Path from just below `top` down to `target`, inclusive of `target`.
    /// With `top == None` the path starts at `target`'s root.
    pub(crate) fn descent_path(&self, top: Option<StateIdx>, target: StateIdx) -> Vec<StateIdx> {
        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(idx) = cursor {
            if Some(idx) == top {
                break;
            }
            path.push(idx);
            cursor = self.state(idx).superstate;
        }
        path.reverse();
        path
    }
}
