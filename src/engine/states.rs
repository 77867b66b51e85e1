//! Entry and exit of individual states.
//!
//! Entry of a composite selects the substate to descend into — recorded
//! history if the state keeps one, the declared initial substate
//! otherwise — and recurses until a leaf is reached. Exit records
//! history before running the state's exit actions. Action faults are
//! reported and the sequence continues; a machine is never left between
//! states.

use crate::core::state::StateIdx;
use crate::core::StateChart;
use crate::engine::{Engine, EventRef};
use crate::{EventId, HistoryKind, StateId};
use std::sync::Arc;

impl<S, E, A> Engine<S, E, A>
where
    S: StateId,
    E: EventId,
{
    /// Deferred entry of the initial state: entry actions run along the
    /// path from the root down to the initial state, then descent
    /// continues to a leaf.
    pub(crate) fn enter_initial(&mut self) {
        let Some(initial) = self.container().initial() else {
            return;
        };
        let chart = Arc::clone(self.chart());
        let path = chart.descent_path(None, initial);
        for &mid in &path[..path.len() - 1] {
            self.run_entry_actions(&chart, mid, None);
        }
        let leaf = self.enter_tree(&chart, initial, None);
        self.container_mut().set_current(leaf);
        tracing::debug!(state = ?chart.id_of(leaf), "entered initial state");
    }

    /// Run `idx`'s entry actions, then descend to a leaf, applying
    /// history selection where the state keeps history. Returns the leaf
    /// reached; the caller updates the container.
    pub(crate) fn enter_tree(
        &self,
        chart: &StateChart<S, E, A>,
        idx: StateIdx,
        ev: Option<EventRef<'_, E, A>>,
    ) -> StateIdx {
        self.run_entry_actions(chart, idx, ev);

        let state = chart.state(idx);
        if !state.is_composite() {
            return idx;
        }

        match state.history() {
            HistoryKind::Shallow => {
                if let Some(recorded) = self.container().last_active_of(idx) {
                    let path = chart.descent_path(Some(idx), recorded);
                    return self.enter_tree(chart, path[0], ev);
                }
            }
            HistoryKind::Deep => {
                if let Some(recorded) = self.container().last_active_of(idx) {
                    let path = chart.descent_path(Some(idx), recorded);
                    for &mid in &path[..path.len() - 1] {
                        self.run_entry_actions(chart, mid, ev);
                    }
                    return self.enter_tree(chart, recorded, ev);
                }
            }
            HistoryKind::None => {}
        }

        match state.initial {
            Some(initial) => self.enter_tree(chart, initial, ev),
            None => idx,
        }
    }

    /// Exit from the current leaf upward. `stop` bounds the chain:
    /// exclusive by default, inclusive when `include_stop` is set;
    /// `None` exits through the root. History is recorded before each
    /// composite's exit actions run.
    pub(crate) fn exit_states(
        &mut self,
        chart: &StateChart<S, E, A>,
        leaf: StateIdx,
        stop: Option<StateIdx>,
        include_stop: bool,
        ev: EventRef<'_, E, A>,
    ) {
        let mut cursor = Some(leaf);
        while let Some(idx) = cursor {
            if stop == Some(idx) && !include_stop {
                break;
            }

            let state = chart.state(idx);
            if state.is_composite() && state.history() != HistoryKind::None {
                self.container_mut().set_last_active(idx, leaf);
            }
            self.run_exit_actions(chart, idx, Some(ev));

            if stop == Some(idx) {
                break;
            }
            cursor = state.superstate;
        }
    }

    /// Run entry actions along the descent from just below `top` to
    /// `target`; the final entry on `target` descends further per
    /// initial/history rules. Returns the leaf reached.
    pub(crate) fn enter_path(
        &self,
        chart: &StateChart<S, E, A>,
        top: Option<StateIdx>,
        target: StateIdx,
        ev: EventRef<'_, E, A>,
    ) -> StateIdx {
        let path = chart.descent_path(top, target);
        for &mid in &path[..path.len() - 1] {
            self.run_entry_actions(chart, mid, Some(ev));
        }
        self.enter_tree(chart, target, Some(ev))
    }

    fn run_entry_actions(
        &self,
        chart: &StateChart<S, E, A>,
        idx: StateIdx,
        ev: Option<EventRef<'_, E, A>>,
    ) {
        tracing::trace!(state = ?chart.id_of(idx), "entry");
        for action in &chart.state(idx).entry_actions {
            if let Err(error) = action() {
                self.emit_exception(ev, &error);
            }
        }
    }

    fn run_exit_actions(
        &self,
        chart: &StateChart<S, E, A>,
        idx: StateIdx,
        ev: Option<EventRef<'_, E, A>>,
    ) {
        tracing::trace!(state = ?chart.id_of(idx), "exit");
        for action in &chart.state(idx).exit_actions {
            if let Err(error) = action() {
                self.emit_exception(ev, &error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChartBuilder;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, tag: &str) -> impl Fn() -> Result<(), crate::DynError> + Send + Sync {
        let log = Arc::clone(log);
        let tag = tag.to_owned();
        move || {
            log.lock().push(tag.clone());
            Ok(())
        }
    }

    fn engine_with_log() -> (Engine<&'static str, &'static str, ()>, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let chart = ChartBuilder::new()
            .state("top", |s| {
                s.initial("mid")
                    .on_entry(record(&log, "enter top"))
                    .on_exit(record(&log, "exit top"))
            })
            .state("mid", |s| {
                s.parent("top")
                    .initial("leaf")
                    .on_entry(record(&log, "enter mid"))
                    .on_exit(record(&log, "exit mid"))
            })
            .state("leaf", |s| {
                s.parent("mid")
                    .on_entry(record(&log, "enter leaf"))
                    .on_exit(record(&log, "exit leaf"))
            })
            .build()
            .unwrap();
        (Engine::new(Arc::new(chart), None), log)
    }

    #[test]
    fn initial_entry_descends_to_the_leaf() {
        let (mut engine, log) = engine_with_log();
        let top = engine.resolve(&"top").unwrap();
        engine.container_mut().set_initial(top);

        engine.enter_initial();

        assert_eq!(engine.current_id(), Some(&"leaf"));
        assert_eq!(*log.lock(), vec!["enter top", "enter mid", "enter leaf"]);
    }

    #[test]
    fn initial_entry_runs_ancestor_actions_first() {
        let (mut engine, log) = engine_with_log();
        let leaf = engine.resolve(&"leaf").unwrap();
        engine.container_mut().set_initial(leaf);

        engine.enter_initial();

        assert_eq!(engine.current_id(), Some(&"leaf"));
        assert_eq!(*log.lock(), vec!["enter top", "enter mid", "enter leaf"]);
    }

    #[test]
    fn exit_chain_runs_leaf_first() {
        let (mut engine, log) = engine_with_log();
        let top = engine.resolve(&"top").unwrap();
        engine.container_mut().set_initial(top);
        engine.enter_initial();
        log.lock().clear();

        let chart = Arc::clone(engine.chart());
        let leaf = engine.resolve(&"leaf").unwrap();
        let ev = EventRef {
            event: &"e",
            argument: None,
        };
        engine.exit_states(&chart, leaf, None, false, ev);

        assert_eq!(*log.lock(), vec!["exit leaf", "exit mid", "exit top"]);
    }
}
