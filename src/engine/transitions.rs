//! Event dispatch and transition execution.
//!
//! Candidate search walks from the current leaf up the superstate chain;
//! at each level the state's candidate list for the event is tried in
//! declaration order. The first transition whose guard holds wins. With
//! no match anywhere the event is declined and the state is unchanged.

use crate::core::state::{StateIdx, TransitionDef};
use crate::core::{StateChart, TransitionContext};
use crate::engine::{Engine, EventRef, TransitionEvent};
use crate::{EventId, StateId};
use std::sync::Arc;

impl<S, E, A> Engine<S, E, A>
where
    S: StateId,
    E: EventId,
{
    /// Dispatch one event to completion on the calling thread.
    ///
    /// The façades guarantee an entered machine before delegating here;
    /// without a current state the dispatch is a no-op.
    pub(crate) fn fire(&mut self, event: &E, argument: Option<&A>) {
        let Some(leaf) = self.container().current() else {
            return;
        };
        let chart = Arc::clone(self.chart());
        let ev = EventRef { event, argument };
        let source = chart.id_of(leaf);

        let mut level = Some(leaf);
        while let Some(idx) = level {
            if let Some(candidates) = chart.state(idx).transitions_for(event) {
                for candidate in candidates {
                    if !self.guard_holds(candidate, event, argument, source, ev) {
                        continue;
                    }

                    self.emit(&TransitionEvent::Begin {
                        event,
                        argument,
                        from: source,
                    });
                    self.execute(&chart, idx, candidate, ev, leaf);
                    let new_leaf = self.container().current().unwrap_or(leaf);
                    tracing::debug!(
                        event = ?event,
                        from = ?source,
                        to = ?chart.id_of(new_leaf),
                        "transition completed"
                    );
                    self.emit(&TransitionEvent::Completed {
                        event,
                        argument,
                        new_state: chart.id_of(new_leaf),
                    });
                    return;
                }
            }
            level = chart.state(idx).superstate;
        }

        tracing::debug!(event = ?event, state = ?source, "transition declined");
        self.emit(&TransitionEvent::Declined {
            event,
            argument,
            state: source,
        });
    }

    /// Evaluate a candidate's guard. Absent guards hold; a faulting
    /// guard is reported and treated as false.
    fn guard_holds(
        &self,
        candidate: &TransitionDef<S, E, A>,
        event: &E,
        argument: Option<&A>,
        source: &S,
        ev: EventRef<'_, E, A>,
    ) -> bool {
        let Some(guard) = &candidate.guard else {
            return true;
        };
        let ctx = TransitionContext::new(event, argument, source);
        match guard(&ctx) {
            Ok(holds) => holds,
            Err(error) => {
                self.emit_exception(Some(ev), &error);
                false
            }
        }
    }

    /// Run the matched transition: exit chain, actions, entry chain.
    ///
    /// `src` is the state whose candidate list matched — an ancestor of
    /// the current leaf when the event bubbled. The exit chain always
    /// starts at the leaf.
    fn execute(
        &mut self,
        chart: &StateChart<S, E, A>,
        src: StateIdx,
        transition: &TransitionDef<S, E, A>,
        ev: EventRef<'_, E, A>,
        leaf: StateIdx,
    ) {
        let Some(tgt) = transition.target else {
            // Internal: actions only, no exit/entry, no state change.
            self.run_transition_actions(chart, transition, ev, leaf);
            return;
        };

        let new_leaf = if tgt == src {
            // Self transition: leave and re-enter the source.
            self.exit_states(chart, leaf, Some(src), true, ev);
            self.run_transition_actions(chart, transition, ev, leaf);
            self.enter_tree(chart, src, Some(ev))
        } else if chart.is_descendant(src, tgt) {
            // Source below target: exit through the target, re-enter it.
            self.exit_states(chart, leaf, Some(tgt), true, ev);
            self.run_transition_actions(chart, transition, ev, leaf);
            self.enter_tree(chart, tgt, Some(ev))
        } else if chart.is_descendant(tgt, src) {
            // Target below source: the source stays active.
            self.exit_states(chart, leaf, Some(src), false, ev);
            self.run_transition_actions(chart, transition, ev, leaf);
            self.enter_path(chart, Some(src), tgt, ev)
        } else {
            let lca = chart.common_ancestor_idx(src, tgt);
            self.exit_states(chart, leaf, lca, false, ev);
            self.run_transition_actions(chart, transition, ev, leaf);
            self.enter_path(chart, lca, tgt, ev)
        };

        self.container_mut().set_current(new_leaf);
    }

    fn run_transition_actions(
        &self,
        chart: &StateChart<S, E, A>,
        transition: &TransitionDef<S, E, A>,
        ev: EventRef<'_, E, A>,
        leaf: StateIdx,
    ) {
        let ctx = TransitionContext::new(ev.event, ev.argument, chart.id_of(leaf));
        for action in &transition.actions {
            if let Err(error) = action(&ctx) {
                self.emit_exception(Some(ev), &error);
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

    fn push(log: &Log, tag: &str) {
        log.lock().push(tag.to_owned());
    }

    fn observing_engine(
        chart: crate::StateChart<&'static str, &'static str, ()>,
        log: &Log,
    ) -> Engine<&'static str, &'static str, ()> {
        let mut engine = Engine::new(Arc::new(chart), None);
        let log = Arc::clone(log);
        engine.add_observer(Box::new(move |evt| match evt {
            TransitionEvent::Declined { state, .. } => push(&log, &format!("declined@{state}")),
            TransitionEvent::Begin { from, .. } => push(&log, &format!("begin@{from}")),
            TransitionEvent::Completed { new_state, .. } => {
                push(&log, &format!("completed@{new_state}"));
            }
            TransitionEvent::ExceptionThrown { .. } => push(&log, "exception"),
        }));
        engine
    }

    fn enter(engine: &mut Engine<&'static str, &'static str, ()>, id: &'static str) {
        let idx = engine.resolve(&id).unwrap();
        engine.container_mut().set_initial(idx);
        engine.enter_initial();
    }

    #[test]
    fn unmatched_event_is_declined_and_state_unchanged() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let chart = ChartBuilder::new().state("a", |s| s).build().unwrap();
        let mut engine = observing_engine(chart, &log);
        enter(&mut engine, "a");

        engine.fire(&"nope", None);

        assert_eq!(engine.current_id(), Some(&"a"));
        assert_eq!(*log.lock(), vec!["declined@a"]);
    }

    #[test]
    fn guard_fault_counts_as_false_and_is_reported() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let chart = ChartBuilder::new()
            .state("a", |s| {
                s.on("e", |t| t.go_to("b").when(|_| Err("guard broke".into())))
                    .on("e", |t| t.go_to("c"))
            })
            .state("b", |s| s)
            .state("c", |s| s)
            .build()
            .unwrap();
        let mut engine = observing_engine(chart, &log);
        enter(&mut engine, "a");

        engine.fire(&"e", None);

        assert_eq!(engine.current_id(), Some(&"c"));
        assert_eq!(*log.lock(), vec!["exception", "begin@a", "completed@c"]);
    }

    #[test]
    fn internal_transition_changes_nothing() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let seen: Log = Arc::new(Mutex::new(Vec::new()));
        let seen_in_action = Arc::clone(&seen);
        let chart = ChartBuilder::new()
            .state("a", |s| {
                s.on("tick", move |t| {
                    let seen = Arc::clone(&seen_in_action);
                    t.run(move |ctx| {
                        seen.lock().push(format!("tick in {}", ctx.source()));
                        Ok(())
                    })
                })
            })
            .build()
            .unwrap();
        let mut engine = observing_engine(chart, &log);
        enter(&mut engine, "a");

        engine.fire(&"tick", None);

        assert_eq!(engine.current_id(), Some(&"a"));
        assert_eq!(*seen.lock(), vec!["tick in a"]);
        assert_eq!(*log.lock(), vec!["begin@a", "completed@a"]);
    }

    #[test]
    fn bubbled_event_matches_on_the_ancestor() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let chart = ChartBuilder::new()
            .state("parent", |s| s.initial("child").on("up", |t| t.go_to("other")))
            .state("child", |s| s.parent("parent"))
            .state("other", |s| s)
            .build()
            .unwrap();
        let mut engine = observing_engine(chart, &log);
        enter(&mut engine, "parent");
        assert_eq!(engine.current_id(), Some(&"child"));

        engine.fire(&"up", None);

        assert_eq!(engine.current_id(), Some(&"other"));
        assert_eq!(*log.lock(), vec!["begin@child", "completed@other"]);
    }

    #[test]
    fn argument_reaches_guard_and_action() {
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_in_action = Arc::clone(&seen);
        let chart: crate::StateChart<&str, &str, u32> = ChartBuilder::new()
            .state("a", |s| {
                s.on("e", move |t| {
                    let seen = Arc::clone(&seen_in_action);
                    t.go_to("b")
                        .when(|ctx| Ok(ctx.argument().copied().unwrap_or(0) > 2))
                        .run(move |ctx| {
                            seen.lock().push(*ctx.argument().unwrap());
                            Ok(())
                        })
                })
            })
            .state("b", |s| s)
            .build()
            .unwrap();
        let mut engine = Engine::new(Arc::new(chart), None);
        let idx = engine.resolve(&"a").unwrap();
        engine.container_mut().set_initial(idx);
        engine.enter_initial();

        engine.fire(&"e", Some(&1));
        assert_eq!(engine.current_id(), Some(&"a"));

        engine.fire(&"e", Some(&7));
        assert_eq!(engine.current_id(), Some(&"b"));
        assert_eq!(*seen.lock(), vec![7]);
    }
}
