//! Read-only report generation over a chart.

use crate::core::StateChart;
use crate::HistoryKind;
use std::fmt::Debug;

/// Read-only traversal of a machine's structure.
///
/// Generators own their output; callers extract it after `report`
/// returns, keeping the core free of I/O.
pub trait ReportGenerator<S, E, A> {
    /// Produce a report for `chart`, optionally titled with the
    /// machine's name and marking its initial state.
    fn report(&mut self, name: Option<&str>, chart: &StateChart<S, E, A>, initial: Option<&S>);
}

/// PlantUML state diagram generator.
///
/// Emits hierarchy edges, transition edges labelled with their event
/// (internal transitions as self-descriptions) and an initial-state
/// marker. Output is stable for a given chart: states and transitions
/// appear in declaration order.
#[derive(Default)]
pub struct PlantUmlReporter {
    output: String,
}

impl PlantUmlReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The generated diagram.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Consume the reporter and take the diagram.
    pub fn into_output(self) -> String {
        self.output
    }
}

impl<S, E, A> ReportGenerator<S, E, A> for PlantUmlReporter
where
    S: Clone + Eq + std::hash::Hash + Debug,
    E: Eq + Debug,
{
    fn report(&mut self, name: Option<&str>, chart: &StateChart<S, E, A>, initial: Option<&S>) {
        let mut out = String::from("@startuml\n");
        if let Some(name) = name {
            out.push_str(&format!("title {name}\n"));
        }

        for state in chart.states() {
            let id = state.id();
            out.push_str(&format!("state {id:?}\n"));
            if let Some(parent) = chart.superstate(id) {
                out.push_str(&format!("{id:?} -up-> {parent:?} : parent\n"));
            }
            match state.history() {
                HistoryKind::Shallow => out.push_str(&format!("{id:?} : history[H]\n")),
                HistoryKind::Deep => out.push_str(&format!("{id:?} : history[H*]\n")),
                HistoryKind::None => {}
            }
        }

        for state in chart.states() {
            let id = state.id();
            for (event, target) in chart.transitions(id) {
                match target {
                    Some(target) => {
                        out.push_str(&format!("{id:?} --> {target:?} : {event:?}\n"));
                    }
                    None => out.push_str(&format!("{id:?} : {event:?} (internal)\n")),
                }
            }
        }

        if let Some(initial) = initial {
            out.push_str(&format!("[*] --> {initial:?}\n"));
        }

        out.push_str("@enduml\n");
        self.output = out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChartBuilder;
    use crate::StateMachine;

    fn reported() -> String {
        let chart = ChartBuilder::<&str, &str, ()>::new()
            .state("door", |s| s.initial("closed").history(HistoryKind::Shallow))
            .state("closed", |s| s.parent("door").on("open", |t| t.go_to("opened")))
            .state("opened", |s| {
                s.parent("door")
                    .on("close", |t| t.go_to("closed"))
                    .on("knock", |t| t)
            })
            .build()
            .unwrap();
        let mut machine = StateMachine::with_name(chart, Some("door machine"));
        machine.initialize("door").unwrap();

        let mut reporter = PlantUmlReporter::new();
        machine.report(&mut reporter);
        reporter.into_output()
    }

    #[test]
    fn diagram_contains_frame_and_title() {
        let out = reported();
        assert!(out.starts_with("@startuml\n"));
        assert!(out.ends_with("@enduml\n"));
        assert!(out.contains("title door machine\n"));
    }

    #[test]
    fn diagram_contains_hierarchy_and_transitions() {
        let out = reported();
        assert!(out.contains("\"closed\" -up-> \"door\" : parent\n"));
        assert!(out.contains("\"closed\" --> \"opened\" : \"open\"\n"));
        assert!(out.contains("\"opened\" : \"knock\" (internal)\n"));
        assert!(out.contains("\"door\" : history[H]\n"));
        assert!(out.contains("[*] --> \"door\"\n"));
    }

    #[test]
    fn report_is_stable_across_runs() {
        assert_eq!(reported(), reported());
    }
}
