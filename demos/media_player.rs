//! Media Player State Machine
//!
//! This example demonstrates hierarchical states with history.
//!
//! Key concepts:
//! - Composite states with initial substates
//! - Shallow history (re-entering the player resumes where it left off)
//! - Event bubbling to the superstate
//! - Observing the transition event stream
//!
//! Run with: cargo run --example media_player

use strata::{ChartBuilder, HistoryKind, StateMachine, TransitionEvent};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Media Player State Machine ===\n");

    let chart = ChartBuilder::<&str, &str, ()>::new()
        .state("player", |s| {
            s.initial("stopped")
                .history(HistoryKind::Shallow)
                .on("power", |t| t.go_to("off"))
        })
        .state("stopped", |s| s.parent("player").on("play", |t| t.go_to("playing")))
        .state("playing", |s| {
            s.parent("player")
                .on("pause", |t| t.go_to("paused"))
                .on("stop", |t| t.go_to("stopped"))
        })
        .state("paused", |s| {
            s.parent("player")
                .on("play", |t| t.go_to("playing"))
                .on("stop", |t| t.go_to("stopped"))
        })
        .state("off", |s| s.on("power", |t| t.go_to("player")))
        .build()?;

    let mut machine = StateMachine::with_name(chart, Some("media player"));
    machine.add_observer(|evt| match evt {
        TransitionEvent::Completed { event, new_state, .. } => {
            println!("  {event:>6} -> now in {new_state}");
        }
        TransitionEvent::Declined { event, state, .. } => {
            println!("  {event:>6} -> declined in {state}");
        }
        _ => {}
    });
    machine.initialize("player")?;

    println!("Driving the player:");
    machine.fire("play")?;
    machine.fire("pause")?;

    // "power" is declared on the composite: it bubbles up from "paused".
    machine.fire("power")?;

    // Re-entering the player restores the paused substate via history.
    machine.fire("power")?;
    println!("\nAfter power off/on: {:?}", machine.current_state());

    machine.fire("eject")?; // nobody handles this one

    println!("\n=== Example Complete ===");
    Ok(())
}
