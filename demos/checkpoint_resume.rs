//! Checkpoint and Resume
//!
//! This example demonstrates snapshotting a machine and resuming it in
//! a fresh process.
//!
//! Key concepts:
//! - Saving current state and history through the saver contract
//! - JSON serialization of the snapshot
//! - Restoring into a new machine with `load`
//!
//! Run with: cargo run --example checkpoint_resume

use std::sync::Arc;
use strata::{ChartBuilder, HistoryKind, Snapshot, StateChart, StateMachine};

fn build_chart() -> StateChart<String, String, ()> {
    ChartBuilder::new()
        .state("job".into(), |s| {
            s.initial("queued".into())
                .history(HistoryKind::Shallow)
                .on("suspend".into(), |t| t.go_to("parked".into()))
        })
        .state("queued".into(), |s| {
            s.parent("job".into()).on("run".into(), |t| t.go_to("running".into()))
        })
        .state("running".into(), |s| {
            s.parent("job".into()).on("finish".into(), |t| t.go_to("done".into()))
        })
        .state("done".into(), |s| s.parent("job".into()))
        .state("parked".into(), |s| s.on("resume".into(), |t| t.go_to("job".into())))
        .build()
        .expect("chart is well formed")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpoint and Resume ===\n");

    let chart = Arc::new(build_chart());

    // First "process": make progress, then suspend and checkpoint.
    let mut machine = StateMachine::new(Arc::clone(&chart));
    machine.initialize("job".into())?;
    machine.fire("run".into())?;
    machine.fire("suspend".into())?;
    println!("Suspended in: {:?}", machine.current_state());

    let mut snapshot = Snapshot::new();
    machine.save(&mut snapshot)?;
    let json = snapshot.to_json()?;
    println!("Checkpoint: {json}\n");

    // Second "process": restore and pick up where we left off.
    let mut loaded = Snapshot::<String>::from_json(&json)?;
    let mut resumed = StateMachine::new(chart);
    resumed.load(&mut loaded)?;
    resumed.fire("resume".into())?;

    // History put us back into "running", not the initial "queued".
    println!("Resumed in: {:?}", resumed.current_state());
    resumed.fire("finish".into())?;
    println!("Finished in: {:?}", resumed.current_state());

    println!("\n=== Example Complete ===");
    Ok(())
}
