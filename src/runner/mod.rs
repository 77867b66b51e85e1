//! Active state machine: a worker-owned event loop.
//!
//! Producers only touch the queue; every container mutation happens on
//! the single worker thread. Priority events preempt queued events but
//! never the event currently being processed. Stopping joins the worker
//! and retains queued events, so a stopped runner can be restarted.

mod queue;

use crate::core::context::EventInfo;
use crate::engine::{Engine, Observer, TransitionEvent};
use crate::error::LifecycleError;
use crate::extension::Extension;
use crate::persist::{self, PersistError, SnapshotLoader, SnapshotSaver};
use crate::report::ReportGenerator;
use crate::{EventId, StateChart, StateId};
use queue::EventQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct Cell<S, E, A> {
    engine: Engine<S, E, A>,
    pending_initialization: bool,
}

struct Shared<S, E, A> {
    cell: parking_lot::Mutex<Cell<S, E, A>>,
    queue: EventQueue<E, A>,
    // Producers must never block on the worker-owned cell, so the
    // initialized flag and the extension list live beside it.
    initialized: AtomicBool,
    extensions: crate::core::container::ExtensionList<S, E, A>,
    running: AtomicBool,
}

/// State machine driven by a dedicated worker thread.
///
/// `fire` and `fire_priority` enqueue and return immediately; the
/// worker dequeues one event at a time and runs it to completion.
/// Entry of the initial state is deferred to the worker's first tick,
/// so extensions registered before `start` observe the whole lifecycle.
pub struct ActiveStateMachine<S, E, A>
where
    S: StateId,
    E: EventId,
    A: Send + Sync + 'static,
{
    shared: Arc<Shared<S, E, A>>,
    worker: Option<JoinHandle<()>>,
    last_fault: Option<String>,
}

impl<S, E, A> ActiveStateMachine<S, E, A>
where
    S: StateId,
    E: EventId,
    A: Send + Sync + 'static,
{
    /// Create a runner over `chart`.
    pub fn new(chart: impl Into<Arc<StateChart<S, E, A>>>) -> Self {
        Self::with_name(chart, None)
    }

    /// Like [`new`](Self::new), with a display name used in logs and
    /// reports.
    pub fn with_name(chart: impl Into<Arc<StateChart<S, E, A>>>, name: Option<&str>) -> Self {
        let engine = Engine::new(chart.into(), name.map(str::to_owned));
        let extensions = engine.container().extensions_handle();
        Self {
            shared: Arc::new(Shared {
                cell: parking_lot::Mutex::new(Cell {
                    engine,
                    pending_initialization: false,
                }),
                queue: EventQueue::new(),
                initialized: AtomicBool::new(false),
                extensions,
                running: AtomicBool::new(false),
            }),
            worker: None,
            last_fault: None,
        }
    }

    /// Set the initial state. Entry runs on the worker's first tick,
    /// not here.
    pub fn initialize(&self, initial: S) -> Result<(), LifecycleError> {
        let mut cell = self.shared.cell.lock();
        if self.shared.initialized.load(Ordering::SeqCst) {
            return Err(LifecycleError::AlreadyInitialized);
        }
        let idx = cell
            .engine
            .resolve(&initial)
            .ok_or_else(|| LifecycleError::UnknownState(format!("{initial:?}")))?;
        cell.engine.container_mut().set_initial(idx);
        cell.pending_initialization = true;
        self.shared.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Spawn the worker. Requires an initialized machine; idempotent
    /// while running.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if self.worker.is_some() {
            return Ok(());
        }
        if !self.shared.initialized.load(Ordering::SeqCst) {
            return Err(LifecycleError::NotInitialized);
        }

        self.shared.queue.resume();
        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || worker_loop(shared)));
        Ok(())
    }

    /// Signal cancellation, join the worker and re-raise its fault if
    /// it panicked. Queued events are retained for a later `start`.
    /// Idempotent.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        self.shared.queue.cancel();
        let result = handle.join();
        self.shared.running.store(false, Ordering::SeqCst);
        match result {
            Ok(()) => Ok(()),
            Err(panic) => {
                let fault = panic_message(&panic);
                tracing::error!(fault = %fault, "worker faulted");
                self.last_fault = Some(fault.clone());
                Err(LifecycleError::WorkerFault(fault))
            }
        }
    }

    /// Append an event to the queue.
    pub fn fire(&self, event: E) -> Result<(), LifecycleError> {
        self.enqueue(event, None, false)
    }

    /// Append an event carrying an argument.
    pub fn fire_with(&self, event: E, argument: A) -> Result<(), LifecycleError> {
        self.enqueue(event, Some(argument), false)
    }

    /// Prepend an event: processed before queued normal events, after
    /// the event currently in flight. Among priority events the newest
    /// wins.
    pub fn fire_priority(&self, event: E) -> Result<(), LifecycleError> {
        self.enqueue(event, None, true)
    }

    /// Prepend an event carrying an argument.
    pub fn fire_priority_with(&self, event: E, argument: A) -> Result<(), LifecycleError> {
        self.enqueue(event, Some(argument), true)
    }

    fn enqueue(&self, event: E, argument: Option<A>, priority: bool) -> Result<(), LifecycleError> {
        // Queue-only path: the worker may be deep inside user code
        // holding the cell, and producers must still return immediately.
        if !self.shared.initialized.load(Ordering::SeqCst) {
            return Err(LifecycleError::NotInitialized);
        }
        let extensions = self.shared.extensions.read().clone();

        let argument = argument.map(Arc::new);
        let info = EventInfo {
            event: event.clone(),
            argument: argument.clone(),
        };
        if priority {
            self.shared.queue.push_front(info);
        } else {
            self.shared.queue.push_back(info);
        }
        tracing::trace!(event = ?event, priority, "event queued");

        // Queue lock already released; observers may fire again from here.
        for ext in extensions {
            if priority {
                ext.event_queued_with_priority(&event, argument.as_deref());
            } else {
                ext.event_queued(&event, argument.as_deref());
            }
        }
        Ok(())
    }

    /// Write the current state and history through `saver`.
    pub fn save(&self, saver: &mut dyn SnapshotSaver<S>) -> Result<(), PersistError> {
        let cell = self.shared.cell.lock();
        persist::save_machine(&cell.engine, saver)
    }

    /// Restore state and history through `loader`. Only legal before
    /// `initialize`.
    pub fn load(&self, loader: &mut dyn SnapshotLoader<S>) -> Result<(), PersistError> {
        let mut cell = self.shared.cell.lock();
        if self.shared.initialized.load(Ordering::SeqCst) {
            return Err(PersistError::AlreadyInitialized);
        }
        persist::load_machine(&mut cell.engine, loader)?;
        cell.pending_initialization = false;
        self.shared.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Register an observer for the transition event stream.
    pub fn add_observer<F>(&self, observer: F)
    where
        F: Fn(&TransitionEvent<'_, S, E, A>) + Send + Sync + 'static,
    {
        self.shared
            .cell
            .lock()
            .engine
            .add_observer(Box::new(observer) as Observer<S, E, A>);
    }

    /// Register an extension.
    pub fn add_extension(&self, ext: Arc<dyn Extension<S, E, A>>) {
        self.shared.cell.lock().engine.add_extension(ext);
    }

    /// Remove all registered extensions.
    pub fn clear_extensions(&self) {
        self.shared.cell.lock().engine.clear_extensions();
    }

    /// Run a report generator over the chart.
    pub fn report<R: ReportGenerator<S, E, A> + ?Sized>(&self, reporter: &mut R) {
        let cell = self.shared.cell.lock();
        reporter.report(
            cell.engine.name(),
            cell.engine.chart(),
            cell.engine.initial_id(),
        );
    }

    /// The current (deepest active) state, cloned out of the runner.
    pub fn current_state(&self) -> Option<S> {
        self.shared.cell.lock().engine.current_id().cloned()
    }

    /// Whether the worker is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Whether `initialize` or `load` has run.
    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::SeqCst)
    }

    /// Events waiting on the queue.
    pub fn pending_events(&self) -> usize {
        self.shared.queue.len()
    }

    /// The most recent worker fault observed by `stop`, if any.
    pub fn last_fault(&self) -> Option<&str> {
        self.last_fault.as_deref()
    }
}

impl<S, E, A> Drop for ActiveStateMachine<S, E, A>
where
    S: StateId,
    E: EventId,
    A: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.shared.queue.cancel();
            let _ = handle.join();
        }
    }
}

fn worker_loop<S, E, A>(shared: Arc<Shared<S, E, A>>)
where
    S: StateId,
    E: EventId,
    A: Send + Sync + 'static,
{
    shared.running.store(true, Ordering::SeqCst);
    let (name, extensions) = {
        let cell = shared.cell.lock();
        (
            cell.engine.name().map(str::to_owned),
            cell.engine.extensions_snapshot(),
        )
    };
    tracing::info!(machine = name.as_deref().unwrap_or("<unnamed>"), "worker started");
    for ext in &extensions {
        ext.started_state_machine(name.as_deref());
    }

    loop {
        if shared.queue.is_cancelled() {
            break;
        }
        {
            let mut cell = shared.cell.lock();
            if cell.pending_initialization {
                cell.engine.enter_initial();
                cell.pending_initialization = false;
            }
        }
        match shared.queue.next() {
            Some(info) => {
                let mut cell = shared.cell.lock();
                cell.engine.fire(&info.event, info.argument.as_deref());
            }
            None => break,
        }
    }

    // Extensions registered while running still observe the stop.
    let extensions = shared.cell.lock().engine.extensions_snapshot();
    for ext in &extensions {
        ext.stopped_state_machine(name.as_deref());
    }
    tracing::info!(machine = name.as_deref().unwrap_or("<unnamed>"), "worker stopped");
    shared.running.store(false, Ordering::SeqCst);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker panicked".to_owned()
    }
}
