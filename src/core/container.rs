//! Mutable runtime state of one machine.

use crate::core::state::StateIdx;
use crate::extension::Extension;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to a machine's extension list.
///
/// The list has its own lock so that the active runner's producers can
/// notify queueing extensions without touching the worker-owned parts
/// of the container.
pub(crate) type ExtensionList<S, E, A> = Arc<RwLock<Vec<Arc<dyn Extension<S, E, A>>>>>;

/// Holds everything about a machine that changes at runtime: the current
/// state, the recorded history, the registered extensions and the display
/// name. Definitions stay in the chart; the container never owns them.
///
/// Apart from the extension list, the container is not internally
/// synchronized. In active mode only the worker mutates it; in passive
/// mode the caller must not fire concurrently.
pub struct StateContainer<S, E, A> {
    current: Option<StateIdx>,
    initial: Option<StateIdx>,
    last_active: HashMap<StateIdx, StateIdx>,
    extensions: ExtensionList<S, E, A>,
    name: Option<String>,
}

impl<S, E, A> StateContainer<S, E, A> {
    pub(crate) fn new(name: Option<String>) -> Self {
        Self {
            current: None,
            initial: None,
            last_active: HashMap::new(),
            extensions: Arc::new(RwLock::new(Vec::new())),
            name,
        }
    }

    pub(crate) fn current(&self) -> Option<StateIdx> {
        self.current
    }

    pub(crate) fn set_current(&mut self, idx: StateIdx) {
        self.current = Some(idx);
    }

    pub(crate) fn initial(&self) -> Option<StateIdx> {
        self.initial
    }

    pub(crate) fn set_initial(&mut self, idx: StateIdx) {
        self.initial = Some(idx);
    }

    pub(crate) fn set_last_active(&mut self, composite: StateIdx, leaf: StateIdx) {
        self.last_active.insert(composite, leaf);
    }

    pub(crate) fn last_active_of(&self, composite: StateIdx) -> Option<StateIdx> {
        self.last_active.get(&composite).copied()
    }

    pub(crate) fn history(&self) -> &HashMap<StateIdx, StateIdx> {
        &self.last_active
    }

    pub(crate) fn restore(
        &mut self,
        current: Option<StateIdx>,
        history: HashMap<StateIdx, StateIdx>,
    ) {
        self.current = current;
        self.last_active = history;
    }

    /// Cheap clone of the registered extensions, in registration order.
    /// Taken before every notification round so callbacks never run
    /// under the list lock.
    pub(crate) fn extensions_snapshot(&self) -> Vec<Arc<dyn Extension<S, E, A>>> {
        self.extensions.read().clone()
    }

    pub(crate) fn extensions_handle(&self) -> ExtensionList<S, E, A> {
        Arc::clone(&self.extensions)
    }

    pub(crate) fn add_extension(&self, ext: Arc<dyn Extension<S, E, A>>) {
        self.extensions.write().push(ext);
    }

    pub(crate) fn clear_extensions(&self) {
        self.extensions.write().clear();
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
