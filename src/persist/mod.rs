//! Snapshot and restore of machine state.
//!
//! The engine knows nothing about formats: it writes through a
//! [`SnapshotSaver`] and reads through a [`SnapshotLoader`], always
//! current state first, then the history map. [`Snapshot`] is the
//! bundled implementation of both contracts — a plain serde value with a
//! format version and a timestamp.

pub mod error;

pub use error::PersistError;

use crate::core::state::StateIdx;
use crate::engine::Engine;
use crate::{EventId, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Snapshot format version written by [`Snapshot`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Receives a machine's persistable state. Current state is written
/// before history.
pub trait SnapshotSaver<S> {
    /// Record the current state, or an empty slot for a machine that
    /// has not entered one.
    fn save_current_state(&mut self, current: Option<&S>) -> Result<(), PersistError>;

    /// Record the history map (composite id → last active leaf id).
    fn save_history_states(&mut self, history: &HashMap<S, S>) -> Result<(), PersistError>;
}

/// Produces a machine's persistable state. Must yield what a previous
/// save produced; the format in between is the implementation's concern.
pub trait SnapshotLoader<S> {
    /// The recorded current state, if any.
    fn load_current_state(&mut self) -> Result<Option<S>, PersistError>;

    /// The recorded history map.
    fn load_history_states(&mut self) -> Result<HashMap<S, S>, PersistError>;
}

pub(crate) fn save_machine<S, E, A>(
    engine: &Engine<S, E, A>,
    saver: &mut dyn SnapshotSaver<S>,
) -> Result<(), PersistError>
where
    S: StateId,
    E: EventId,
{
    let chart = engine.chart();
    saver.save_current_state(engine.current_id())?;

    let history: HashMap<S, S> = engine
        .container()
        .history()
        .iter()
        .map(|(&composite, &leaf)| (chart.id_of(composite).clone(), chart.id_of(leaf).clone()))
        .collect();
    saver.save_history_states(&history)?;
    Ok(())
}

pub(crate) fn load_machine<S, E, A>(
    engine: &mut Engine<S, E, A>,
    loader: &mut dyn SnapshotLoader<S>,
) -> Result<(), PersistError>
where
    S: StateId,
    E: EventId,
{
    let current_id = loader.load_current_state()?;
    let history_ids = loader.load_history_states()?;

    let chart = Arc::clone(engine.chart());
    let current: Option<StateIdx> = match &current_id {
        Some(id) => Some(resolve(&chart, id)?),
        None => None,
    };

    let mut history: HashMap<StateIdx, StateIdx> = HashMap::new();
    for (composite_id, leaf_id) in &history_ids {
        let composite = resolve(&chart, composite_id)?;
        let leaf = resolve(&chart, leaf_id)?;
        if !chart.is_descendant(leaf, composite) {
            return Err(PersistError::InvalidHistoryState {
                composite: format!("{composite_id:?}"),
                leaf: format!("{leaf_id:?}"),
            });
        }
        history.insert(composite, leaf);
    }

    engine.container_mut().restore(current, history);
    tracing::debug!(current = ?current_id, entries = history_ids.len(), "snapshot loaded");

    for ext in engine.extensions_snapshot() {
        ext.loaded(engine.name(), current_id.as_ref(), &history_ids);
    }
    Ok(())
}

fn resolve<S, E, A>(
    chart: &crate::StateChart<S, E, A>,
    id: &S,
) -> Result<StateIdx, PersistError>
where
    S: StateId,
    E: EventId,
{
    chart
        .idx_of(id)
        .ok_or_else(|| PersistError::UnknownState(format!("{id:?}")))
}

/// Serializable snapshot implementing both persistence contracts.
///
/// Save into it, ship it as JSON, load from it later:
///
/// ```
/// use strata::{ChartBuilder, Snapshot, StateMachine};
///
/// let chart = std::sync::Arc::new(
///     ChartBuilder::<String, String, ()>::new()
///         .state("a".into(), |s| s.on("go".into(), |t| t.go_to("b".into())))
///         .state("b".into(), |s| s)
///         .build()?,
/// );
///
/// let mut machine = StateMachine::new(std::sync::Arc::clone(&chart));
/// machine.initialize("a".into())?;
/// machine.fire("go".into())?;
///
/// let mut snapshot = Snapshot::new();
/// machine.save(&mut snapshot)?;
/// let json = snapshot.to_json()?;
///
/// let mut loaded = Snapshot::<String>::from_json(&json)?;
/// let mut restored = StateMachine::new(chart);
/// restored.load(&mut loaded)?;
/// assert_eq!(restored.current_state(), Some(&"b".to_string()));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S: Serialize",
    deserialize = "S: serde::de::DeserializeOwned + Eq + Hash"
))]
pub struct Snapshot<S> {
    version: u32,
    saved_at: DateTime<Utc>,
    current: Option<S>,
    history: HashMap<S, S>,
}

impl<S> Default for Snapshot<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Snapshot<S> {
    /// An empty snapshot at the current format version.
    pub fn new() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            current: None,
            history: HashMap::new(),
        }
    }

    /// The recorded current state.
    pub fn current(&self) -> Option<&S> {
        self.current.as_ref()
    }

    /// The recorded history map.
    pub fn history(&self) -> &HashMap<S, S> {
        &self.history
    }

    /// When the snapshot was written.
    pub fn saved_at(&self) -> DateTime<Utc> {
        self.saved_at
    }
}

impl<S> Snapshot<S>
where
    S: Serialize + serde::de::DeserializeOwned + Eq + Hash,
{
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(|e| PersistError::Backend(Box::new(e)))
    }

    /// Deserialize from JSON, rejecting unknown format versions.
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| PersistError::Backend(Box::new(e)))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

impl<S: Clone> SnapshotSaver<S> for Snapshot<S> {
    fn save_current_state(&mut self, current: Option<&S>) -> Result<(), PersistError> {
        self.current = current.cloned();
        self.saved_at = Utc::now();
        Ok(())
    }

    fn save_history_states(&mut self, history: &HashMap<S, S>) -> Result<(), PersistError> {
        self.history = history.clone();
        Ok(())
    }
}

impl<S: Clone + Eq + Hash> SnapshotLoader<S> for Snapshot<S> {
    fn load_current_state(&mut self) -> Result<Option<S>, PersistError> {
        Ok(self.current.clone())
    }

    fn load_history_states(&mut self) -> Result<HashMap<S, S>, PersistError> {
        Ok(self.history.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChartBuilder;
    use crate::{HistoryKind, StateChart, StateMachine};

    fn player_chart() -> StateChart<&'static str, &'static str, ()> {
        ChartBuilder::new()
            .state("player", |s| {
                s.initial("stopped")
                    .history(HistoryKind::Shallow)
                    .on("sleep", |t| t.go_to("off"))
            })
            .state("stopped", |s| s.parent("player").on("play", |t| t.go_to("playing")))
            .state("playing", |s| s.parent("player").on("stop", |t| t.go_to("stopped")))
            .state("off", |s| s.on("wake", |t| t.go_to("player")))
            .build()
            .unwrap()
    }

    #[test]
    fn save_then_load_restores_current_and_history() {
        let chart = Arc::new(player_chart());
        let mut machine = StateMachine::new(Arc::clone(&chart));
        machine.initialize("player").unwrap();
        machine.fire("play").unwrap();
        assert_eq!(machine.current_state(), Some(&"playing"));

        let mut snapshot = Snapshot::new();
        machine.save(&mut snapshot).unwrap();
        assert_eq!(snapshot.current(), Some(&"playing"));

        let mut restored = StateMachine::new(chart);
        restored.load(&mut snapshot.clone()).unwrap();
        assert_eq!(restored.current_state(), Some(&"playing"));
    }

    #[test]
    fn history_entries_survive_the_round_trip() {
        let chart = Arc::new(player_chart());
        let mut machine = StateMachine::new(Arc::clone(&chart));

        // Reach "playing", then leave the player so history is recorded.
        machine.initialize("player").unwrap();
        machine.fire("play").unwrap();
        machine.fire("sleep").unwrap();
        assert_eq!(machine.current_state(), Some(&"off"));

        let mut snapshot = Snapshot::new();
        machine.save(&mut snapshot).unwrap();
        assert_eq!(snapshot.history().get(&"player"), Some(&"playing"));

        // A restored machine re-enters the player through its history.
        let mut restored = StateMachine::new(chart);
        restored.load(&mut snapshot).unwrap();
        restored.fire("wake").unwrap();
        assert_eq!(restored.current_state(), Some(&"playing"));
    }

    #[test]
    fn load_rejects_history_leaf_outside_its_composite() {
        let mut snapshot = Snapshot::new();
        snapshot
            .save_current_state(Some(&"stopped"))
            .unwrap();
        snapshot
            .save_history_states(&HashMap::from([("player", "off")]))
            .unwrap();

        let mut machine = StateMachine::new(player_chart());
        assert!(matches!(
            machine.load(&mut snapshot),
            Err(PersistError::InvalidHistoryState { .. })
        ));
    }

    #[test]
    fn load_rejects_unknown_states() {
        let mut snapshot = Snapshot::new();
        snapshot.save_current_state(Some(&"ghost")).unwrap();

        let mut machine = StateMachine::new(player_chart());
        assert!(matches!(
            machine.load(&mut snapshot),
            Err(PersistError::UnknownState(_))
        ));
    }

    #[test]
    fn load_after_initialize_is_rejected() {
        let mut machine = StateMachine::new(player_chart());
        machine.initialize("off").unwrap();

        let mut snapshot = Snapshot::<&str>::new();
        assert!(matches!(
            machine.load(&mut snapshot),
            Err(PersistError::AlreadyInitialized)
        ));
    }

    #[test]
    fn empty_snapshot_consumes_the_slot_but_blocks_firing() {
        let mut machine = StateMachine::new(player_chart());
        machine.load(&mut Snapshot::new()).unwrap();

        assert!(machine.is_initialized());
        assert!(machine.fire("wake").is_err());
        assert!(machine.initialize("off").is_err());
    }

    #[test]
    fn json_round_trip_preserves_the_snapshot() {
        let mut snapshot = Snapshot::new();
        snapshot.save_current_state(Some(&"playing".to_string())).unwrap();
        snapshot
            .save_history_states(&HashMap::from([(
                "player".to_string(),
                "playing".to_string(),
            )]))
            .unwrap();

        let json = snapshot.to_json().unwrap();
        let back = Snapshot::<String>::from_json(&json).unwrap();

        assert_eq!(back.current(), Some(&"playing".to_string()));
        assert_eq!(back.history(), snapshot.history());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let json = format!(
            r#"{{"version":99,"saved_at":"{}","current":null,"history":{{}}}}"#,
            Utc::now().to_rfc3339()
        );
        assert!(matches!(
            Snapshot::<String>::from_json(&json),
            Err(PersistError::UnsupportedVersion { found: 99, .. })
        ));
    }
}
