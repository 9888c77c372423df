//! Reversible history engines.
//!
//! Three interchangeable implementations of one contract:
//!
//! | Engine | Stores | Update | Undo/Redo | Read |
//! |--------|--------|--------|-----------|------|
//! | [`SnapshotHistory`] | full past/future states | O(state) | O(1) move | O(1) |
//! | [`CachedPatchHistory`] | current state + forward/inverse patches | O(change) | O(change) | O(1) |
//! | [`ReplayPatchHistory`] | base state + forward patches | O(depth) | O(1) | O(depth) |
//!
//! The replay engine is the leanest per entry but every read folds all
//! applied patch sets onto the base, so reads grow with history depth
//! unless the host caches them. The cached engine reads in O(1) and pays
//! patch application only on undo/redo, at the price of keeping its cached
//! state exactly in step with its cursor.
//!
//! All three share the branch-truncation and eviction policy in
//! [`window`](crate::window).

mod cached;
mod replay;
mod snapshot;

pub use cached::CachedPatchHistory;
pub use replay::ReplayPatchHistory;
pub use snapshot::SnapshotHistory;

use crate::error::{HistoryError, Result};
use crate::patch::Draft;
use crate::types::{HistoryConfig, HistorySnapshot, Strategy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;

/// A reversible history engine over JSON-shaped state.
///
/// Commands run to completion synchronously. Observation is pull-based:
/// call [`current_state`](Self::current_state) after a command.
pub trait Reversible {
    fn strategy(&self) -> Strategy;

    /// The state at the current position.
    fn current_state(&self) -> Cow<'_, Value>;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Apply `mutate` to the current state and record the change.
    ///
    /// Returns `Ok(false)` when the mutation changed nothing; no entry is
    /// recorded then. On error the engine is left exactly as it was.
    fn update<F>(&mut self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Draft<'_>) -> Result<()>;

    /// Step back one entry. Returns `false` when there is nothing to undo.
    fn undo(&mut self) -> bool;

    /// Step forward one entry. Returns `false` when there is nothing to redo.
    fn redo(&mut self) -> bool;

    /// Return to the initial state and forget all history.
    fn reset(&mut self);

    fn history_snapshot(&self) -> HistorySnapshot;

    /// Verify internal consistency. An error here is an engine bug.
    fn check_invariants(&self) -> Result<()>;

    /// Deserialize the current state into a typed value.
    fn current_as<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(self.current_state().as_ref())
            .map_err(|e| HistoryError::Deserialization(e.to_string()))
    }
}

/// Host-selectable engine.
#[derive(Clone, Debug)]
pub enum History {
    Snapshot(SnapshotHistory),
    CachedPatch(CachedPatchHistory),
    ReplayPatch(ReplayPatchHistory),
}

impl History {
    /// Build the engine named by `config.strategy`.
    pub fn create(initial: Value, config: HistoryConfig) -> Self {
        tracing::debug!(strategy = %config.strategy, capacity = ?config.capacity, "creating history");
        match config.strategy {
            Strategy::Snapshot => History::Snapshot(SnapshotHistory::new(initial, config)),
            Strategy::CachedPatch => History::CachedPatch(CachedPatchHistory::new(initial, config)),
            Strategy::ReplayPatch => History::ReplayPatch(ReplayPatchHistory::new(initial, config)),
        }
    }

    /// Build from any serializable initial state.
    pub fn from_serializable<T: Serialize + ?Sized>(initial: &T, config: HistoryConfig) -> Result<Self> {
        let initial = serde_json::to_value(initial)
            .map_err(|e| HistoryError::Unrepresentable(e.to_string()))?;
        Ok(Self::create(initial, config))
    }
}

impl Reversible for History {
    fn strategy(&self) -> Strategy {
        match self {
            History::Snapshot(h) => h.strategy(),
            History::CachedPatch(h) => h.strategy(),
            History::ReplayPatch(h) => h.strategy(),
        }
    }

    fn current_state(&self) -> Cow<'_, Value> {
        match self {
            History::Snapshot(h) => Reversible::current_state(h),
            History::CachedPatch(h) => Reversible::current_state(h),
            History::ReplayPatch(h) => Reversible::current_state(h),
        }
    }

    fn can_undo(&self) -> bool {
        match self {
            History::Snapshot(h) => h.can_undo(),
            History::CachedPatch(h) => h.can_undo(),
            History::ReplayPatch(h) => h.can_undo(),
        }
    }

    fn can_redo(&self) -> bool {
        match self {
            History::Snapshot(h) => h.can_redo(),
            History::CachedPatch(h) => h.can_redo(),
            History::ReplayPatch(h) => h.can_redo(),
        }
    }

    fn update<F>(&mut self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Draft<'_>) -> Result<()>,
    {
        match self {
            History::Snapshot(h) => h.update(mutate),
            History::CachedPatch(h) => h.update(mutate),
            History::ReplayPatch(h) => h.update(mutate),
        }
    }

    fn undo(&mut self) -> bool {
        match self {
            History::Snapshot(h) => h.undo(),
            History::CachedPatch(h) => h.undo(),
            History::ReplayPatch(h) => h.undo(),
        }
    }

    fn redo(&mut self) -> bool {
        match self {
            History::Snapshot(h) => h.redo(),
            History::CachedPatch(h) => h.redo(),
            History::ReplayPatch(h) => h.redo(),
        }
    }

    fn reset(&mut self) {
        match self {
            History::Snapshot(h) => h.reset(),
            History::CachedPatch(h) => h.reset(),
            History::ReplayPatch(h) => h.reset(),
        }
    }

    fn history_snapshot(&self) -> HistorySnapshot {
        match self {
            History::Snapshot(h) => h.history_snapshot(),
            History::CachedPatch(h) => h.history_snapshot(),
            History::ReplayPatch(h) => h.history_snapshot(),
        }
    }

    fn check_invariants(&self) -> Result<()> {
        match self {
            History::Snapshot(h) => h.check_invariants(),
            History::CachedPatch(h) => h.check_invariants(),
            History::ReplayPatch(h) => h.check_invariants(),
        }
    }
}

/// Run `check` when verification is enabled and panic if it fails.
pub(crate) fn verify<F>(enabled: bool, check: F)
where
    F: FnOnce() -> Result<()>,
{
    if !enabled {
        return;
    }
    if let Err(err) = check() {
        tracing::error!(error = %err, "history invariant violated");
        panic!("history invariant violated: {}", err);
    }
}

/// Report a recorded patch that failed to apply during undo/redo.
pub(crate) fn replay_failed(direction: &'static str, err: &HistoryError) {
    tracing::error!(direction, error = %err, "recorded patch set failed to apply");
    debug_assert!(false, "recorded patch set failed to apply on {}: {}", direction, err);
}
