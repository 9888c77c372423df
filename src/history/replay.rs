//! Patch history that derives the current state on every read.

use super::{verify, Reversible};
use crate::error::{HistoryError, Result};
use crate::patch::{apply_patches, diff_and_apply_in_place, Draft, PatchSet};
use crate::types::{EntrySummary, HistoryConfig, HistorySnapshot, Strategy};
use crate::window::HistoryWindow;
use serde_json::Value;
use std::borrow::Cow;

/// Patch history holding only a base state and forward patch sets.
///
/// Undo and redo move the cursor and nothing else. Reading the state
/// folds every applied patch set onto the base, so reads are linear in
/// history depth. Redo replays the recorded forward set verbatim.
///
/// Evicted patch sets are folded into the base, so the base always sits
/// at the oldest retained position.
#[derive(Clone, Debug)]
pub struct ReplayPatchHistory {
    initial: Value,
    base: Value,
    window: HistoryWindow<PatchSet>,
    config: HistoryConfig,
}

impl ReplayPatchHistory {
    pub fn new(initial: Value, config: HistoryConfig) -> Self {
        Self {
            base: initial.clone(),
            initial,
            window: HistoryWindow::new(config.capacity),
            config,
        }
    }

    pub fn base_state(&self) -> &Value {
        &self.base
    }

    /// Forward patch sets, oldest first.
    pub fn patches(&self) -> impl Iterator<Item = &PatchSet> {
        self.window.iter()
    }

    /// Position of the last applied patch set, `-1` at the base.
    pub fn current_index(&self) -> isize {
        self.window.current_index()
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Fold the applied patch sets onto the base.
    pub fn try_current_state(&self) -> Result<Value> {
        let mut state = self.base.clone();
        for (index, patches) in self.window.applied().enumerate() {
            apply_patches(&mut state, patches).map_err(|e| {
                HistoryError::InvariantViolation(format!(
                    "patch set {} did not apply to derived state: {}",
                    index, e
                ))
            })?;
        }
        Ok(state)
    }
}

impl Reversible for ReplayPatchHistory {
    fn strategy(&self) -> Strategy {
        Strategy::ReplayPatch
    }

    fn current_state(&self) -> Cow<'_, Value> {
        match self.try_current_state() {
            Ok(state) => Cow::Owned(state),
            Err(err) => {
                tracing::error!(error = %err, "could not derive current state, returning base");
                debug_assert!(false, "could not derive current state: {}", err);
                Cow::Borrowed(&self.base)
            }
        }
    }

    fn can_undo(&self) -> bool {
        self.window.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.window.can_redo()
    }

    fn update<F>(&mut self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Draft<'_>) -> Result<()>,
    {
        let mut state = self.try_current_state()?;
        let forward = diff_and_apply_in_place(&mut state, mutate)?.forward;
        if forward.is_empty() {
            tracing::trace!("no structural change, nothing recorded");
            return Ok(false);
        }

        let patches = forward.len();
        for evicted in self.window.record(forward) {
            apply_patches(&mut self.base, &evicted).map_err(|e| {
                HistoryError::InvariantViolation(format!("evicted patch set did not fold into base: {}", e))
            })?;
        }
        tracing::debug!(
            index = self.window.current_index(),
            patches,
            "recorded patch entry"
        );

        verify(self.config.verify_invariants, || self.check_invariants());
        Ok(true)
    }

    fn undo(&mut self) -> bool {
        let moved = self.window.step_back().is_some();
        if moved {
            tracing::trace!(index = self.window.current_index(), "undo");
        }
        moved
    }

    fn redo(&mut self) -> bool {
        let moved = self.window.step_forward().is_some();
        if moved {
            tracing::trace!(index = self.window.current_index(), "redo");
        }
        moved
    }

    fn reset(&mut self) {
        self.base = self.initial.clone();
        self.window.clear();
        tracing::debug!("replay patch history reset");
    }

    fn history_snapshot(&self) -> HistorySnapshot {
        let cursor = self.window.cursor();
        let entries = self
            .window
            .iter()
            .enumerate()
            .map(|(index, patches)| EntrySummary {
                index,
                applied: index < cursor,
                patches: Some(patches.len()),
                inverse_patches: None,
            })
            .collect();

        HistorySnapshot {
            strategy: Strategy::ReplayPatch,
            capacity: self.window.capacity(),
            current_index: self.window.current_index(),
            undo_depth: cursor,
            redo_depth: self.window.len() - cursor,
            entries,
        }
    }

    fn check_invariants(&self) -> Result<()> {
        self.window.check_invariants()?;
        // Every retained set, applied or not, must replay cleanly.
        let mut state = self.base.clone();
        for patches in self.window.iter() {
            apply_patches(&mut state, patches).map_err(|e| {
                HistoryError::InvariantViolation(format!("retained patch set does not replay: {}", e))
            })?;
        }
        Ok(())
    }
}
