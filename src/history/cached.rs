//! Patch history with a cached current state.

use super::{replay_failed, verify, Reversible};
use crate::error::{HistoryError, Result};
use crate::patch::{apply_patches, diff_and_apply_in_place, Draft, PatchPair, PatchSet};
use crate::types::{EntrySummary, HistoryConfig, HistorySnapshot, Strategy};
use crate::window::HistoryWindow;
use serde_json::Value;
use std::borrow::Cow;

/// Patch history that keeps the current state materialized.
///
/// Each entry holds the forward patches of one update and the inverse
/// patches that reverse it. Undo applies the inverse set of the entry at
/// the cursor to the cached state; redo applies the next forward set.
/// Both cost O(size of that entry), never O(size of the state).
///
/// # Invariants
///
/// 1. `current` equals the anchor with every applied forward set folded
///    in, in order.
/// 2. The anchor is the initial state with every evicted forward set
///    folded in, so invariant 1 survives eviction.
#[derive(Clone, Debug)]
pub struct CachedPatchHistory {
    initial: Value,
    /// Base of the retained window; `None` until something is evicted.
    anchor: Option<Value>,
    current: Value,
    window: HistoryWindow<PatchPair>,
    config: HistoryConfig,
}

impl CachedPatchHistory {
    pub fn new(initial: Value, config: HistoryConfig) -> Self {
        Self {
            current: initial.clone(),
            initial,
            anchor: None,
            window: HistoryWindow::new(config.capacity),
            config,
        }
    }

    /// The state the retained patches start from.
    pub fn anchor(&self) -> &Value {
        self.anchor.as_ref().unwrap_or(&self.initial)
    }

    /// Forward patch sets, oldest first.
    pub fn patches(&self) -> impl Iterator<Item = &PatchSet> {
        self.window.iter().map(|pair| &pair.forward)
    }

    /// Inverse patch sets, parallel to [`patches`](Self::patches).
    pub fn inverse_patches(&self) -> impl Iterator<Item = &PatchSet> {
        self.window.iter().map(|pair| &pair.inverse)
    }

    /// Position of the last applied entry, `-1` at the anchor.
    pub fn current_index(&self) -> isize {
        self.window.current_index()
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn fold_evicted(&mut self, evicted: Vec<PatchPair>) -> Result<()> {
        if evicted.is_empty() {
            return Ok(());
        }
        let mut anchor = self.anchor.take().unwrap_or_else(|| self.initial.clone());
        let result = evicted
            .iter()
            .try_for_each(|pair| apply_patches(&mut anchor, &pair.forward));
        self.anchor = Some(anchor);
        result.map_err(|e| {
            HistoryError::InvariantViolation(format!("evicted patch set did not fold into anchor: {}", e))
        })
    }

    /// Fold the applied forward sets onto the anchor.
    fn derive_from_anchor(&self) -> Result<Value> {
        let mut derived = self.anchor().clone();
        for pair in self.window.applied() {
            apply_patches(&mut derived, &pair.forward).map_err(|e| {
                HistoryError::InvariantViolation(format!("recorded patch set did not apply: {}", e))
            })?;
        }
        Ok(derived)
    }
}

impl Reversible for CachedPatchHistory {
    fn strategy(&self) -> Strategy {
        Strategy::CachedPatch
    }

    fn current_state(&self) -> Cow<'_, Value> {
        Cow::Borrowed(&self.current)
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
        let pair = diff_and_apply_in_place(&mut self.current, mutate)?;
        if pair.is_empty() {
            tracing::trace!("no structural change, nothing recorded");
            return Ok(false);
        }

        let patches = pair.forward.len();
        let evicted = self.window.record(pair);
        self.fold_evicted(evicted)?;
        tracing::debug!(
            index = self.window.current_index(),
            patches,
            "recorded patch entry"
        );

        verify(self.config.verify_invariants, || self.check_invariants());
        Ok(true)
    }

    fn undo(&mut self) -> bool {
        let inverse = match self.window.peek_back() {
            Some(pair) => &pair.inverse,
            None => return false,
        };
        if let Err(err) = apply_patches(&mut self.current, inverse) {
            replay_failed("undo", &err);
            return false;
        }
        self.window.step_back();
        tracing::trace!(index = self.window.current_index(), "undo");

        verify(self.config.verify_invariants, || self.check_invariants());
        true
    }

    fn redo(&mut self) -> bool {
        let forward = match self.window.peek_forward() {
            Some(pair) => &pair.forward,
            None => return false,
        };
        if let Err(err) = apply_patches(&mut self.current, forward) {
            replay_failed("redo", &err);
            return false;
        }
        self.window.step_forward();
        tracing::trace!(index = self.window.current_index(), "redo");

        verify(self.config.verify_invariants, || self.check_invariants());
        true
    }

    fn reset(&mut self) {
        self.current = self.initial.clone();
        self.anchor = None;
        self.window.clear();
        tracing::debug!("cached patch history reset");
    }

    fn history_snapshot(&self) -> HistorySnapshot {
        let cursor = self.window.cursor();
        let entries = self
            .window
            .iter()
            .enumerate()
            .map(|(index, pair)| EntrySummary {
                index,
                applied: index < cursor,
                patches: Some(pair.forward.len()),
                inverse_patches: Some(pair.inverse.len()),
            })
            .collect();

        HistorySnapshot {
            strategy: Strategy::CachedPatch,
            capacity: self.window.capacity(),
            current_index: self.window.current_index(),
            undo_depth: cursor,
            redo_depth: self.window.len() - cursor,
            entries,
        }
    }

    fn check_invariants(&self) -> Result<()> {
        self.window.check_invariants()?;
        let derived = self.derive_from_anchor()?;
        if derived != self.current {
            return Err(HistoryError::InvariantViolation(format!(
                "cached state diverged from patch history at index {}",
                self.window.current_index()
            )));
        }
        Ok(())
    }
}
