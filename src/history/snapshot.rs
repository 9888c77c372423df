//! Full-snapshot history: the copy-everything baseline.

use super::{verify, Reversible};
use crate::error::{HistoryError, Result};
use crate::patch::{diff_and_apply, Draft};
use crate::types::{EntrySummary, HistoryConfig, HistorySnapshot, Strategy};
use crate::window::{push_bounded, truncate_branch};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::VecDeque;

/// History kept as whole copies of every past and future state.
///
/// `past` runs oldest to newest (its back is the next undo target) and
/// `future` runs nearest to farthest (its front is the next redo target).
/// Every recorded change costs a comparison and a move of the entire
/// state, however small the edit was.
#[derive(Clone, Debug)]
pub struct SnapshotHistory<T = Value> {
    initial: T,
    past: VecDeque<T>,
    present: T,
    future: VecDeque<T>,
    config: HistoryConfig,
}

impl<T: Clone + PartialEq> SnapshotHistory<T> {
    pub fn new(initial: T, config: HistoryConfig) -> Self {
        Self {
            present: initial.clone(),
            initial,
            past: VecDeque::new(),
            future: VecDeque::new(),
            config,
        }
    }

    pub fn present(&self) -> &T {
        &self.present
    }

    /// Undo targets, oldest first.
    pub fn past(&self) -> &VecDeque<T> {
        &self.past
    }

    /// Redo targets, nearest first.
    pub fn future(&self) -> &VecDeque<T> {
        &self.future
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Replace the present with `reduce(present)`.
    ///
    /// `reduce` builds a new value rather than editing in place. Nothing
    /// is recorded when the result equals the present state.
    pub fn update_with<F>(&mut self, reduce: F) -> Result<bool>
    where
        F: FnOnce(&T) -> Result<T>,
    {
        let next = reduce(&self.present)?;
        if next == self.present {
            tracing::trace!("no structural change, nothing recorded");
            return Ok(false);
        }
        self.record(next);
        Ok(true)
    }

    fn record(&mut self, next: T) {
        let previous = std::mem::replace(&mut self.present, next);
        let discarded = truncate_branch(&mut self.future, 0);
        let evicted = push_bounded(&mut self.past, previous, self.config.capacity);
        tracing::debug!(
            undo_depth = self.past.len(),
            discarded,
            evicted = evicted.len(),
            "recorded snapshot"
        );

        verify(self.config.verify_invariants, || self.check_bounds());
    }

    pub fn undo(&mut self) -> bool {
        let previous = match self.past.pop_back() {
            Some(state) => state,
            None => return false,
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push_front(current);
        tracing::trace!(undo_depth = self.past.len(), redo_depth = self.future.len(), "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let next = match self.future.pop_front() {
            Some(state) => state,
            None => return false,
        };
        let current = std::mem::replace(&mut self.present, next);
        push_bounded(&mut self.past, current, self.config.capacity);
        tracing::trace!(undo_depth = self.past.len(), redo_depth = self.future.len(), "redo");
        true
    }

    pub fn reset(&mut self) {
        self.present = self.initial.clone();
        self.past.clear();
        self.future.clear();
        tracing::debug!("snapshot history reset");
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn history_snapshot(&self) -> HistorySnapshot {
        let past = self.past.iter().map(|_| true);
        let future = self.future.iter().map(|_| false);
        let entries = past
            .chain(future)
            .enumerate()
            .map(|(index, applied)| EntrySummary {
                index,
                applied,
                patches: None,
                inverse_patches: None,
            })
            .collect();

        HistorySnapshot {
            strategy: Strategy::Snapshot,
            capacity: self.config.capacity,
            current_index: self.past.len() as isize - 1,
            undo_depth: self.past.len(),
            redo_depth: self.future.len(),
            entries,
        }
    }

    fn check_bounds(&self) -> Result<()> {
        if let Some(limit) = self.config.capacity.limit() {
            if self.past.len() > limit {
                return Err(HistoryError::InvariantViolation(format!(
                    "{} past snapshots retained with capacity {}",
                    self.past.len(),
                    limit
                )));
            }
        }
        Ok(())
    }
}

impl Reversible for SnapshotHistory<Value> {
    fn strategy(&self) -> Strategy {
        Strategy::Snapshot
    }

    fn current_state(&self) -> Cow<'_, Value> {
        Cow::Borrowed(&self.present)
    }

    fn can_undo(&self) -> bool {
        SnapshotHistory::can_undo(self)
    }

    fn can_redo(&self) -> bool {
        SnapshotHistory::can_redo(self)
    }

    fn update<F>(&mut self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Draft<'_>) -> Result<()>,
    {
        // Empty patches mean the draft made no net change.
        let diffed = diff_and_apply(&self.present, mutate)?;
        if diffed.patches.is_empty() {
            tracing::trace!("no structural change, nothing recorded");
            return Ok(false);
        }
        self.record(diffed.state);
        Ok(true)
    }

    fn undo(&mut self) -> bool {
        SnapshotHistory::undo(self)
    }

    fn redo(&mut self) -> bool {
        SnapshotHistory::redo(self)
    }

    fn reset(&mut self) {
        SnapshotHistory::reset(self)
    }

    fn history_snapshot(&self) -> HistorySnapshot {
        SnapshotHistory::history_snapshot(self)
    }

    fn check_invariants(&self) -> Result<()> {
        self.check_bounds()
    }
}
