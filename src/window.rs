//! History window policy shared by every engine.
//!
//! Two rules, applied the same way whether entries are full snapshots or
//! patch sets:
//!
//! - **Branch truncation**: recording a new entry discards every entry
//!   after the current position. There is no redo after a new edit.
//! - **Capacity eviction**: with a bounded capacity `N`, recording keeps
//!   the `N - 1` most recent entries plus the new one. Eviction always
//!   takes from the oldest end.
//!
//! ```text
//! record(e4), capacity 3
//! ┌─────────────────────────────────────────┐
//! │ entries: [e1, e2, e3]  cursor: 3        │
//! │ entries: [e2, e3, e4]  cursor: 3        │  e1 evicted
//! └─────────────────────────────────────────┘
//!
//! step_back() x2, then record(e5)
//! ┌─────────────────────────────────────────┐
//! │ entries: [e2, e3, e4]  cursor: 1        │
//! │ entries: [e2, e5]      cursor: 2        │  e3, e4 truncated
//! └─────────────────────────────────────────┘
//! ```

use crate::error::{HistoryError, Result};
use crate::types::Capacity;
use std::collections::VecDeque;

/// Drop every entry at position `keep` and after. Returns how many were
/// discarded.
pub fn truncate_branch<E>(entries: &mut VecDeque<E>, keep: usize) -> usize {
    let discarded = entries.len().saturating_sub(keep);
    entries.truncate(keep);
    discarded
}

/// Append `entry`, evicting from the front so the length never exceeds
/// the capacity. Returns the evicted entries, oldest first.
pub fn push_bounded<E>(entries: &mut VecDeque<E>, entry: E, capacity: Capacity) -> Vec<E> {
    let evicted = match capacity.limit() {
        Some(limit) if entries.len() >= limit => {
            let excess = entries.len() + 1 - limit;
            entries.drain(..excess).collect()
        }
        _ => Vec::new(),
    };
    entries.push_back(entry);
    evicted
}

/// Ordered history entries with a cursor marking how many are applied.
///
/// `cursor == 0` means nothing is applied (the base state); the current
/// index in the usual `-1..len` sense is `cursor - 1`.
#[derive(Clone, Debug)]
pub struct HistoryWindow<E> {
    entries: VecDeque<E>,
    cursor: usize,
    capacity: Capacity,
}

impl<E> HistoryWindow<E> {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            capacity,
        }
    }

    /// Record a new entry at the cursor.
    ///
    /// Discards the redo branch, applies the capacity bound, and moves the
    /// cursor to the new tip. Returns the evicted entries, oldest first.
    pub fn record(&mut self, entry: E) -> Vec<E> {
        let discarded = truncate_branch(&mut self.entries, self.cursor);
        if discarded > 0 {
            tracing::trace!(discarded, "redo branch truncated");
        }

        let evicted = push_bounded(&mut self.entries, entry, self.capacity);
        if !evicted.is_empty() {
            tracing::trace!(evicted = evicted.len(), "oldest entries evicted");
        }

        self.cursor = self.entries.len();
        evicted
    }

    /// Move the cursor back one entry and return the entry just unapplied.
    pub fn step_back(&mut self) -> Option<&E> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Move the cursor forward one entry and return the entry just applied.
    pub fn step_forward(&mut self) -> Option<&E> {
        let entry = self.entries.get(self.cursor)?;
        self.cursor += 1;
        Some(entry)
    }

    /// The entry that [`step_back`](Self::step_back) would unapply.
    pub fn peek_back(&self) -> Option<&E> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// The entry that [`step_forward`](Self::step_forward) would apply.
    pub fn peek_forward(&self) -> Option<&E> {
        self.entries.get(self.cursor)
    }

    /// Applied entries, oldest first.
    pub fn applied(&self) -> impl Iterator<Item = &E> {
        self.entries.range(..self.cursor)
    }

    /// Redo-able entries, nearest first.
    pub fn pending(&self) -> impl Iterator<Item = &E> {
        self.entries.range(self.cursor..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Position of the last applied entry, `-1` at the base.
    pub fn current_index(&self) -> isize {
        self.cursor as isize - 1
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Verify cursor range and capacity bound.
    pub fn check_invariants(&self) -> Result<()> {
        if self.cursor > self.entries.len() {
            return Err(HistoryError::InvariantViolation(format!(
                "current index {} outside [-1, {}]",
                self.current_index(),
                self.entries.len() as isize - 1
            )));
        }
        if let Some(limit) = self.capacity.limit() {
            if self.entries.len() > limit {
                return Err(HistoryError::InvariantViolation(format!(
                    "{} entries retained with capacity {}",
                    self.entries.len(),
                    limit
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(n: usize) -> Capacity {
        Capacity::bounded(n).unwrap()
    }

    #[test]
    fn test_push_bounded_unbounded() {
        let mut entries = VecDeque::new();
        for i in 0..100 {
            assert!(push_bounded(&mut entries, i, Capacity::Unbounded).is_empty());
        }
        assert_eq!(entries.len(), 100);
    }

    #[test]
    fn test_push_bounded_evicts_oldest() {
        let mut entries: VecDeque<i32> = VecDeque::new();
        let mut evicted = Vec::new();
        for i in 1..=5 {
            evicted.extend(push_bounded(&mut entries, i, bounded(3)));
        }
        assert_eq!(entries, VecDeque::from(vec![3, 4, 5]));
        assert_eq!(evicted, vec![1, 2]);
    }

    #[test]
    fn test_capacity_one_keeps_only_newest() {
        let mut entries = VecDeque::new();
        push_bounded(&mut entries, "a", bounded(1));
        let evicted = push_bounded(&mut entries, "b", bounded(1));
        assert_eq!(evicted, vec!["a"]);
        assert_eq!(entries, VecDeque::from(vec!["b"]));
    }

    #[test]
    fn test_truncate_branch() {
        let mut entries = VecDeque::from(vec![1, 2, 3, 4]);
        assert_eq!(truncate_branch(&mut entries, 1), 3);
        assert_eq!(entries, VecDeque::from(vec![1]));
        assert_eq!(truncate_branch(&mut entries, 5), 0);
    }

    #[test]
    fn test_window_navigation() {
        let mut window = HistoryWindow::new(Capacity::Unbounded);
        assert_eq!(window.current_index(), -1);
        assert!(!window.can_undo());

        window.record('a');
        window.record('b');
        assert_eq!(window.current_index(), 1);
        assert!(window.can_undo());
        assert!(!window.can_redo());

        assert_eq!(window.step_back(), Some(&'b'));
        assert_eq!(window.step_back(), Some(&'a'));
        assert_eq!(window.step_back(), None);
        assert_eq!(window.current_index(), -1);

        assert_eq!(window.step_forward(), Some(&'a'));
        assert_eq!(window.pending().collect::<Vec<_>>(), vec![&'b']);
        assert_eq!(window.applied().collect::<Vec<_>>(), vec![&'a']);
    }

    #[test]
    fn test_record_truncates_redo_branch() {
        let mut window = HistoryWindow::new(Capacity::Unbounded);
        window.record(1);
        window.record(2);
        window.record(3);
        window.step_back();
        window.step_back();

        window.record(9);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![1, 9]);
        assert!(!window.can_redo());
        assert_eq!(window.step_forward(), None);
    }

    #[test]
    fn test_record_with_bound_after_undo() {
        let mut window = HistoryWindow::new(bounded(2));
        window.record(1);
        window.record(2);
        window.step_back();

        // Truncation happens before the bound is applied, so nothing is evicted.
        let evicted = window.record(3);
        assert!(evicted.is_empty());
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(window.cursor(), 2);
    }

    #[test]
    fn test_window_invariants_hold() {
        let mut window = HistoryWindow::new(bounded(3));
        for i in 0..10 {
            window.record(i);
            window.check_invariants().unwrap();
        }
        assert_eq!(window.len(), 3);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.current_index(), -1);
    }
}
