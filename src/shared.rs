//! Thread-shareable handle around an engine.
//!
//! Engines are single-owner and mutate their sequences without any
//! atomicity across the read-modify-write of an update. Hosts that reach
//! one engine from several threads go through a [`SharedHistory`], which
//! holds the engine behind one mutex so each command runs alone.

use crate::error::Result;
use crate::history::Reversible;
use crate::patch::Draft;
use crate::types::HistorySnapshot;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Cloneable, mutex-guarded engine handle.
pub struct SharedHistory<E> {
    inner: Arc<Mutex<E>>,
}

impl<E> Clone for SharedHistory<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Reversible> SharedHistory<E> {
    pub fn new(engine: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn update<F>(&self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Draft<'_>) -> Result<()>,
    {
        self.inner.lock().update(mutate)
    }

    pub fn undo(&self) -> bool {
        self.inner.lock().undo()
    }

    pub fn redo(&self) -> bool {
        self.inner.lock().redo()
    }

    pub fn reset(&self) {
        self.inner.lock().reset()
    }

    /// Owned copy of the current state.
    pub fn current_state(&self) -> Value {
        self.inner.lock().current_state().into_owned()
    }

    pub fn can_undo(&self) -> bool {
        self.inner.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.lock().can_redo()
    }

    pub fn history_snapshot(&self) -> HistorySnapshot {
        self.inner.lock().history_snapshot()
    }

    /// Run several calls against the engine under one lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
