//! Configuration and inspection types shared by the engines.

use crate::error::{HistoryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

/// Default number of retained history entries.
pub const DEFAULT_CAPACITY: usize = 50;

/// How many history entries an engine retains.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    /// Never evict.
    Unbounded,

    /// Keep at most this many entries, evicting the oldest first.
    Bounded(NonZeroUsize),
}

impl Capacity {
    /// Bounded capacity; zero is rejected.
    pub fn bounded(limit: usize) -> Result<Self> {
        NonZeroUsize::new(limit)
            .map(Capacity::Bounded)
            .ok_or_else(|| HistoryError::InvalidConfig("capacity must be at least 1".to_string()))
    }

    /// Interpret a host-style `max_history_size`, where `-1` means unbounded.
    pub fn from_max_history_size(size: i64) -> Result<Self> {
        match size {
            -1 => Ok(Capacity::Unbounded),
            n if n >= 1 => Capacity::bounded(n as usize),
            n => Err(HistoryError::InvalidConfig(format!(
                "max history size must be -1 or at least 1, got {}",
                n
            ))),
        }
    }

    /// The entry limit, or `None` when unbounded.
    pub fn limit(self) -> Option<usize> {
        match self {
            Capacity::Unbounded => None,
            Capacity::Bounded(n) => Some(n.get()),
        }
    }

    pub fn is_bounded(self) -> bool {
        matches!(self, Capacity::Bounded(_))
    }
}

impl Default for Capacity {
    fn default() -> Self {
        match NonZeroUsize::new(DEFAULT_CAPACITY) {
            Some(n) => Capacity::Bounded(n),
            None => Capacity::Unbounded,
        }
    }
}

impl fmt::Debug for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Unbounded => write!(f, "Unbounded"),
            Capacity::Bounded(n) => write!(f, "Bounded({})", n),
        }
    }
}

/// Which history representation an engine uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Full copies of every past and future state.
    Snapshot,

    /// Current state cached; forward and inverse patches per entry.
    #[default]
    CachedPatch,

    /// Base state plus forward patches; current state derived on read.
    ReplayPatch,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Snapshot => "snapshot",
            Strategy::CachedPatch => "cached_patch",
            Strategy::ReplayPatch => "replay_patch",
        };
        f.write_str(name)
    }
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Retained entry bound.
    pub capacity: Capacity,

    /// Representation used by [`History::create`](crate::History::create).
    pub strategy: Strategy,

    /// Re-derive the state from the recorded history after every command
    /// and panic on mismatch. On by default in debug builds.
    pub verify_invariants: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::default(),
            strategy: Strategy::default(),
            verify_invariants: cfg!(debug_assertions),
        }
    }
}

impl HistoryConfig {
    pub fn unbounded() -> Self {
        Self {
            capacity: Capacity::Unbounded,
            ..Default::default()
        }
    }

    pub fn bounded(limit: usize) -> Result<Self> {
        Ok(Self {
            capacity: Capacity::bounded(limit)?,
            ..Default::default()
        })
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_verify_invariants(mut self, verify: bool) -> Self {
        self.verify_invariants = verify;
        self
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HistoryError::InvalidConfig(e.to_string()))
    }
}

/// One entry in a [`HistorySnapshot`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub index: usize,
    /// Whether the entry is on the undo side of the cursor.
    pub applied: bool,
    /// Forward patch count; `None` for full-state snapshots.
    pub patches: Option<usize>,
    /// Inverse patch count, when the engine keeps inverses.
    pub inverse_patches: Option<usize>,
}

/// Read-only view of an engine's history, for tooling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistorySnapshot {
    pub strategy: Strategy,
    pub capacity: Capacity,
    /// Index of the last applied entry, `-1` at the base.
    pub current_index: isize,
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub entries: Vec<EntrySummary>,
}

impl HistorySnapshot {
    /// Total retained entries on both sides of the cursor.
    pub fn len(&self) -> usize {
        self.undo_depth + self.redo_depth
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
