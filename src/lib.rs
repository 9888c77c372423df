//! # Rewind
//!
//! Reversible state history for JSON-shaped values, with bounded memory
//! and CPU cost.
//!
//! ## Core Concepts
//!
//! - **Drafts**: Mutations edit a [`Draft`], which records each change as
//!   a forward [`Patch`] and the patch that reverses it
//! - **Engines**: Three implementations of [`Reversible`] trade memory
//!   for CPU differently (full snapshots, cached state + inverse patches,
//!   base state + replayed patches)
//! - **Window**: One shared policy truncates the redo branch on a new
//!   edit and evicts the oldest entries past the configured [`Capacity`]
//!
//! ## Example
//!
//! ```
//! use rewind::{path, History, HistoryConfig, Reversible};
//! use serde_json::json;
//!
//! let mut history = History::create(json!({"count": 0}), HistoryConfig::default());
//!
//! history.update(|draft| draft.set(&path!("count"), 1))?;
//! history.update(|draft| draft.set(&path!("count"), 2))?;
//! assert_eq!(history.current_state()["count"], 2);
//!
//! assert!(history.undo());
//! assert_eq!(history.current_state()["count"], 1);
//!
//! // A new edit from the middle drops the redo branch.
//! history.update(|draft| draft.set(&path!("count"), 9))?;
//! assert!(!history.redo());
//! # Ok::<(), rewind::HistoryError>(())
//! ```

pub mod error;
pub mod history;
pub mod patch;
pub mod shared;
pub mod types;
pub mod window;

// Re-exports
pub use error::{HistoryError, Result};
pub use history::{CachedPatchHistory, History, ReplayPatchHistory, Reversible, SnapshotHistory};
pub use patch::{
    apply_patch, apply_patches, diff_and_apply, diff_and_apply_in_place, structural_diff, Diffed,
    Draft, Patch, PatchOp, PatchPair, PatchSet, Path, PathSegment,
};
pub use shared::SharedHistory;
pub use types::*;
pub use window::HistoryWindow;
