//! Structural diff and patch primitives.
//!
//! A mutation runs against a [`Draft`], which applies each edit to a
//! working value and records it as a [`Patch`] together with the patch
//! that reverses it. Both history engine families are built on these.

mod draft;
mod operations;
mod path;

pub use draft::{diff_and_apply, diff_and_apply_in_place, Diffed, Draft};
pub use operations::{
    apply_patch, apply_patches, get, structural_diff, Patch, PatchOp, PatchPair, PatchSet,
};
pub use path::{Path, PathSegment};
