//! Recording drafts: mutate a working value and collect patches as you go.

use super::operations::{self, diff_into, Patch, PatchOp, PatchPair, PatchSet};
use super::path::{Path, PathSegment};
use crate::error::{value_kind, HistoryError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Mutable view of a state that records every edit made through it.
///
/// Each edit is applied immediately to the working value and logged as
/// forward patches plus the patches that reverse it. Writing a value
/// equal to the one already present records nothing.
pub struct Draft<'a> {
    root: &'a mut Value,
    forward: PatchSet,
    /// Inverse patches, one group per edit, in edit order.
    inverse: Vec<PatchSet>,
}

impl<'a> Draft<'a> {
    pub(crate) fn new(root: &'a mut Value) -> Self {
        Self {
            root,
            forward: PatchSet::new(),
            inverse: Vec::new(),
        }
    }

    /// The working value as edited so far.
    pub fn value(&self) -> &Value {
        &*self.root
    }

    pub fn get(&self, path: &Path) -> Option<&Value> {
        operations::get(&*self.root, path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Read and deserialize the value at `path`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let value = self
            .get(path)
            .ok_or_else(|| HistoryError::PathNotFound(path.clone()))?;
        T::deserialize(value).map_err(|e| HistoryError::Deserialization(e.to_string()))
    }

    /// Number of patches recorded so far.
    pub fn patch_count(&self) -> usize {
        self.forward.len()
    }

    /// Write `value` at `path`.
    ///
    /// Existing targets are replaced. A missing object key is added, and
    /// an array index equal to the length appends.
    pub fn set(&mut self, path: &Path, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let unchanged = self.get(path).map(|existing| *existing == value);
        match unchanged {
            Some(true) => Ok(()),
            Some(false) => {
                let old = operations::replace(self.root, path, value.clone())?;
                self.record(Patch::replace(path.clone(), value), Patch::replace(path.clone(), old));
                Ok(())
            }
            None => {
                operations::add(self.root, path, value.clone())?;
                self.record(Patch::add(path.clone(), value), Patch::remove(path.clone()));
                Ok(())
            }
        }
    }

    /// Serialize `value` and write it at `path`.
    pub fn set_serialized<T: Serialize + ?Sized>(&mut self, path: &Path, value: &T) -> Result<()> {
        let value =
            serde_json::to_value(value).map_err(|e| HistoryError::Unrepresentable(e.to_string()))?;
        self.set(path, value)
    }

    /// Remove the value at `path` and return it.
    pub fn remove(&mut self, path: &Path) -> Result<Value> {
        let old = operations::remove(self.root, path)?;
        self.record(Patch::remove(path.clone()), Patch::add(path.clone(), old.clone()));
        Ok(old)
    }

    /// Append to the array at `path`.
    pub fn push(&mut self, path: &Path, value: impl Into<Value>) -> Result<()> {
        let len = self.array_len(path)?;
        self.insert(path, len, value)
    }

    /// Insert into the array at `path`, shifting later elements.
    pub fn insert(&mut self, path: &Path, index: usize, value: impl Into<Value>) -> Result<()> {
        let len = self.array_len(path)?;
        if index > len {
            return Err(HistoryError::IndexOutOfBounds {
                path: path.clone(),
                index,
                len,
            });
        }
        let target = path.child(index);
        let value = value.into();
        operations::add(self.root, &target, value.clone())?;
        self.record(Patch::add(target.clone(), value), Patch::remove(target));
        Ok(())
    }

    /// Edit the value at `path` with an arbitrary closure.
    ///
    /// The change is recorded as the structural diff between the value
    /// before and after the closure ran.
    pub fn modify<F>(&mut self, path: &Path, f: F) -> Result<()>
    where
        F: FnOnce(&mut Value),
    {
        let before = self
            .get(path)
            .cloned()
            .ok_or_else(|| HistoryError::PathNotFound(path.clone()))?;
        let mut after = before.clone();
        f(&mut after);

        let mut forward = PatchSet::new();
        diff_into(path, &before, &after, &mut forward);
        if forward.is_empty() {
            return Ok(());
        }
        let mut inverse = PatchSet::new();
        diff_into(path, &after, &before, &mut inverse);

        operations::replace(self.root, path, after)?;
        for patch in forward {
            self.forward.push(patch);
        }
        self.inverse.push(inverse);
        Ok(())
    }

    fn array_len(&self, path: &Path) -> Result<usize> {
        match self.get(path) {
            Some(Value::Array(items)) => Ok(items.len()),
            Some(other) => Err(HistoryError::TypeMismatch {
                path: path.clone(),
                expected: "array",
                found: value_kind(other),
            }),
            None => Err(HistoryError::PathNotFound(path.clone())),
        }
    }

    fn record(&mut self, forward: Patch, inverse: Patch) {
        self.forward.push(forward);
        self.inverse.push(PatchSet::from(vec![inverse]));
    }

    fn finish(mut self) -> Result<PatchPair> {
        let cancelled = self.inverse.len() > 1
            && self.edits_cancel_out().map_err(|e| {
                HistoryError::InvariantViolation(format!("recorded edits did not replay: {}", e))
            })?;
        if cancelled {
            tracing::trace!(edits = self.inverse.len(), "edits cancelled out");
            return Ok(PatchPair::default());
        }
        let inverse: Vec<Patch> = self.inverse.into_iter().rev().flatten().collect();
        Ok(PatchPair {
            forward: self.forward,
            inverse: PatchSet::from(inverse),
        })
    }

    /// Whether the recorded edits leave the value as it started.
    ///
    /// Only the subtree under the common ancestor of every edit is
    /// compared. The edits are unapplied for the comparison and applied
    /// again unless they cancelled out.
    fn edits_cancel_out(&mut self) -> Result<bool> {
        let scope = edit_scope(&self.forward);
        let after = match operations::get(&*self.root, &scope) {
            Some(value) => value.clone(),
            None => return Ok(false),
        };
        self.unapply()?;
        let unchanged = operations::get(&*self.root, &scope) == Some(&after);
        if !unchanged {
            operations::apply_patches(self.root, &self.forward)?;
        }
        Ok(unchanged)
    }

    fn unapply(&mut self) -> Result<()> {
        for group in self.inverse.iter().rev() {
            operations::apply_patches(self.root, group)?;
        }
        Ok(())
    }

    /// Undo every edit recorded so far, restoring the value the draft
    /// started from.
    fn rollback(&mut self) -> Result<()> {
        self.unapply()?;
        self.inverse.clear();
        self.forward = PatchSet::new();
        Ok(())
    }
}

/// Deepest path that contains every region the patches touch. Adds and
/// removes touch their parent container.
fn edit_scope(patches: &PatchSet) -> Path {
    let mut scope: Option<&[PathSegment]> = None;
    for patch in patches {
        let region = match patch.op {
            PatchOp::Replace => patch.path.segments(),
            PatchOp::Add | PatchOp::Remove => patch
                .path
                .split_last()
                .map_or(&[][..], |(_, parent)| parent),
        };
        scope = Some(match scope {
            None => region,
            Some(current) => {
                let common = current
                    .iter()
                    .zip(region)
                    .take_while(|(a, b)| a == b)
                    .count();
                &current[..common]
            }
        });
    }
    Path::from(scope.unwrap_or(&[]))
}

/// Outcome of [`diff_and_apply`].
#[derive(Clone, Debug, PartialEq)]
pub struct Diffed {
    pub state: Value,
    pub patches: PatchSet,
    pub inverse_patches: PatchSet,
}

/// Run `mutate` against a copy of `old` and return the new state with
/// its forward and inverse patches. `old` is never modified.
pub fn diff_and_apply<F>(old: &Value, mutate: F) -> Result<Diffed>
where
    F: FnOnce(&mut Draft<'_>) -> Result<()>,
{
    let mut state = old.clone();
    let mut draft = Draft::new(&mut state);
    mutate(&mut draft)?;
    let pair = draft.finish()?;
    Ok(Diffed {
        state,
        patches: pair.forward,
        inverse_patches: pair.inverse,
    })
}

/// Run `mutate` directly against `state`.
///
/// Costs O(size of the change) instead of a full copy. If `mutate`
/// fails, the edits it already made are reversed before the error is
/// returned, so `state` is exactly as it was.
pub fn diff_and_apply_in_place<F>(state: &mut Value, mutate: F) -> Result<PatchPair>
where
    F: FnOnce(&mut Draft<'_>) -> Result<()>,
{
    let mut draft = Draft::new(state);
    match mutate(&mut draft) {
        Ok(()) => draft.finish(),
        Err(err) => {
            let recorded = draft.patch_count();
            draft.rollback().map_err(|rollback_err| {
                HistoryError::InvariantViolation(format!(
                    "rollback after failed mutation ({}) did not apply: {}",
                    err, rollback_err
                ))
            })?;
            tracing::debug!(recorded, error = %err, "mutation failed, draft rolled back");
            Err(err)
        }
    }
}
