//! Patch types and their application to values.

use super::path::{Path, PathSegment};
use crate::error::{value_kind, HistoryError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of structural edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

/// A single structural edit, serialized as an RFC 6902 operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: Path,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    pub fn add(path: Path, value: Value) -> Self {
        Patch {
            op: PatchOp::Add,
            path,
            value: Some(value),
        }
    }

    pub fn remove(path: Path) -> Self {
        Patch {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }

    pub fn replace(path: Path, value: Value) -> Self {
        Patch {
            op: PatchOp::Replace,
            path,
            value: Some(value),
        }
    }
}

/// The ordered patches produced by one mutation.
///
/// Order matters: later patches may address paths created by earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchSet(Vec<Patch>);

impl PatchSet {
    pub fn new() -> Self {
        PatchSet(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Patch] {
        &self.0
    }

    pub(crate) fn push(&mut self, patch: Patch) {
        self.0.push(patch);
    }

    /// Apply to a copy of `state`. The input is never modified, even when
    /// a patch fails partway through.
    pub fn apply_to(&self, state: &Value) -> Result<Value> {
        let mut next = state.clone();
        apply_patches(&mut next, self)?;
        Ok(next)
    }
}

impl From<Vec<Patch>> for PatchSet {
    fn from(patches: Vec<Patch>) -> Self {
        PatchSet(patches)
    }
}

impl IntoIterator for PatchSet {
    type Item = Patch;
    type IntoIter = std::vec::IntoIter<Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PatchSet {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Forward patches together with the patches that reverse them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchPair {
    pub forward: PatchSet,
    pub inverse: PatchSet,
}

impl PatchPair {
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Apply a patch set in order, in place.
///
/// On error the value may hold the effect of the patches before the
/// failing one; use [`PatchSet::apply_to`] when that matters.
pub fn apply_patches(state: &mut Value, patches: &PatchSet) -> Result<()> {
    for patch in patches {
        apply_patch(state, patch)?;
    }
    Ok(())
}

/// Apply one patch in place.
pub fn apply_patch(state: &mut Value, patch: &Patch) -> Result<()> {
    match patch.op {
        PatchOp::Add => {
            let value = required_value(patch)?;
            add(state, &patch.path, value.clone())
        }
        PatchOp::Remove => remove(state, &patch.path).map(|_| ()),
        PatchOp::Replace => {
            let value = required_value(patch)?;
            replace(state, &patch.path, value.clone()).map(|_| ())
        }
    }
}

fn required_value(patch: &Patch) -> Result<&Value> {
    patch.value.as_ref().ok_or_else(|| {
        HistoryError::InvalidPatch(format!("{:?} at {} carries no value", patch.op, patch.path))
    })
}

/// Look up the value at `path`.
pub fn get<'v>(root: &'v Value, path: &Path) -> Option<&'v Value> {
    let mut current = root;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment.as_key().as_ref())?,
            Value::Array(items) => items.get(segment.as_index()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn get_mut<'v>(root: &'v mut Value, segments: &[PathSegment]) -> Option<&'v mut Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get_mut(segment.as_key().as_ref())?,
            Value::Array(items) => items.get_mut(segment.as_index()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn parent_mut<'v, 'p>(
    root: &'v mut Value,
    path: &'p Path,
) -> Result<(&'v mut Value, &'p PathSegment)> {
    let (last, parent) = path
        .split_last()
        .ok_or_else(|| HistoryError::InvalidPatch("root has no parent".to_string()))?;
    let container =
        get_mut(root, parent).ok_or_else(|| HistoryError::PathNotFound(Path::from(parent)))?;
    Ok((container, last))
}

fn array_index(path: &Path, segment: &PathSegment, len: usize) -> Result<usize> {
    let index = segment.as_index().ok_or_else(|| HistoryError::TypeMismatch {
        path: path.clone(),
        expected: "array index",
        found: "object key",
    })?;
    if index > len {
        return Err(HistoryError::IndexOutOfBounds {
            path: path.clone(),
            index,
            len,
        });
    }
    Ok(index)
}

fn not_a_container(path: &Path, found: &Value) -> HistoryError {
    HistoryError::TypeMismatch {
        path: path.clone(),
        expected: "object or array",
        found: value_kind(found),
    }
}

/// Insert `value` at `path`. Array insertion shifts later elements.
pub(crate) fn add(root: &mut Value, path: &Path, value: Value) -> Result<()> {
    if path.is_root() {
        *root = value;
        return Ok(());
    }
    let (container, last) = parent_mut(root, path)?;
    match container {
        Value::Object(map) => {
            map.insert(last.as_key().into_owned(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(path, last, items.len())?;
            items.insert(index, value);
            Ok(())
        }
        other => Err(not_a_container(path, other)),
    }
}

/// Remove the value at `path`, returning it.
pub(crate) fn remove(root: &mut Value, path: &Path) -> Result<Value> {
    if path.is_root() {
        return Err(HistoryError::InvalidPatch("cannot remove the root".to_string()));
    }
    let (container, last) = parent_mut(root, path)?;
    match container {
        Value::Object(map) => map
            .remove(last.as_key().as_ref())
            .ok_or_else(|| HistoryError::PathNotFound(path.clone())),
        Value::Array(items) => {
            let index = array_index(path, last, items.len())?;
            if index == items.len() {
                return Err(HistoryError::IndexOutOfBounds {
                    path: path.clone(),
                    index,
                    len: items.len(),
                });
            }
            Ok(items.remove(index))
        }
        other => Err(not_a_container(path, other)),
    }
}

/// Overwrite the existing value at `path`, returning the old one.
pub(crate) fn replace(root: &mut Value, path: &Path, value: Value) -> Result<Value> {
    let slot = get_mut(root, path.segments())
        .ok_or_else(|| HistoryError::PathNotFound(path.clone()))?;
    Ok(std::mem::replace(slot, value))
}

/// Compute the patches that turn `old` into `new`.
///
/// Object keys are visited in map order, with removals and nested
/// changes before additions. Arrays are compared index by index; extra
/// trailing elements are added in ascending order or removed in
/// descending order so that indices stay valid during replay.
pub fn structural_diff(old: &Value, new: &Value) -> PatchSet {
    let mut out = PatchSet::new();
    diff_into(&Path::root(), old, new, &mut out);
    out
}

pub(crate) fn diff_into(path: &Path, old: &Value, new: &Value, out: &mut PatchSet) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_value) in old_map {
                match new_map.get(key) {
                    Some(new_value) => diff_into(&path.child(key.as_str()), old_value, new_value, out),
                    None => out.push(Patch::remove(path.child(key.as_str()))),
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    out.push(Patch::add(path.child(key.as_str()), new_value.clone()));
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            let common = old_items.len().min(new_items.len());
            for i in 0..common {
                diff_into(&path.child(i), &old_items[i], &new_items[i], out);
            }
            for (i, item) in new_items.iter().enumerate().skip(common) {
                out.push(Patch::add(path.child(i), item.clone()));
            }
            for i in (common..old_items.len()).rev() {
                out.push(Patch::remove(path.child(i)));
            }
        }
        _ => out.push(Patch::replace(path.clone(), new.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_add_object_key() {
        let mut state = json!({"a": 1});
        apply_patch(&mut state, &Patch::add(path!("b"), json!(2))).unwrap();
        assert_eq!(state, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_add_array_shifts() {
        let mut state = json!({"items": [1, 3]});
        apply_patch(&mut state, &Patch::add(path!("items", 1), json!(2))).unwrap();
        assert_eq!(state["items"], json!([1, 2, 3]));

        // Index == len appends
        apply_patch(&mut state, &Patch::add(path!("items", 3), json!(4))).unwrap();
        assert_eq!(state["items"], json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_add_past_end_fails() {
        let mut state = json!([1]);
        let result = apply_patch(&mut state, &Patch::add(path!(5), json!(0)));
        assert!(matches!(result, Err(HistoryError::IndexOutOfBounds { index: 5, len: 1, .. })));
    }

    #[test]
    fn test_remove_array_element() {
        let mut state = json!(["a", "b", "c"]);
        apply_patch(&mut state, &Patch::remove(path!(1))).unwrap();
        assert_eq!(state, json!(["a", "c"]));
    }

    #[test]
    fn test_remove_missing() {
        let mut state = json!({"a": 1});
        let result = apply_patch(&mut state, &Patch::remove(path!("b")));
        assert!(matches!(result, Err(HistoryError::PathNotFound(_))));

        let mut arr = json!([1]);
        assert!(apply_patch(&mut arr, &Patch::remove(path!(1))).is_err());
    }

    #[test]
    fn test_remove_root_rejected() {
        let mut state = json!({});
        let result = apply_patch(&mut state, &Patch::remove(Path::root()));
        assert!(matches!(result, Err(HistoryError::InvalidPatch(_))));
    }

    #[test]
    fn test_replace_root() {
        let mut state = json!(1);
        apply_patch(&mut state, &Patch::replace(Path::root(), json!({"x": true}))).unwrap();
        assert_eq!(state, json!({"x": true}));
    }

    #[test]
    fn test_replace_requires_existing() {
        let mut state = json!({"a": {}});
        let result = apply_patch(&mut state, &Patch::replace(path!("a", "b"), json!(1)));
        assert!(matches!(result, Err(HistoryError::PathNotFound(_))));
    }

    #[test]
    fn test_missing_value_rejected() {
        let mut state = json!({});
        let patch = Patch {
            op: PatchOp::Add,
            path: path!("a"),
            value: None,
        };
        assert!(matches!(apply_patch(&mut state, &patch), Err(HistoryError::InvalidPatch(_))));
    }

    #[test]
    fn test_parent_type_mismatch() {
        let mut state = json!({"n": 5});
        let result = apply_patch(&mut state, &Patch::add(path!("n", "x"), json!(1)));
        assert!(matches!(result, Err(HistoryError::TypeMismatch { found: "number", .. })));
    }

    #[test]
    fn test_apply_to_leaves_input() {
        let state = json!({"a": 1});
        let patches = PatchSet::from(vec![
            Patch::replace(path!("a"), json!(2)),
            Patch::remove(path!("missing")),
        ]);
        assert!(patches.apply_to(&state).is_err());
        assert_eq!(state, json!({"a": 1}));
    }

    #[test]
    fn test_json_patch_wire_form() {
        let patch = Patch::add(path!("todos", 0), json!({"done": false}));
        let wire = serde_json::to_value(&patch).unwrap();
        assert_eq!(wire, json!({"op": "add", "path": "/todos/0", "value": {"done": false}}));

        let remove = serde_json::to_value(Patch::remove(path!("a"))).unwrap();
        assert_eq!(remove, json!({"op": "remove", "path": "/a"}));

        let parsed: PatchSet =
            serde_json::from_value(json!([{"op": "replace", "path": "/n", "value": 3}])).unwrap();
        let mut state = json!({"n": 0});
        apply_patches(&mut state, &parsed).unwrap();
        assert_eq!(state, json!({"n": 3}));
    }

    #[test]
    fn test_structural_diff_objects() {
        let old = json!({"keep": 1, "change": {"deep": 1}, "drop": true});
        let new = json!({"keep": 1, "change": {"deep": 2}, "added": [1]});

        let diff = structural_diff(&old, &new);
        assert_eq!(
            diff.as_slice(),
            &[
                Patch::replace(path!("change", "deep"), json!(2)),
                Patch::remove(path!("drop")),
                Patch::add(path!("added"), json!([1])),
            ]
        );
        assert_eq!(diff.apply_to(&old).unwrap(), new);
    }

    #[test]
    fn test_structural_diff_arrays() {
        let old = json!([1, 2, 3, 4]);
        let new = json!([1, 9]);
        let diff = structural_diff(&old, &new);
        assert_eq!(
            diff.as_slice(),
            &[
                Patch::replace(path!(1), json!(9)),
                Patch::remove(path!(3)),
                Patch::remove(path!(2)),
            ]
        );
        assert_eq!(diff.apply_to(&old).unwrap(), new);
        assert_eq!(structural_diff(&new, &old).apply_to(&new).unwrap(), old);
    }

    #[test]
    fn test_structural_diff_equal_is_empty() {
        let v = json!({"a": [1, {"b": null}]});
        assert!(structural_diff(&v, &v.clone()).is_empty());
    }
}
