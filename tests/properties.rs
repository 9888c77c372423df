//! Property-based tests for the history engines.
//!
//! Every engine is driven with the same random command sequence and
//! checked against a plain list-of-states model:
//!
//! 1. The current state matches the model after every command
//! 2. undo/redo succeed exactly when the model can move
//! 3. Retained depth never exceeds the capacity
//! 4. A no-op update changes nothing
//! 5. A new edit after undo drops the redo branch

use proptest::prelude::*;
use rewind::{
    diff_and_apply, path, Capacity, Draft, History, HistoryConfig, Reversible,
    Strategy as Representation,
};
use serde_json::{json, Value};

const KEYS: [&str; 3] = ["a", "b", "c"];

const REPRESENTATIONS: [Representation; 3] = [
    Representation::Snapshot,
    Representation::CachedPatch,
    Representation::ReplayPatch,
];

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Edit {
    Set(usize, i64),
    Remove(usize),
    Push(i64),
    Pop,
    Reverse,
}

#[derive(Debug, Clone)]
enum Command {
    Update(Vec<Edit>),
    Undo,
    Redo,
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0..KEYS.len(), -3i64..3).prop_map(|(k, v)| Edit::Set(k, v)),
        (0..KEYS.len()).prop_map(Edit::Remove),
        (-3i64..3).prop_map(Edit::Push),
        Just(Edit::Pop),
        Just(Edit::Reverse),
    ]
}

fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => prop::collection::vec(edit_strategy(), 0..4).prop_map(Command::Update),
        1 => Just(Command::Undo),
        1 => Just(Command::Redo),
    ]
}

fn capacity_strategy() -> impl Strategy<Value = Capacity> {
    prop_oneof![
        Just(Capacity::Unbounded),
        (1usize..5).prop_map(|n| Capacity::bounded(n).unwrap()),
    ]
}

fn apply_edits(d: &mut Draft<'_>, edits: &[Edit]) -> rewind::Result<()> {
    for edit in edits {
        match edit {
            Edit::Set(k, v) => d.set(&path!(KEYS[*k]), *v)?,
            Edit::Remove(k) => {
                let target = path!(KEYS[*k]);
                if d.contains(&target) {
                    d.remove(&target)?;
                }
            }
            Edit::Push(v) => d.push(&path!("list"), *v)?,
            Edit::Pop => {
                let len = d
                    .get(&path!("list"))
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                if len > 0 {
                    d.remove(&path!("list", len - 1))?;
                }
            }
            Edit::Reverse => d.modify(&path!("list"), |list| {
                if let Value::Array(items) = list {
                    items.reverse();
                }
            })?,
        }
    }
    Ok(())
}

fn initial_state() -> Value {
    json!({"a": 0, "list": []})
}

fn engine(representation: Representation, capacity: Capacity) -> History {
    History::create(
        initial_state(),
        HistoryConfig::default()
            .with_strategy(representation)
            .with_capacity(capacity)
            .with_verify_invariants(true),
    )
}

/// Reference history: every state kept, cursor into the list.
struct Model {
    states: Vec<Value>,
    index: usize,
    limit: Option<usize>,
}

impl Model {
    fn new(capacity: Capacity) -> Self {
        Self {
            states: vec![initial_state()],
            index: 0,
            limit: capacity.limit(),
        }
    }

    fn current(&self) -> &Value {
        &self.states[self.index]
    }

    fn update(&mut self, edits: &[Edit]) -> bool {
        let diffed = diff_and_apply(self.current(), |d| apply_edits(d, edits)).unwrap();
        if diffed.patches.is_empty() {
            return false;
        }
        self.states.truncate(self.index + 1);
        self.states.push(diffed.state);
        self.index += 1;
        if let Some(limit) = self.limit {
            while self.states.len() - 1 > limit {
                self.states.remove(0);
                self.index -= 1;
            }
        }
        true
    }

    fn undo(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    fn redo(&mut self) -> bool {
        if self.index + 1 >= self.states.len() {
            return false;
        }
        self.index += 1;
        true
    }
}

fn run(h: &mut History, commands: &[Command]) {
    for command in commands {
        match command {
            Command::Update(edits) => {
                h.update(|d| apply_edits(d, edits)).unwrap();
            }
            Command::Undo => {
                h.undo();
            }
            Command::Redo => {
                h.redo();
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 1-3. Engines agree with the model
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn engines_follow_reference_history(
        commands in prop::collection::vec(command_strategy(), 0..40),
        capacity in capacity_strategy(),
    ) {
        for representation in REPRESENTATIONS {
            let mut h = engine(representation, capacity);
            let mut model = Model::new(capacity);

            for (step, command) in commands.iter().enumerate() {
                match command {
                    Command::Update(edits) => {
                        let recorded = h.update(|d| apply_edits(d, edits)).unwrap();
                        prop_assert_eq!(recorded, model.update(edits), "{} step {}", representation, step);
                    }
                    Command::Undo => prop_assert_eq!(h.undo(), model.undo(), "{} step {}", representation, step),
                    Command::Redo => prop_assert_eq!(h.redo(), model.redo(), "{} step {}", representation, step),
                }

                let state = h.current_state().into_owned();
                prop_assert_eq!(&state, model.current(), "{} step {}", representation, step);
                prop_assert_eq!(h.can_undo(), model.index > 0);
                prop_assert_eq!(h.can_redo(), model.index + 1 < model.states.len());

                let view = h.history_snapshot();
                prop_assert_eq!(view.undo_depth, model.index);
                prop_assert_eq!(view.current_index, model.index as isize - 1);
                if let Some(limit) = capacity.limit() {
                    prop_assert!(view.len() <= limit);
                }
            }
            prop_assert!(h.check_invariants().is_ok());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 4-5. Round trips, no-ops and truncation
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_after_update_restores_previous_state(
        setup in prop::collection::vec(command_strategy(), 0..20),
        edits in prop::collection::vec(edit_strategy(), 1..5),
    ) {
        for representation in REPRESENTATIONS {
            let mut h = engine(representation, Capacity::Unbounded);
            run(&mut h, &setup);
            let before = h.current_state().into_owned();

            if h.update(|d| apply_edits(d, &edits)).unwrap() {
                let after = h.current_state().into_owned();
                prop_assert!(h.undo());
                let undone = h.current_state().into_owned();
                prop_assert_eq!(&undone, &before);
                prop_assert!(h.redo());
                let redone = h.current_state().into_owned();
                prop_assert_eq!(&redone, &after);
            } else {
                let state = h.current_state().into_owned();
                prop_assert_eq!(&state, &before);
            }
        }
    }

    #[test]
    fn no_op_update_is_idempotent(
        setup in prop::collection::vec(command_strategy(), 0..20),
    ) {
        for representation in REPRESENTATIONS {
            let mut h = engine(representation, Capacity::Unbounded);
            run(&mut h, &setup);
            let state_before = h.current_state().into_owned();
            let view_before = h.history_snapshot();

            let current_a = state_before.get("a").cloned();
            let recorded = h
                .update(|d| match current_a {
                    Some(a) => d.set(&path!("a"), a),
                    None => Ok(()),
                })
                .unwrap();

            prop_assert!(!recorded);
            let state_after = h.current_state().into_owned();
            prop_assert_eq!(&state_after, &state_before);
            prop_assert_eq!(h.history_snapshot(), view_before);
        }
    }

    #[test]
    fn new_edit_after_undo_drops_redo_branch(
        setup in prop::collection::vec(command_strategy(), 1..20),
        undos in 1usize..4,
        value in any::<i64>(),
    ) {
        for representation in REPRESENTATIONS {
            let mut h = engine(representation, Capacity::bounded(8).unwrap());
            run(&mut h, &setup);
            for _ in 0..undos {
                h.undo();
            }
            let kept = h.history_snapshot().undo_depth;

            prop_assert!(h.update(|d| d.push(&path!("list"), value)).unwrap());
            prop_assert!(!h.can_redo());
            prop_assert!(!h.redo());
            let view = h.history_snapshot();
            prop_assert_eq!(view.redo_depth, 0);
            prop_assert_eq!(view.undo_depth, (kept + 1).min(8));
        }
    }
}
