//! Property tests for interpreter invariants
//!
//! Stories are generated deterministically so every run checks the same
//! shapes: flat, deeply nested and wide.

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use tokimeki::condition::{self, ConditionError};
use tokimeki::runtime::{MemorySink, NoopSink};
use tokimeki::storage::{LocalStorage, MemoryStore, Persistence};
use tokimeki::types::{EffectSet, EntrySequence, Unlocks};
use tokimeki::{Instruction, Interpreter, StepOutcome, UnlockLedger, VariableStore, Wait};

fn interpreter(story: Value) -> Interpreter {
    let story: EntrySequence = serde_json::from_value(story).expect("Invalid story");
    Interpreter::new(
        story,
        VariableStore::new(),
        Box::new(LocalStorage::new(MemoryStore::new())),
    )
}

fn lines(outcome: &StepOutcome) -> impl Iterator<Item = String> + '_ {
    outcome.instructions.iter().filter_map(|instruction| match instruction {
        Instruction::ShowDialogue { text, .. } => Some(text.clone()),
        _ => None,
    })
}

/// Drive to the end, returning every line and the number of advances used
fn play(interpreter: &mut Interpreter) -> (Vec<String>, usize) {
    let mut outcome = interpreter.start().unwrap();
    let mut shown: Vec<String> = lines(&outcome).collect();
    let mut steps = 0;
    while outcome.wait != Wait::Ended {
        steps += 1;
        assert!(steps <= 10_000, "Story did not terminate");
        outcome = match outcome.wait {
            Wait::Choice => interpreter.choose(0).unwrap(),
            _ => interpreter.advance_requested().unwrap(),
        };
        shown.extend(lines(&outcome));
    }
    (shown, steps)
}

/// Nested story whose lines are numbered in reading order
fn nested(depth: usize, width: usize, counter: &mut usize) -> Value {
    let mut entries = Vec::new();
    for _ in 0..width {
        *counter += 1;
        entries.push(json!({"dialogue": format!("line {counter}")}));
    }
    if depth > 0 {
        let child = nested(depth - 1, width, counter);
        entries.push(json!({"branch": {"condition": "true", "story": child}}));
        *counter += 1;
        entries.push(json!({"dialogue": format!("line {counter}")}));
    }
    Value::Array(entries)
}

fn numbered(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("line {n}")).collect()
}

/// Metric: Every entry is rendered exactly once across all shapes
#[test]
fn exactly_once_processing() {
    for (depth, width) in [(0, 5), (3, 1), (6, 2), (1, 12)] {
        let mut counter = 0;
        let story = nested(depth, width, &mut counter);
        let (shown, _) = play(&mut interpreter(story));

        let mut seen = HashMap::new();
        for line in &shown {
            *seen.entry(line.as_str()).or_insert(0) += 1;
        }
        assert!(seen.values().all(|&count| count == 1), "{seen:?}");
        assert_eq!(shown.len(), counter);
    }
}

/// Metric: A parent resumes only after its child context is exhausted
#[test]
fn stack_discipline() {
    for depth in 1..=8 {
        let mut counter = 0;
        let story = nested(depth, 2, &mut counter);
        let (shown, _) = play(&mut interpreter(story));
        assert_eq!(shown, numbered(counter), "depth {depth}");
    }
}

/// Metric: Identical entries in one sequence are still distinct positions
#[test]
fn identical_entries_are_each_shown() {
    let (shown, steps) = play(&mut interpreter(json!([
        {"dialogue": "again"},
        {"dialogue": "again"},
        {"dialogue": "again"}
    ])));
    assert_eq!(shown, vec!["again"; 3]);
    assert_eq!(steps, 3);
}

/// Metric: Broken or undefined conditions evaluate to false without panicking
#[test]
fn fail_closed_conditions() {
    let store = VariableStore::new();
    let sink = MemorySink::new();
    let deep = "(".repeat(500);
    for expression in [
        "",
        "missing > 1",
        "missing.deeper == 1",
        "affection.Alice.mood == 'happy'",
        "1 +",
        "((true)",
        "alert('x')",
        "a = 1",
        "'unterminated",
        deep.as_str(),
    ] {
        assert!(!condition::evaluate(expression, &store, &sink), "{expression}");
    }
    assert_eq!(sink.records().len(), 10);

    // Unknown bindings are an error rather than a falsy value
    match condition::try_evaluate("missing", store.bindings()) {
        Err(ConditionError::UnknownIdentifier { name }) => assert_eq!(name, "missing"),
        other => panic!("Expected unknown identifier, got {other:?}"),
    }

    // A failing branch is skipped and the story carries on
    let (shown, _) = play(&mut interpreter(json!([
        {"branch": {"condition": "nope.nothing", "story": [{"dialogue": "hidden"}]}},
        {"dialogue": "visible"}
    ])));
    assert_eq!(shown, vec!["visible"]);
}

/// Metric: Affection deltas add up and storage always matches memory
#[test]
fn affection_additivity() {
    let backend = MemoryStore::new();
    let mut persistence = LocalStorage::new(backend.clone());
    let mut store = VariableStore::new();

    for (delta, expected) in [(3, 3.0), (-1, 2.0), (0, 2.0), (5, 7.0)] {
        let effects = EffectSet::from(json!({"affection": {"A": delta}}));
        store.apply_effects(&effects, &mut persistence).unwrap();
        assert_eq!(store.affection_of("A"), expected);

        let reloaded = LocalStorage::new(backend.clone()).load_affection().unwrap();
        assert_eq!(reloaded.get("A"), Some(&expected));
    }
}

/// Metric: One slot per distinct id, slots increase within a category
#[test]
fn unlock_dedup() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let unlocks = |id: &str| -> Unlocks {
        serde_json::from_value(json!({"gallery": {"0": id}})).unwrap()
    };

    let mut ledger = UnlockLedger::default();
    assert!(ledger.commit(&unlocks("beach"), now));
    assert!(!ledger.commit(&unlocks("beach"), now));
    assert!(ledger.commit(&unlocks("festival"), now));

    let gallery = ledger.category("gallery").unwrap();
    let slots: Vec<(u32, &Value)> = gallery.iter().map(|(slot, r)| (*slot, &r.id)).collect();
    assert_eq!(slots, vec![(0, &json!("beach")), (1, &json!("festival"))]);
}

/// Metric: Finite acyclic stories always end, with choices and failing branches mixed in
#[test]
fn termination() {
    for size in [0, 1, 7, 40] {
        let mut entries = Vec::new();
        for n in 0..size {
            let entry = match n % 4 {
                0 => json!({"dialogue": format!("say {n}")}),
                1 => json!({"branch": {"condition": format!("{n} % 2 == 1"), "story": [
                    {"dialogue": "inner"},
                    {"branch": {"condition": "false", "story": [{"dialogue": "never"}]}}
                ]}}),
                2 => json!({"responses": [{"text": "ok", "effects": {"seen": n}}]}),
                _ => json!({"background": "park", "sfx": "chime"}),
            };
            entries.push(entry);
        }
        let (shown, steps) = play(&mut interpreter(Value::Array(entries)));
        assert!(!shown.iter().any(|line| line == "never"));
        assert!(steps <= size + 1);
    }
}

/// Metric: Peeking ahead never changes what is shown next
#[test]
fn peek_is_read_only() {
    let mut interpreter = interpreter(json!([
        {"character": "Alice", "dialogue": "one"},
        {"branch": {"condition": "true", "story": [{"character": "Bea", "dialogue": "two"}]}},
        {"dialogue": "three"}
    ]));
    interpreter.start().unwrap();
    let first = interpreter.peek_next();
    assert_eq!(interpreter.peek_next(), first);

    let mut rest = Vec::new();
    loop {
        let outcome = interpreter.advance_requested().unwrap();
        rest.extend(lines(&outcome));
        if outcome.wait == Wait::Ended {
            break;
        }
    }
    assert_eq!(rest, vec!["two", "three"]);
}

#[test]
fn debug_sink_is_optional() {
    assert!(condition::evaluate("1 < 2", &VariableStore::new(), &NoopSink));
}
