//! Property-based tests for the push strategies
//!
//! Invariants that should hold for all inputs:
//! 1. Null collapse: null pointers push one nil, others round-trip
//! 2. Scalar round-trip across the integer ranges
//! 3. Sized strings keep embedded NUL bytes
//! 4. Containers keep order (sequences) or the exact pair set (maps)
//! 5. Optionals round-trip
//! 6. Nested tuples account for every slot
//! 7. Finalizers register once per identifier
//! 8. Closures observe their upvalues in capture order

use proptest::prelude::*;
use stackbind::push::{multi_push, push_sized};
use stackbind::pull::get_tracked;
use stackbind::{get, push, upvalue_index, Bytes, CClosure, Closure, State, StackGuard, Type, Value};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
struct Sample {
    id: u32,
}

stackbind::impl_usertype!(Sample);

fn collect_upvalues(state: &mut State) -> i32 {
    let mut seen = Vec::new();
    while let Some(n) = state.value(upvalue_index(seen.len() as i32 + 1)).and_then(Value::as_integer) {
        seen.push(n);
    }
    push(state, seen)
}

#[test]
fn integer_extremes_round_trip() {
    let mut state = State::new();

    for i in [i32::MIN, -1, 0, 1, i32::MAX] {
        push(&mut state, i);
        assert_eq!(get::<i32>(&state, -1).unwrap(), i);
    }
    for i in [i64::MIN, -1, 0, 1, i64::MAX] {
        push(&mut state, i);
        assert_eq!(get::<i64>(&state, -1).unwrap(), i);
    }
    for u in [0, 1, u32::MAX] {
        push(&mut state, u);
        assert_eq!(get::<u32>(&state, -1).unwrap(), u);
    }
    for u in [0, 1, u64::MAX] {
        push(&mut state, u);
        assert_eq!(get::<u64>(&state, -1).unwrap(), u);
    }
}

#[test]
fn nested_tuple_uses_four_slots() {
    let mut state = State::new();
    let guard = StackGuard::begin(&state);

    let slots = push(&mut state, (42i64, "name", (1.25f64, -2.5f64)));
    assert_eq!(slots, 4);
    assert_eq!(guard.delta(&state), 4);

    let (value, used) = get_tracked::<(i64, String, (f64, f64))>(&state, 1).unwrap();
    assert_eq!(value, (42, "name".to_string(), (1.25, -2.5)));
    assert_eq!(used, 4);
}

#[test]
fn repeated_value_pushes_register_one_finalizer() {
    let mut state = State::new();
    push(&mut state, Sample { id: 1 });
    push(&mut state, Sample { id: 2 });

    let key = state.identifiers().value_key::<Sample>();
    assert_eq!(state.finalizers().len(), 1);
    assert_eq!(state.finalizers().get(&key).unwrap().reuses, 1);
}

#[test]
fn closure_with_tuple_upvalues_is_one_slot() {
    let mut state = State::new();
    assert_eq!(push(&mut state, Closure::new(collect_upvalues, (1i64, 2i64, 3i64))), 1);
    assert_eq!(state.top(), 1);

    state.call(0, 1).unwrap();
    assert_eq!(get::<Vec<i64>>(&state, -1).unwrap(), vec![1, 2, 3]);
}

proptest! {
    #[test]
    fn null_collapse(id in any::<u32>(), null in any::<bool>()) {
        let mut state = State::new();
        let mut sample = Sample { id };
        let ptr: *mut Sample = if null { std::ptr::null_mut() } else { &mut sample as *mut Sample };

        prop_assert_eq!(push(&mut state, ptr), 1);
        if null {
            prop_assert_eq!(state.type_of(-1), Type::Nil);
        } else {
            prop_assert_eq!(state.type_of(-1), Type::Userdata);
            let back = get::<*mut Sample>(&state, -1).unwrap();
            prop_assert_eq!(unsafe { (*back).id }, id);
        }
        prop_assert_eq!(get::<*mut Sample>(&state, -1).unwrap(), ptr);
    }

    #[test]
    fn signed_round_trip(i in any::<i64>(), j in any::<i32>()) {
        let mut state = State::new();
        push(&mut state, i);
        push(&mut state, j);
        prop_assert_eq!(get::<i64>(&state, 1).unwrap(), i);
        prop_assert_eq!(get::<i32>(&state, 2).unwrap(), j);
    }

    #[test]
    fn unsigned_round_trip(u in any::<u64>(), v in any::<u32>()) {
        let mut state = State::new();
        push(&mut state, u);
        push(&mut state, v);
        prop_assert_eq!(get::<u64>(&state, 1).unwrap(), u);
        prop_assert_eq!(get::<u32>(&state, 2).unwrap(), v);
    }

    #[test]
    fn sized_strings_keep_nul(head in prop::collection::vec(any::<u8>(), 0..32),
                              tail in prop::collection::vec(any::<u8>(), 0..32)) {
        let mut bytes = head;
        bytes.push(0);
        bytes.extend(tail);

        let mut state = State::new();
        push_sized(&mut state, &bytes, bytes.len());
        prop_assert_eq!(state.raw_len(-1), bytes.len());
        prop_assert_eq!(get::<Bytes>(&state, -1).unwrap(), Bytes(bytes));
    }

    #[test]
    fn sequences_keep_order(items in prop::collection::vec(any::<i64>(), 0..64)) {
        let mut state = State::new();
        prop_assert_eq!(push(&mut state, &items), 1);
        prop_assert_eq!(state.raw_len(-1), items.len());

        for (i, item) in items.iter().enumerate() {
            state.raw_get_index(1, i as i64 + 1);
            prop_assert_eq!(get::<i64>(&state, -1).unwrap(), *item);
            state.pop(1);
        }
        prop_assert_eq!(get::<Vec<i64>>(&state, 1).unwrap(), items);
    }

    #[test]
    fn maps_keep_pairs(map in prop::collection::hash_map("[a-z]{1,8}", any::<i32>(), 0..32)) {
        let mut state = State::new();
        push(&mut state, &map);
        prop_assert_eq!(state.table_pairs(-1).len(), map.len());
        prop_assert_eq!(get::<HashMap<String, i32>>(&state, -1).unwrap(), map);
    }

    #[test]
    fn ordered_maps_keep_pairs(map in prop::collection::btree_map(any::<i32>(), "[a-z]{0,4}", 0..32)) {
        let mut state = State::new();
        push(&mut state, map.clone());
        prop_assert_eq!(get::<BTreeMap<i32, String>>(&state, -1).unwrap(), map);
    }

    #[test]
    fn optionals_round_trip(value in prop::option::of(any::<i32>())) {
        let mut state = State::new();
        prop_assert_eq!(push(&mut state, value), 1);
        prop_assert_eq!(get::<Option<i32>>(&state, -1).unwrap(), value);
    }

    #[test]
    fn finalizer_registered_once(count in 1usize..8) {
        let mut state = State::new();
        for id in 0..count {
            push(&mut state, Sample { id: id as u32 });
        }

        let key = state.identifiers().value_key::<Sample>();
        let entry = state.finalizers().get(&key).unwrap();
        prop_assert_eq!(entry.reuses, count - 1);
        prop_assert_eq!(state.finalizers().len(), 1);
    }

    #[test]
    fn closure_upvalues_in_order(upvalues in prop::collection::vec(any::<i64>(), 0..12)) {
        let mut state = State::new();
        let captured = multi_push(&mut state, upvalues.iter());
        prop_assert_eq!(captured as usize, upvalues.len());

        let slots = push(&mut state, CClosure::new(collect_upvalues, captured));
        prop_assert_eq!(slots, 1);
        prop_assert_eq!(state.top(), 1);

        state.call(0, 1).unwrap();
        prop_assert_eq!(get::<Vec<i64>>(&state, -1).unwrap(), upvalues);
    }
}
