//! Tests for the runtime model: stack, tables, userdata lifecycle, calls

use super::*;
use crate::config::BindConfig;
use crate::error::StackError;
use core::any::TypeId;
use core::ffi::c_void;
use std::cell::Cell;
use std::rc::Rc;

/// Handle that counts releases
struct Counted {
    released: Rc<Cell<u32>>,
}

impl Handle for Counted {
    fn address(&self) -> *mut c_void {
        core::ptr::null_mut()
    }

    fn pointee(&self) -> TypeId {
        TypeId::of::<Counted>()
    }

    fn owns_pointee(&self) -> bool {
        true
    }

    fn release(&mut self) {
        self.released.set(self.released.get() + 1);
    }

    fn pointee_name(&self) -> &'static str {
        "Counted"
    }
}

fn release(state: &mut State) -> i32 {
    if let Some(block) = state.userdata_handle(1) {
        block.release();
    }
    0
}

/// Push a counted block whose metatable finalizes it
fn push_counted(state: &mut State, counter: &Rc<Cell<u32>>) {
    state.new_userdata(Box::new(Counted {
        released: counter.clone(),
    }));
    if state.new_metatable("counted") {
        state.push_function(release);
        state.set_field(-2, "__gc");
    }
    state.set_metatable(-2);
}

mod stack_tests {
    use super::*;

    #[test]
    fn test_push_and_top() {
        let mut state = State::new();
        assert_eq!(state.top(), 0);

        state.push_integer(1);
        state.push_nil();
        assert_eq!(state.top(), 2);
        assert_eq!(state.type_of(1), Type::Number);
        assert_eq!(state.type_of(-1), Type::Nil);
        assert_eq!(state.type_of(3), Type::None);
        assert_eq!(state.type_of(0), Type::None);
    }

    #[test]
    fn test_set_top_and_pop() {
        let mut state = State::new();
        for i in 0..3 {
            state.push_integer(i);
        }

        state.set_top(5);
        assert_eq!(state.top(), 5);
        assert_eq!(state.type_of(5), Type::Nil);

        state.pop(3);
        assert_eq!(state.top(), 2);

        state.set_top(0);
        state.pop(1);
        assert_eq!(state.top(), 0);
    }

    #[test]
    fn test_abs_index() {
        let mut state = State::new();
        for i in 0..3 {
            state.push_integer(i);
        }

        assert_eq!(state.abs_index(-1), 3);
        assert_eq!(state.abs_index(-3), 1);
        assert_eq!(state.abs_index(2), 2);
        assert_eq!(state.abs_index(upvalue_index(1)), upvalue_index(1));
    }

    #[test]
    fn test_push_value_copies() {
        let mut state = State::new();
        state.push_integer(7);
        state.push_value(1);
        state.push_value(10);

        assert_eq!(state.top(), 3);
        assert_eq!(state.value(2), Some(&Value::Integer(7)));
        assert_eq!(state.type_of(3), Type::Nil);
    }

    #[test]
    fn test_check_stack_limit() {
        let mut config = BindConfig::default();
        config.stack.max_slots = 4;
        let mut state = State::with_config(config);

        assert!(state.check_stack(4).is_ok());
        state.push_integer(1);
        state.push_integer(2);

        match state.check_stack(3) {
            Err(StackError::StackOverflow { requested, limit }) => {
                assert_eq!(requested, 5);
                assert_eq!(limit, 4);
            }
            other => panic!("expected overflow, got {:?}", other),
        }
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(1), Value::Number(1.0));
        assert_ne!(Value::Integer(1), Value::Number(1.5));
        assert_eq!(Value::string(b"a\0b"), Value::string(b"a\0b"));
        assert_ne!(Value::Nil, Value::Boolean(false));
        assert_eq!(Type::LightUserdata.name(), "lightuserdata");
    }
}

mod table_tests {
    use super::*;

    #[test]
    fn test_sequence_writes() {
        let mut state = State::new();
        state.create_table(2, 0);
        state.push_str("a");
        state.raw_set_index(1, 1);
        state.push_str("b");
        state.raw_set_index(1, 2);

        assert_eq!(state.top(), 1);
        assert_eq!(state.raw_len(1), 2);
        assert_eq!(state.raw_get_index(1, 2), Type::String);
        assert_eq!(state.value(-1).and_then(Value::as_bytes), Some(&b"b"[..]));
        assert_eq!(state.raw_get_index(1, 3), Type::Nil);
    }

    #[test]
    fn test_fields() {
        let mut state = State::new();
        state.create_table(0, 1);
        state.push_integer(5);
        state.set_field(1, "x");

        assert_eq!(state.get_field(1, "x"), Type::Number);
        assert_eq!(state.value(-1), Some(&Value::Integer(5)));
        assert_eq!(state.get_field(1, "y"), Type::Nil);
    }

    #[test]
    fn test_set_table_rejects_nil_key() {
        let mut state = State::new();
        state.create_table(0, 0);
        state.push_nil();
        state.push_integer(1);

        let err = state.set_table(1).unwrap_err();
        assert!(matches!(err, StackError::InvalidKey { found: "nil" }));
        assert_eq!(state.top(), 1);
    }

    #[test]
    fn test_set_table_rejects_nan_key() {
        let mut state = State::new();
        state.create_table(0, 0);
        state.push_number(f64::NAN);
        state.push_integer(1);

        assert!(state.set_table(1).is_err());
        assert!(state.table_pairs(1).is_empty());
    }

    #[test]
    fn test_hash_part_migrates() {
        let mut table = Table::with_capacity(0, 0);
        table.set_int(2, Value::Integer(20));
        assert_eq!(table.len(), 0);

        table.set_int(1, Value::Integer(10));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_int(2), Value::Integer(20));
    }

    #[test]
    fn test_float_keys_normalize() {
        let mut table = Table::with_capacity(0, 0);
        table.set(Value::Number(1.0), Value::Boolean(true)).unwrap();
        assert_eq!(table.get_int(1), Value::Boolean(true));
        assert_eq!(table.get(&Value::Integer(1)), Value::Boolean(true));
    }

    #[test]
    fn test_nil_value_removes() {
        let mut table = Table::with_capacity(0, 0);
        table.set_str("a", Value::Integer(1));
        table.set_str("b", Value::Integer(2));
        table.set_str("a", Value::Nil);

        assert_eq!(table.get_str("a"), Value::Nil);
        assert_eq!(table.get_str("b"), Value::Integer(2));
        assert_eq!(table.pairs().len(), 1);
    }

    #[test]
    fn test_table_pairs() {
        let mut state = State::new();
        state.create_table(1, 1);
        state.push_boolean(true);
        state.raw_set_index(1, 1);
        state.push_str("v");
        state.set_field(1, "k");

        let pairs = state.table_pairs(1);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (Value::Integer(1), Value::Boolean(true)));
    }
}

mod userdata_tests {
    use super::*;

    #[test]
    fn test_new_metatable_once() {
        let mut state = State::new();
        assert!(state.new_metatable("m"));
        assert!(!state.new_metatable("m"));
        assert_eq!(state.top(), 2);
        assert_eq!(state.value(1), state.value(2));

        assert_eq!(state.get_metatable_named("m"), Type::Table);
        assert_eq!(state.get_metatable_named("absent"), Type::Nil);
    }

    #[test]
    fn test_metatable_name_of() {
        let counter = Rc::new(Cell::new(0));
        let mut state = State::new();
        push_counted(&mut state, &counter);

        assert_eq!(state.type_of(-1), Type::Userdata);
        assert_eq!(state.metatable_name_of(-1).as_deref(), Some("counted"));
        assert!(state.get_metatable(-1));
        assert_eq!(state.type_of(-1), Type::Table);
    }

    #[test]
    fn test_gc_runs_finalizer() {
        let counter = Rc::new(Cell::new(0));
        let mut state = State::new();
        push_counted(&mut state, &counter);
        state.pop(1);

        assert_eq!(state.collect_garbage(), 1);
        assert_eq!(counter.get(), 1);
        assert_eq!(state.live_userdata(), 0);
    }

    #[test]
    fn test_reachable_block_survives() {
        let counter = Rc::new(Cell::new(0));
        let mut state = State::new();
        push_counted(&mut state, &counter);

        assert_eq!(state.collect_garbage(), 0);

        state.set_global("keep");
        assert_eq!(state.collect_garbage(), 0);
        assert_eq!(counter.get(), 0);

        state.push_nil();
        state.set_global("keep");
        assert_eq!(state.collect_garbage(), 1);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_block_without_gc_skips_release() {
        let counter = Rc::new(Cell::new(0));
        let mut state = State::new();
        state.new_userdata(Box::new(Counted {
            released: counter.clone(),
        }));
        state.pop(1);

        assert_eq!(state.collect_garbage(), 1);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_close_finalizes_once() {
        let counter = Rc::new(Cell::new(0));
        let mut state = State::new();
        push_counted(&mut state, &counter);
        push_counted(&mut state, &counter);

        state.close();
        assert_eq!(counter.get(), 2);
        assert!(state.is_closed());

        drop(state);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_drop_finalizes() {
        let counter = Rc::new(Cell::new(0));
        {
            let mut state = State::new();
            push_counted(&mut state, &counter);
        }
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_drop_without_finalization() {
        let counter = Rc::new(Cell::new(0));
        {
            let mut config = BindConfig::default();
            config.gc.finalize_on_close = false;
            let mut state = State::with_config(config);
            push_counted(&mut state, &counter);
        }
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_light_userdata_address() {
        let mut value = 5u32;
        let address = &mut value as *mut u32 as *mut c_void;
        let mut state = State::new();
        state.push_light_userdata(address);

        assert_eq!(state.type_of(1), Type::LightUserdata);
        assert_eq!(state.to_userdata(1), address);
    }

    #[test]
    fn test_full_userdata_address_is_host_object() {
        let mut value = 9u32;
        let address = &mut value as *mut u32;
        let mut state = State::new();
        let block = state.new_userdata(Box::new(crate::push::PointerHandle::new(address)));

        assert_eq!(state.to_userdata(1), address.cast::<c_void>());
        assert_ne!(state.to_userdata(1) as usize, block.address());
        state.push_integer(1);
        assert!(state.to_userdata(2).is_null());
    }

    #[test]
    fn test_state_push_entry_points() {
        let mut state = State::new();
        assert_eq!(state.push(vec![1, 2, 3]), 1);
        assert_eq!(state.push(("a", 2)), 2);
        assert_eq!(state.raw_len(1), 3);

        let mut value = 4u32;
        assert_eq!(state.push_keyed("raw.u32", crate::push::User(&mut value as *mut u32)), 1);
        assert_eq!(state.metatable_name_of(-1).as_deref(), Some("raw.u32"));
        assert_eq!(state.top(), 4);
    }
}

mod call_tests {
    use super::*;

    fn add(state: &mut State) -> i32 {
        let a = state.value(1).and_then(Value::as_integer).unwrap_or(0);
        let b = state.value(2).and_then(Value::as_integer).unwrap_or(0);
        state.push_integer(a + b);
        1
    }

    fn two_results(state: &mut State) -> i32 {
        state.push_integer(1);
        state.push_integer(2);
        2
    }

    fn read_upvalues(state: &mut State) -> i32 {
        state.push_value(upvalue_index(2));
        state.push_value(upvalue_index(1));
        2
    }

    fn count_args(state: &mut State) -> i32 {
        let n = state.top();
        state.push_integer(n as i64);
        1
    }

    #[test]
    fn test_call_returns() {
        let mut state = State::new();
        state.push_function(add);
        state.push_integer(2);
        state.push_integer(3);

        assert_eq!(state.call(2, 1).unwrap(), 1);
        assert_eq!(state.top(), 1);
        assert_eq!(state.value(1), Some(&Value::Integer(5)));
    }

    #[test]
    fn test_call_pads_results() {
        let mut state = State::new();
        state.push_function(add);
        state.push_integer(2);
        state.push_integer(3);

        assert_eq!(state.call(2, 3).unwrap(), 3);
        assert_eq!(state.top(), 3);
        assert_eq!(state.type_of(2), Type::Nil);
    }

    #[test]
    fn test_call_multret() {
        let mut state = State::new();
        state.push_function(two_results);
        assert_eq!(state.call(0, MULTRET).unwrap(), 2);
        assert_eq!(state.value(2), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_not_callable() {
        let mut state = State::new();
        state.push_integer(1);
        let err = state.call(0, 0).unwrap_err();
        assert!(matches!(err, StackError::NotCallable { found: Type::Number }));
    }

    #[test]
    fn test_call_without_function_slot() {
        let mut state = State::new();
        assert!(matches!(
            state.call(0, 0),
            Err(StackError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_upvalues_in_capture_order() {
        let mut state = State::new();
        state.push_str("first");
        state.push_integer(2);
        state.push_closure(read_upvalues, 2);
        assert_eq!(state.top(), 1);

        assert_eq!(state.call(0, MULTRET).unwrap(), 2);
        assert_eq!(state.value(1), Some(&Value::Integer(2)));
        assert_eq!(state.value(2).and_then(Value::as_bytes), Some(&b"first"[..]));
    }

    #[test]
    fn test_frame_relative_indexing() {
        let mut state = State::new();
        state.push_integer(99);
        state.push_function(count_args);
        state.push_integer(1);
        state.push_integer(2);

        state.call(2, 1).unwrap();
        assert_eq!(state.top(), 2);
        assert_eq!(state.value(1), Some(&Value::Integer(99)));
        assert_eq!(state.value(2), Some(&Value::Integer(2)));
        assert!(!state.in_call());
    }
}

mod reference_tests {
    use super::*;

    #[test]
    fn test_registry_ref() {
        let mut state = State::new();
        state.push_str("kept");
        let r = state.reference(-1);
        state.pop(1);
        assert!(!r.is_nil());

        state.push_reference(r);
        assert_eq!(state.value(-1).and_then(Value::as_bytes), Some(&b"kept"[..]));

        state.unreference(r);
        state.push_reference(r);
        assert_eq!(state.type_of(-1), Type::Nil);
    }

    #[test]
    fn test_nil_reference() {
        let mut state = State::new();
        state.push_nil();
        assert_eq!(state.reference(-1), RegistryRef::NIL);
    }

    #[test]
    fn test_slot_reuse() {
        let mut state = State::new();
        state.push_integer(1);
        let first = state.reference(-1);
        state.unreference(first);
        let second = state.reference(-1);
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn test_stack_ref() {
        let mut state = State::new();
        state.push_integer(10);
        state.push_integer(20);

        let r = StackRef::new(&state, -2);
        assert_eq!(r.index(), 1);
        assert_eq!(r.push(&mut state), 1);
        assert_eq!(state.value(-1), Some(&Value::Integer(10)));
    }

    #[test]
    fn test_globals() {
        let mut state = State::new();
        state.push_boolean(true);
        state.set_global("flag");
        assert_eq!(state.top(), 0);

        assert_eq!(state.get_global("flag"), Type::Boolean);
        assert_eq!(state.get_global("missing"), Type::Nil);
    }

    #[test]
    fn test_stack_guard() {
        let mut state = State::new();
        let guard = StackGuard::begin(&state);

        state.push_integer(1);
        assert!(!guard.is_balanced(&state));
        assert_eq!(guard.delta(&state), 1);

        state.pop(1);
        guard.assert_balanced(&state);
    }
}

mod finalizer_registry_tests {
    use super::*;

    fn other(_state: &mut State) -> i32 {
        0
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = FinalizerRegistry::new();
        assert!(registry.register("k", release));
        assert!(!registry.register("k", other));

        let entry = registry.get("k").unwrap();
        assert_eq!(entry.finalizer as usize, release as NativeFn as usize);
        assert_eq!(entry.reuses, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_runs_are_counted() {
        let mut registry = FinalizerRegistry::new();
        registry.register("k", release);
        registry.note_run("k");
        registry.note_run("absent");

        assert_eq!(registry.get("k").unwrap().runs, 1);
        assert!(!registry.contains("absent"));
    }
}
