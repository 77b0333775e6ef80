//! Container strategies - one table per container
//!
//! Sequences fill positions 1..=n in iteration order. Associative containers
//! store each pair once; their order is whatever the container yields.
//! An element that pushes several slots contributes its first one, an element
//! that pushes none is stored as nil.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};

use super::Push;
use crate::logging;
use crate::runtime::{Integer, State};

/// Any iterator pushed as a sequence table
#[derive(Debug, Clone)]
pub struct Sequence<I>(pub I);

/// Any iterator of pairs pushed as an associative table
#[derive(Debug, Clone)]
pub struct Associative<I>(pub I);

fn table_hint(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Push `value` as exactly one slot
fn push_element<T: Push>(state: &mut State, value: T) {
    let top = state.top();
    match value.push(state) {
        1 => {}
        0 => state.push_nil(),
        _ => state.set_top(top + 1),
    }
}

pub(crate) fn push_sequence<I>(state: &mut State, items: I) -> i32
where
    I: IntoIterator,
    I::Item: Push,
{
    let items = items.into_iter();
    state.create_table(table_hint(items.size_hint().0), 0);
    let table = state.top();

    for (i, item) in items.enumerate() {
        push_element(state, item);
        state.raw_set_index(table, i as Integer + 1);
    }
    1
}

pub(crate) fn push_associative<I, K, V>(state: &mut State, pairs: I) -> i32
where
    I: IntoIterator<Item = (K, V)>,
    K: Push,
    V: Push,
{
    let pairs = pairs.into_iter();
    state.create_table(0, table_hint(pairs.size_hint().0));
    let table = state.top();

    for (key, value) in pairs {
        push_element(state, key);
        push_element(state, value);
        if let Err(e) = state.set_table(table) {
            logging::log_runtime_warning(&format!("associative push skipped a pair: {}", e));
        }
    }
    1
}

impl<I> Push for Sequence<I>
where
    I: IntoIterator,
    I::Item: Push,
{
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_sequence(state, self.0)
    }
}

impl<I, K, V> Push for Associative<I>
where
    I: IntoIterator<Item = (K, V)>,
    K: Push,
    V: Push,
{
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_associative(state, self.0)
    }
}

macro_rules! impl_push_sequence {
    ($($container:ident),*) => {
        $(
            impl<T: Push> Push for $container<T> {
                #[inline]
                fn push(self, state: &mut State) -> i32 {
                    push_sequence(state, self)
                }
            }

            impl<'a, T> Push for &'a $container<T>
            where
                &'a T: Push,
            {
                #[inline]
                fn push(self, state: &mut State) -> i32 {
                    push_sequence(state, self.iter())
                }
            }
        )*
    };
}

impl_push_sequence!(Vec, VecDeque, LinkedList, BTreeSet);

impl<T: Push, S> Push for HashSet<T, S> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_sequence(state, self)
    }
}

impl<T: Push, const N: usize> Push for [T; N] {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_sequence(state, self)
    }
}

impl<K: Push, V: Push, S> Push for HashMap<K, V, S> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_associative(state, self)
    }
}

impl<'a, K, V, S> Push for &'a HashMap<K, V, S>
where
    &'a K: Push,
    &'a V: Push,
{
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_associative(state, self.iter())
    }
}

impl<K: Push, V: Push> Push for BTreeMap<K, V> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_associative(state, self)
    }
}

impl<'a, K, V> Push for &'a BTreeMap<K, V>
where
    &'a K: Push,
    &'a V: Push,
{
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_associative(state, self.iter())
    }
}
