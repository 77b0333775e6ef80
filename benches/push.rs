//! Push strategy benchmarks
//!
//! Measures the cost of each strategy family against a fresh state.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stackbind::{push, Closure, State, Value};
use std::collections::HashMap;

#[derive(Clone)]
struct Particle {
    position: [f64; 3],
}

stackbind::impl_usertype!(Particle);

fn noop(_state: &mut State) -> i32 {
    0
}

fn bench_scalars(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalar");

    group.bench_function("integer", |b| {
        let mut state = State::new();
        b.iter(|| {
            push(&mut state, black_box(42i64));
            state.pop(1);
        });
    });

    group.bench_function("string", |b| {
        let mut state = State::new();
        b.iter(|| {
            push(&mut state, black_box("a moderately sized string"));
            state.pop(1);
        });
    });

    group.bench_function("tuple", |b| {
        let mut state = State::new();
        b.iter(|| {
            let n = push(&mut state, black_box((1i64, "two", (3.0f64, 4.0f64))));
            state.pop(n);
        });
    });

    group.finish();
}

fn bench_handles(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle");

    group.bench_function("value", |b| {
        let mut state = State::new();
        let particle = Particle {
            position: [0.0; 3],
        };
        b.iter(|| {
            push(&mut state, black_box(particle.clone()));
            state.pop(1);
        });
        state.collect_garbage();
    });

    group.bench_function("pointer", |b| {
        let mut state = State::new();
        let mut particle = Particle {
            position: [1.0, 2.0, 3.0],
        };
        let ptr = &mut particle as *mut Particle;
        b.iter(|| {
            push(&mut state, black_box(ptr));
            state.pop(1);
        });
        black_box(particle.position);
    });

    group.bench_function("unique_box", |b| {
        let mut state = State::new();
        b.iter(|| {
            push(&mut state, Box::new(Particle {
                position: [0.0; 3],
            }));
            state.pop(1);
        });
        state.collect_garbage();
    });

    group.finish();
}

fn bench_containers(c: &mut Criterion) {
    let mut group = c.benchmark_group("container");

    for size in [8usize, 64, 512].iter() {
        group.bench_with_input(BenchmarkId::new("vec", size), size, |b, &size| {
            let items: Vec<i64> = (0..size as i64).collect();
            let mut state = State::new();
            b.iter(|| {
                push(&mut state, black_box(&items));
                state.pop(1);
            });
        });

        group.bench_with_input(BenchmarkId::new("map", size), size, |b, &size| {
            let map: HashMap<String, i64> = (0..size).map(|i| (format!("key{}", i), i as i64)).collect();
            let mut state = State::new();
            b.iter(|| {
                push(&mut state, black_box(&map));
                state.pop(1);
            });
        });
    }

    group.finish();
}

fn bench_closures(c: &mut Criterion) {
    let mut group = c.benchmark_group("closure");

    group.bench_function("three_upvalues", |b| {
        let mut state = State::new();
        b.iter(|| {
            push(&mut state, Closure::new(noop, black_box((1i64, 2i64, "three"))));
            state.pop(1);
        });
    });

    group.bench_function("raw_value", |b| {
        let mut state = State::new();
        let value = Value::Integer(7);
        b.iter(|| {
            push(&mut state, black_box(&value));
            state.pop(1);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_scalars, bench_handles, bench_containers, bench_closures);
criterion_main!(benches);
