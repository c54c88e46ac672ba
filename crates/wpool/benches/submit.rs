//! Submit-latency benchmark, in the style of this workspace's
//! `cmd/gvt/benchmark` criterion harness.

use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use wpool::{CompletionState, Pool};

fn bench_submit_steady_state(c: &mut Criterion) {
    let pool = Pool::init_defaults("bench").expect("init");

    // Warm the pool up to steady state so the benchmark measures
    // free-list reuse, not on-demand worker creation.
    for _ in 0..wpool::DEFAULT_MAX {
        let state = Arc::new(CompletionState::new());
        pool.submit_raw(wpool::Service::new(|arg| arg as i64, 0), Some(state.clone()))
            .unwrap();
        while !state.is_done() {
            std::thread::yield_now();
        }
    }

    c.bench_function("submit_and_wait", |b| {
        b.iter(|| {
            let state = Arc::new(CompletionState::new());
            pool.submit_raw(wpool::Service::new(|arg| arg as i64, 7), Some(state.clone()))
                .unwrap();
            while !state.is_done() {
                std::thread::yield_now();
            }
            state.ret()
        });
    });

    pool.destroy();
}

criterion_group!(benches, bench_submit_steady_state);
criterion_main!(benches);
