//! wpool End-to-End Smoke Test
//!
//! Exercises the pool lifecycle a real caller would go through:
//!   Part A — init: default sizing, floor count, name truncation
//!   Part B — submit/poll: return values, side effects, worker reuse
//!   Part C — growth: a burst past `max` grows the pool without loss
//!   Part D — destroy: every worker thread exits and is joined
//!
//! Run: ./target/release/wpool-smoke

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use wpool::{CompletionState, Pool, PoolError, Service};

struct TestRunner {
    total: usize,
    passed: usize,
    failed: usize,
}

const LINE: &str = "────────────────────────────────────────────────────────────";

impl TestRunner {
    fn new() -> Self {
        Self { total: 0, passed: 0, failed: 0 }
    }

    fn section(&self, name: &str) {
        println!("\n{}", LINE);
        println!("  {}", name);
        println!("{}", LINE);
    }

    fn pass(&mut self, name: &str) {
        self.total += 1;
        self.passed += 1;
        println!("  [{:2}] {:<52} PASS", self.total, name);
    }

    fn fail(&mut self, name: &str, reason: &str) {
        self.total += 1;
        self.failed += 1;
        println!("  [{:2}] {:<52} FAIL: {}", self.total, name, reason);
    }

    fn check(&mut self, name: &str, ok: bool, reason: &str) {
        if ok { self.pass(name); } else { self.fail(name, reason); }
    }

    fn summary(&self) {
        println!("\n{}", LINE);
        println!(
            "  Total: {}  Passed: {}  Failed: {}",
            self.total, self.passed, self.failed
        );
        println!("{}", LINE);
    }
}

/// Busy-poll a completion state with a timeout, used throughout since
/// this crate offers no blocking wait beyond the flag itself.
fn wait_done(state: &CompletionState, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !state.is_done() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::yield_now();
    }
    true
}

fn test_init(t: &mut TestRunner) {
    t.section("Part A: Init");

    match Pool::init_defaults("smoke-defaults") {
        Ok(pool) => {
            t.check(
                "init_defaults floor == DEFAULT_MIN",
                pool.worker_count() == wpool::DEFAULT_MIN,
                &format!("got {}", pool.worker_count()),
            );
            t.check(
                "init_defaults ceiling == DEFAULT_MAX",
                pool.max() == wpool::DEFAULT_MAX,
                &format!("got {}", pool.max()),
            );
            pool.destroy();
        }
        Err(e) => t.fail("init_defaults", &format!("{e}")),
    }

    match Pool::init(Some(5), Some(20), None, "smoke-custom") {
        Ok(pool) => {
            t.check("custom min/max floor", pool.worker_count() == 5, &format!("got {}", pool.worker_count()));
            pool.destroy();
            t.check("destroy leaves zero workers", pool.worker_count() == 0, &format!("got {}", pool.worker_count()));
        }
        Err(e) => t.fail("init with custom min/max", &format!("{e}")),
    }

    match Pool::init(Some(8), Some(3), None, "smoke-inverted") {
        Ok(pool) => {
            t.check("max is raised to at least min", pool.max() >= 8, &format!("max={}", pool.max()));
            pool.destroy();
        }
        Err(e) => t.fail("init with max < min", &format!("{e}")),
    }
}

fn test_submit(t: &mut TestRunner, pool: &Arc<Pool>) {
    t.section("Part B: Submit and Completion");

    let state = Arc::new(CompletionState::new());
    let ok = pool
        .submit_raw(Service::new(|arg| arg as i64 * 2, 21), Some(Arc::clone(&state)))
        .is_ok();
    t.check("submit_raw accepted", ok, "submit returned an error");
    t.check(
        "completion observed within timeout",
        wait_done(&state, Duration::from_secs(2)),
        "service never completed",
    );
    t.check("return value published", state.ret() == 42, &format!("got {}", state.ret()));

    let flag = Arc::new(AtomicI64::new(0));
    let flag_writer = Arc::clone(&flag);
    let state2 = Arc::new(CompletionState::new());
    let _ = pool.submit_raw(
        Service::new(move |_| { flag_writer.store(1, Ordering::Relaxed); -9 }, 0),
        Some(Arc::clone(&state2)),
    );
    wait_done(&state2, Duration::from_secs(2));
    t.check("negative return value published verbatim", state2.ret() == -9, &format!("got {}", state2.ret()));
    t.check("side effect visible after completion", flag.load(Ordering::Relaxed) == 1, "flag not set");

    let before = pool.worker_count();
    let state3 = Arc::new(CompletionState::new());
    let _ = pool.submit_raw(Service::new(|arg| arg as i64, 5), Some(Arc::clone(&state3)));
    wait_done(&state3, Duration::from_secs(2));
    t.check(
        "a second submit reuses a parked worker",
        pool.worker_count() == before,
        &format!("worker_count changed from {before} to {}", pool.worker_count()),
    );

    let ok = pool.submit(|_| 0, 0).is_ok();
    t.check("fire-and-forget submit (no state)", ok, "submit returned an error");
}

fn test_growth(t: &mut TestRunner, pool: &Arc<Pool>) {
    t.section("Part C: On-Demand Growth Under a Burst");

    const K: usize = 16;
    let completed = Arc::new(AtomicUsize::new(0));
    let mut states = Vec::with_capacity(K);

    let max_before = pool.max();
    for _ in 0..K {
        let state = Arc::new(CompletionState::new());
        let completed = Arc::clone(&completed);
        let svc = Service::new(
            move |_| {
                std::thread::sleep(Duration::from_millis(15));
                completed.fetch_add(1, Ordering::SeqCst);
                0
            },
            0,
        );
        loop {
            match pool.submit_raw(svc.clone(), Some(Arc::clone(&state))) {
                Ok(()) => break,
                Err(PoolError::Retry) => std::thread::yield_now(),
                Err(e) => {
                    t.fail("burst submit", &format!("{e}"));
                    break;
                }
            }
        }
        states.push(state);
    }

    let all_done = states.iter().all(|s| wait_done(s, Duration::from_secs(5)));
    t.check("every burst service completed", all_done, "at least one never completed");
    t.check(
        "completed count matches burst size",
        completed.load(Ordering::SeqCst) == K,
        &format!("got {}", completed.load(Ordering::SeqCst)),
    );
    t.check(
        "max grew to accommodate the burst",
        pool.max() >= max_before,
        &format!("max shrank from {max_before} to {}", pool.max()),
    );
}

fn test_destroy(t: &mut TestRunner) {
    t.section("Part D: Destroy");

    let pool = match Pool::init(Some(4), Some(4), None, "smoke-destroy") {
        Ok(p) => p,
        Err(e) => {
            t.fail("init for destroy test", &format!("{e}"));
            return;
        }
    };
    t.check("freshly-initialized pool has min workers", pool.worker_count() == 4, "count mismatch");
    pool.destroy();
    t.check("destroy joins every worker thread", pool.worker_count() == 0, "workers still counted");
}

fn main() {
    println!("=== wpool End-to-End Smoke Test ===");

    let mut t = TestRunner::new();

    test_init(&mut t);

    match Pool::init_defaults("smoke-main") {
        Ok(pool) => {
            test_submit(&mut t, &pool);
            test_growth(&mut t, &pool);
            pool.destroy();
        }
        Err(e) => t.fail("init_defaults for Parts B/C", &format!("{e}")),
    }

    test_destroy(&mut t);

    t.summary();
    std::process::exit(if t.failed > 0 { 1 } else { 0 });
}
