//! Pool: owns workers, free-list, sizing counters and lock; exposes
//! `init`/`submit`/`destroy`.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::{PoolError, Result};
use crate::service::{CompletionState, Service};
use crate::worker::Worker;

/// Default minimum pool size, used when `init` is given `None`.
pub const DEFAULT_MIN: usize = 3;
/// Default maximum pool size, used when `init` is given `None`.
pub const DEFAULT_MAX: usize = 9;
/// Consecutive shrink-opportunity submits required to lower `max` by 1.
pub const BALANCE_THRESHOLD: i64 = 100;

const NAME_MAX: usize = 256;

/// Everything guarded by the pool's single mutex.
pub(crate) struct PoolState {
    pub(crate) number: usize,
    pub(crate) in_list: usize,
    pub(crate) max: usize,
    pub(crate) balance: i64,
    pub(crate) free_list: Vec<Arc<Worker>>,
    pub(crate) shutdown: bool,
    next_id: u64,
}

pub(crate) struct PoolInner {
    pub(crate) name: String,
    #[allow(dead_code)] // recorded per spec; NUMA placement itself is out of scope
    pub(crate) node: Option<i32>,
    pub(crate) min: usize,
    pub(crate) state: Mutex<PoolState>,
    pub(crate) handles: Mutex<Vec<JoinHandle<()>>>,
}

/// A dynamically-sized worker pool.
///
/// Cheaply cloneable (an `Arc` around the shared state); workers hold
/// their own clone of the inner `Arc` as a non-owning-in-spirit but
/// strong-counted back-reference, so the pool's storage is only freed
/// once `destroy` has joined every worker thread.
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// `min`/`max`/`node` of `None` mean "use the default" (`-1` in the
    /// C source's sentinel convention).
    pub fn init(
        min: Option<usize>,
        max: Option<usize>,
        node: Option<i32>,
        name: impl Into<String>,
    ) -> Result<Arc<Pool>> {
        let min = min.unwrap_or(DEFAULT_MIN);
        let max = max.unwrap_or(DEFAULT_MAX).max(min);
        let name = truncate_name(name.into());

        let inner = Arc::new(PoolInner {
            name,
            node,
            min,
            state: Mutex::new(PoolState {
                number: 0,
                in_list: 0,
                max,
                balance: 0,
                free_list: Vec::with_capacity(min),
                shutdown: false,
                next_id: 0,
            }),
            handles: Mutex::new(Vec::with_capacity(min)),
        });

        for _ in 0..min {
            if create_and_park(&inner).is_err() {
                let pool = Pool { inner };
                pool.destroy();
                return Err(PoolError::OutOfMemory);
            }
        }

        debug_assert_eq!(inner.state.lock().unwrap().number, min);
        debug_assert_eq!(inner.state.lock().unwrap().in_list, min);
        Ok(Arc::new(Pool { inner }))
    }

    /// `init(-1, -1, -1, name)` — all defaults.
    pub fn init_defaults(name: impl Into<String>) -> Result<Arc<Pool>> {
        Self::init(None, None, None, name)
    }

    /// Full form: submit a service with an optional completion state.
    pub fn submit_raw(
        &self,
        service: Service,
        state: Option<Arc<CompletionState>>,
    ) -> Result<()> {
        let worker = self.acquire_worker()?;
        worker.assign(service, state);
        Ok(())
    }

    /// Convenience: submit with `state = None`, discarding the result.
    pub fn submit(&self, func: impl Fn(usize) -> i64 + Send + Sync + 'static, arg: usize) -> Result<()> {
        self.submit_raw(Service::new(func, arg), None)
    }

    /// Signal every worker and block until all have exited. Callers
    /// must ensure no submits race with this call.
    pub fn destroy(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.shutdown = true;
        let parked: Vec<Arc<Worker>> = state.free_list.drain(..).collect();
        state.in_list -= parked.len();
        debug_check_invariants(&state, self.inner.min);
        drop(state);

        for worker in &parked {
            worker.wake_for_shutdown();
        }

        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.inner.handles.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Total non-retired worker count (test/observability helper).
    pub fn worker_count(&self) -> usize {
        self.inner.state.lock().unwrap().number
    }

    /// Current `max` sizing ceiling (test/observability helper).
    pub fn max(&self) -> usize {
        self.inner.state.lock().unwrap().max
    }

    fn acquire_worker(&self) -> Result<Arc<Worker>> {
        let mut guard = self.inner.state.lock().unwrap();

        if guard.shutdown {
            return Err(PoolError::Retry);
        }

        if !guard.free_list.is_empty() {
            balance_down(&mut guard, self.inner.min);
            let worker = guard.free_list.pop().unwrap();
            guard.in_list -= 1;
            debug_check_invariants(&guard, self.inner.min);
            return Ok(worker);
        }

        balance_up(&mut guard);
        guard.in_list += 1;
        guard.number += 1;
        let id = guard.next_id;
        guard.next_id += 1;
        debug_check_invariants(&guard, self.inner.min);
        drop(guard);

        match Worker::spawn(&self.inner, id) {
            Ok(worker) => {
                let mut guard = self.inner.state.lock().unwrap();
                guard.in_list -= 1;
                debug_check_invariants(&guard, self.inner.min);
                Ok(worker)
            }
            Err(_) => {
                let mut guard = self.inner.state.lock().unwrap();
                guard.in_list -= 1;
                guard.number -= 1;
                debug_check_invariants(&guard, self.inner.min);
                if !guard.free_list.is_empty() {
                    balance_down(&mut guard, self.inner.min);
                    let worker = guard.free_list.pop().unwrap();
                    guard.in_list -= 1;
                    debug_check_invariants(&guard, self.inner.min);
                    Ok(worker)
                } else {
                    Err(PoolError::Retry)
                }
            }
        }
    }
}

fn create_and_park(pool: &Arc<PoolInner>) -> Result<()> {
    let id = {
        let mut state = pool.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        id
    };
    let worker = Worker::spawn(pool, id)?;
    let mut state = pool.state.lock().unwrap();
    state.free_list.push(worker);
    state.in_list += 1;
    state.number += 1;
    debug_check_invariants(&state, pool.min);
    Ok(())
}

/// Called when the free-list was non-empty at submit time: the pool
/// had surplus capacity, so nudge the shrink counter.
fn balance_down(state: &mut PoolState, min: usize) {
    if state.max == min || state.in_list <= min {
        state.balance = 0;
        return;
    }
    state.balance -= 1;
    if state.balance <= -BALANCE_THRESHOLD {
        state.balance = 0;
        state.max -= 1;
    }
}

/// Called when submit found the free-list empty and had to grow.
fn balance_up(state: &mut PoolState) {
    if state.balance > 0 {
        state.balance += 1;
    } else {
        state.balance = 0;
    }
    state.max += 1;
}

fn truncate_name(mut name: String) -> String {
    if name.len() > NAME_MAX {
        while !name.is_char_boundary(NAME_MAX) {
            name.pop();
        }
        name.truncate(NAME_MAX);
    }
    name
}

#[cfg(debug_assertions)]
pub(crate) fn debug_check_invariants(state: &PoolState, min: usize) {
    debug_assert!(state.in_list <= state.number, "in_list must not exceed number");
    debug_assert!(min <= state.max, "min must never exceed max");
    debug_assert_eq!(state.free_list.len(), state.in_list, "free_list length must match in_list");
}

#[cfg(not(debug_assertions))]
pub(crate) fn debug_check_invariants(_state: &PoolState, _min: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_state(max: usize, in_list: usize) -> PoolState {
        PoolState {
            number: in_list,
            in_list,
            max,
            balance: 0,
            free_list: Vec::new(),
            shutdown: false,
            next_id: 0,
        }
    }

    #[test]
    fn balance_up_resets_negative_balance() {
        let mut state = fresh_state(9, 3);
        state.balance = -50;
        balance_up(&mut state);
        assert_eq!(state.balance, 0);
        assert_eq!(state.max, 10);
    }

    #[test]
    fn balance_up_keeps_growing_positive_balance() {
        let mut state = fresh_state(9, 3);
        state.balance = 5;
        balance_up(&mut state);
        assert_eq!(state.balance, 6);
        assert_eq!(state.max, 10);
    }

    #[test]
    fn balance_down_never_shrinks_below_min() {
        let mut state = fresh_state(9, 3);
        balance_down(&mut state, 3);
        assert_eq!(state.balance, 0);
        assert_eq!(state.max, 9);
    }

    #[test]
    fn balance_down_never_shrinks_when_max_equals_min() {
        let mut state = fresh_state(3, 3);
        // in_list > min but max == min: still refuses to shrink further.
        state.in_list = 5;
        balance_down(&mut state, 3);
        assert_eq!(state.balance, 0);
        assert_eq!(state.max, 3);
    }

    #[test]
    fn balance_down_requires_threshold_consecutive_observations() {
        let mut state = fresh_state(9, 5);
        for _ in 0..(BALANCE_THRESHOLD - 1) {
            balance_down(&mut state, 3);
        }
        assert_eq!(state.max, 9, "max should not drop before the threshold is reached");
        balance_down(&mut state, 3);
        assert_eq!(state.max, 8);
        assert_eq!(state.balance, 0);
    }

    #[test]
    fn truncate_name_is_silent_and_char_safe() {
        let long = "a".repeat(NAME_MAX + 10);
        let truncated = truncate_name(long);
        assert_eq!(truncated.len(), NAME_MAX);
    }
}
