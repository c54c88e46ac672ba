//! Worker: a long-lived thread running the park/execute loop.
//!
//! # Implementors
//!
//! There is exactly one worker shape in this crate (unlike
//! `ksvc_core::worker::WorkerPool`, which documents `FixedPool`/
//! `LazyPool`/`InlineWorker` as interchangeable strategies) — the pool
//! itself is the strategy, and workers are its plain execution units.

use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, Thread};

use crate::error::{PoolError, Result};
use crate::pool::PoolInner;
use crate::service::{CompletionState, Service};

/// A pending hand-off: the service plus its optional completion state.
type Slot = Option<(Service, Option<Arc<CompletionState>>)>;

pub(crate) struct Worker {
    pub(crate) id: u64,
    /// Set once, immediately after `thread::Builder::spawn` returns.
    /// Not read by the worker's own loop — only by submitters calling
    /// `wake()` — so the brief window before it's populated is benign.
    thread: OnceLock<Thread>,
    /// Handed off lock-free from the pool's perspective: the mutex here
    /// guards only this one worker's slot, not the pool's counters.
    /// Its unlock (by `submit`) paired with the lock taken when the
    /// worker drains the slot is the release/acquire edge the spec's
    /// ordering contract asks for; `thread::park`/`unpark` themselves
    /// also synchronize-with one another, so the pair is redundant
    /// belt-and-braces rather than load-bearing on their own.
    slot: Mutex<Slot>,
    pool: Arc<PoolInner>,
}

impl Worker {
    /// Spawn a new worker thread bound to `pool`, named `"{name}_{id}"`.
    ///
    /// Mirrors `ksvc_module::fixed_pool`'s `thread::Builder::new().name(..)`
    /// convention (there: `"ksvc-worker-{n}"`). The preferred NUMA node
    /// recorded on the pool is *not* applied here — node/CPU pinning
    /// beyond recording the hint is explicitly out of scope.
    pub(crate) fn spawn(pool: &Arc<PoolInner>, id: u64) -> Result<Arc<Worker>> {
        let worker = Arc::new(Worker {
            id,
            thread: OnceLock::new(),
            slot: Mutex::new(None),
            pool: Arc::clone(pool),
        });

        let thread_name = format!("{}_{}", pool.name, id);
        let spawned = worker.clone();
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker_loop(spawned))
            .map_err(|_| PoolError::OutOfMemory)?;

        // Infallible: thread() is available immediately after spawn.
        let _ = worker.thread.set(handle.thread().clone());
        pool.handles.lock().unwrap().push(handle);

        Ok(worker)
    }

    /// Write this worker's slot and wake it. Called by `submit` with
    /// the pool lock already released — the hand-off itself needs no
    /// pool-wide synchronization, only this worker's own slot mutex.
    pub(crate) fn assign(&self, service: Service, state: Option<Arc<CompletionState>>) {
        *self.slot.lock().unwrap() = Some((service, state));
        if let Some(t) = self.thread.get() {
            t.unpark();
        }
    }

    /// Wake a parked worker with no service assigned; its park loop
    /// will observe the pool's shutdown flag and retire.
    pub(crate) fn wake_for_shutdown(&self) {
        if let Some(t) = self.thread.get() {
            t.unpark();
        }
    }
}

/// The park/execute loop. Runs until the worker retires.
fn worker_loop(worker: Arc<Worker>) {
    loop {
        // Park until a service arrives or shutdown is requested.
        // `thread::park` records an unpark token even if `unpark()` was
        // called before we got here, so a wake-up between `submit`
        // releasing the pool lock and this call is never lost — the
        // critical ordering point the C source protects with a
        // pre-park `TASK_INTERRUPTIBLE` marker under the lock.
        loop {
            thread::park();
            if worker.slot.lock().unwrap().is_some() {
                break;
            }
            if worker.pool.state.lock().unwrap().shutdown {
                break;
            }
            // Otherwise: a spurious wake-up (or a shutdown signal that
            // arrived and was already retired by another path). Recheck.
        }

        if let Some((service, state)) = worker.slot.lock().unwrap().take() {
            let ret = service.exec();
            if let Some(state) = state {
                state.complete(ret);
            }
        }

        if park_or_retire(&worker) {
            break;
        }
    }
}

/// Executed by a worker after finishing a service (or after waking
/// with an empty slot during shutdown). Returns `true` if the worker
/// should retire and exit its thread.
fn park_or_retire(worker: &Arc<Worker>) -> bool {
    let mut state = worker.pool.state.lock().unwrap();

    if state.number > state.max || state.shutdown {
        state.number -= 1;
        crate::pool::debug_check_invariants(&state, worker.pool.min);
        true
    } else {
        state.free_list.push(Arc::clone(worker));
        state.in_list += 1;
        crate::pool::debug_check_invariants(&state, worker.pool.min);
        false
    }
}
