//! Service record and completion state.
//!
//! Mirrors `ksvc_core::entry`/`completion` in spirit (the "lingua franca"
//! between submitter and worker) but carries an arbitrary Rust closure
//! instead of a raw syscall entry, since this pool is generic over
//! whatever the caller wants executed on a worker thread.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// A service function: takes the opaque argument, returns a result code.
pub type ServiceFn = Arc<dyn Fn(usize) -> i64 + Send + Sync>;

/// A `(fn, arg)` pair submitted for execution on a worker.
///
/// Immutable once handed to a worker. The C source resets a worker's
/// slot to the sentinel `(null, null)` after execution; here the slot
/// is simply `Option<Service>`, so "consumed" is `None`.
#[derive(Clone)]
pub struct Service {
    pub func: ServiceFn,
    pub arg: usize,
}

impl Service {
    pub fn new(func: impl Fn(usize) -> i64 + Send + Sync + 'static, arg: usize) -> Self {
        Self {
            func: Arc::new(func),
            arg,
        }
    }

    #[inline]
    pub(crate) fn exec(&self) -> i64 {
        (self.func)(self.arg)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service").field("arg", &self.arg).finish()
    }
}

/// Caller-owned completion block, outliving the request it was handed
/// to. Only the worker writes; a poller reads `done` then `ret`.
///
/// `ret` is written with `Relaxed` ordering and `done` with `Release`;
/// a poller that observes `done == true` via `Acquire` is guaranteed to
/// see the `ret` write that preceded it — the same publication order
/// the C source gets from its explicit `smp_mb()` between the two
/// stores, and the same pattern this workspace's `ksvc-executor` ring
/// code uses for its head/tail handoff.
#[derive(Debug, Default)]
pub struct CompletionState {
    done: AtomicBool,
    ret: AtomicI64,
}

impl CompletionState {
    pub fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
            ret: AtomicI64::new(0),
        }
    }

    /// True once the worker has finished and published `ret`.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// The service's return value. Only meaningful after `is_done()`.
    #[inline]
    pub fn ret(&self) -> i64 {
        self.ret.load(Ordering::Relaxed)
    }

    pub(crate) fn complete(&self, ret: i64) {
        self.ret.store(ret, Ordering::Relaxed);
        self.done.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_executes_with_arg() {
        let svc = Service::new(|arg| arg as i64 * 2, 21);
        assert_eq!(svc.exec(), 42);
    }

    #[test]
    fn completion_state_publishes_ret_before_done() {
        let state = CompletionState::new();
        assert!(!state.is_done());
        state.complete(7);
        assert!(state.is_done());
        assert_eq!(state.ret(), 7);
    }
}
