//! # wpool — a dynamically-sized worker pool
//!
//! A client submits a *service* — a function plus an opaque argument —
//! and the pool hands it to a pre-allocated parked worker, creating one
//! on demand if none is free, then wakes it. The worker executes the
//! service, optionally publishes a return value and completion flag
//! through a caller-owned [`CompletionState`], then re-parks until
//! reused or retired.
//!
//! Intended for a privileged, latency-sensitive execution context:
//! requests are dispatched to pre-allocated worker threads without
//! per-request thread creation on the hot path. The pool does not
//! queue pending requests — a submit either finds/creates a worker or
//! returns [`PoolError::Retry`] — and offers no priorities, fairness
//! guarantees, in-flight cancellation, or completion notification
//! beyond the caller-supplied state block.
//!
//! ```
//! use std::sync::Arc;
//! use wpool::{Pool, CompletionState};
//!
//! let pool = Pool::init_defaults("example").unwrap();
//! let state = Arc::new(CompletionState::new());
//! pool.submit_raw(wpool::Service::new(|arg| arg as i64 + 1, 41), Some(state.clone())).unwrap();
//! while !state.is_done() {
//!     std::thread::yield_now();
//! }
//! assert_eq!(state.ret(), 42);
//! pool.destroy();
//! ```

mod error;
mod pool;
mod service;
mod worker;

pub use error::{PoolError, Result};
pub use pool::{Pool, BALANCE_THRESHOLD, DEFAULT_MAX, DEFAULT_MIN};
pub use service::{CompletionState, Service, ServiceFn};
