//! # taskpool — concurrency substrate of a parallel numerical runtime
//!
//! Synchronization primitives, a blocking double-ended work queue, and the
//! process-wide worker pool that drains it. The numerical layers above
//! (operator kernels, the messaging world) only see this crate's task and
//! pool API; nothing here knows about them.
//!
//! ## Architecture
//!
//! - **Primitives**: [`Mutex`], [`Spinlock`], [`ReaderWriterMutex`] and
//!   [`FairMutex`] all satisfy the same [`RawLock`] contract, so
//!   [`ScopedGuard`] works over any of them. [`ConditionVariable`] embeds
//!   its mutex, accumulates signals and wakes waiters in arrival order.
//! - **Queue**: [`Deque`] is a growable circular buffer pushed and popped
//!   at both ends; pops can block on the embedded condition variable.
//! - **Pool**: [`ThreadPool`] is a singleton set of detached workers
//!   executing [`PoolTask`]s; high-priority tasks jump the queue, and
//!   shutdown wakes every worker with a sentinel.
//! - **Ranges**: [`Range`] seeds tasks from iterator ranges by bisection.
//!
//! ## Example
//!
//! ```no_run
//! use taskpool::{TaskFn, ThreadPool};
//!
//! ThreadPool::begin(Some(4));
//! ThreadPool::submit(Box::new(TaskFn::new(|| {
//!     println!("hello from a pool worker");
//! })));
//! ThreadPool::end();
//! ```

pub mod backoff;
pub mod condvar;
pub mod deque;
pub mod error;
pub mod fair;
pub mod lock;
pub mod mutex;
pub mod pool;
pub mod range;
pub mod rwlock;
pub mod task;
pub mod thread;

pub use backoff::BackoffWaiter;
pub use condvar::ConditionVariable;
pub use deque::{Deque, DequeStats};
pub use error::{PoolError, Result};
pub use fair::FairMutex;
pub use lock::{RawLock, ScopedGuard};
pub use mutex::{try_two_locks, Mutex, Spinlock};
pub use pool::ThreadPool;
pub use range::{Range, Split};
pub use rwlock::{LockMode, ReaderWriterMutex};
pub use task::{PoolTask, TaskAttributes, TaskFn};
pub use thread::{set_affinity, set_affinity_pattern, LogicalThread, Thread};
