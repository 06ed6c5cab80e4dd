//! The process-wide worker pool.
//!
//! One singleton pool per process, constructed on first access and torn
//! down exactly once by [`ThreadPool::end`]. Workers are detached threads
//! that block on the shared queue; there is no work stealing and no local
//! queue, just the one double-ended buffer.

use std::env;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use lazy_static::lazy_static;

use crate::backoff::BackoffWaiter;
use crate::deque::{Deque, DequeStats};
use crate::error::PoolError;
use crate::task::{PoolTask, ShutdownTask};
use crate::thread::{set_affinity, LogicalThread, Thread};

/// Environment variable overriding the default worker count.
pub const POOL_NTHREAD: &str = "POOL_NTHREAD";

lazy_static! {
    static ref POOL: ThreadPool = ThreadPool::start_up();
}

/// Worker count requested through [`ThreadPool::begin`] before first use;
/// `usize::MAX` means "not requested".
static REQUESTED: AtomicUsize = AtomicUsize::new(usize::MAX);

/// State shared between the pool handle and its workers.
struct Shared {
    queue: Deque<Box<dyn PoolTask>>,
    finish: AtomicBool,
    finished: AtomicUsize,
}

/// A singleton pool of threads for dynamic execution of tasks.
///
/// Instantiate the pool (through [`begin`](ThreadPool::begin) or any
/// first use) while the process is still running a single thread, and
/// shut it down exactly once with [`end`](ThreadPool::end). Submitted
/// tasks are owned by the pool and dropped after they run.
pub struct ThreadPool {
    shared: Arc<Shared>,
    /// Handles of the detached workers, held for the pool's lifetime.
    _workers: Vec<Thread>,
    nthreads: usize,
    ended: AtomicBool,
}

/// Worker count from the environment, or one less than the CPU count.
fn default_nthread() -> Result<usize, PoolError> {
    match env::var(POOL_NTHREAD) {
        Ok(value) => value.trim().parse::<usize>().map_err(|_| {
            PoolError::Config(format!(
                "{POOL_NTHREAD} is not an unsigned integer: {value:?}"
            ))
        }),
        Err(env::VarError::NotPresent) => {
            let ncpu = thread::available_parallelism().map(|n| n.get()).unwrap_or(2);
            Ok(ncpu.saturating_sub(1).max(1))
        }
        Err(e) => Err(PoolError::Config(format!("{POOL_NTHREAD}: {e}"))),
    }
}

fn worker_main(shared: &Shared, index: usize) {
    set_affinity(LogicalThread::PoolWorker, Some(index));
    while !shared.finish.load(Ordering::Acquire) {
        if let Some(task) = shared.queue.pop_front(true) {
            if let Err(err) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
                let msg = if let Some(s) = err.downcast_ref::<&str>() {
                    *s
                } else if let Some(s) = err.downcast_ref::<String>() {
                    s.as_str()
                } else {
                    "unknown panic payload"
                };
                eprintln!("pool worker {index}: task panicked: {msg}");
            }
        }
    }
    shared.finished.fetch_add(1, Ordering::AcqRel);
}

impl ThreadPool {
    /// Initialization failures are fatal here: nothing has started yet and
    /// callers hold no recovery path.
    fn start_up() -> Self {
        let requested = REQUESTED.load(Ordering::Acquire);
        let nthreads = if requested == usize::MAX {
            match default_nthread() {
                Ok(n) => n,
                Err(e) => panic!("{e}"),
            }
        } else {
            requested
        };

        let shared = Arc::new(Shared {
            queue: Deque::new(),
            finish: AtomicBool::new(false),
            finished: AtomicUsize::new(0),
        });

        let mut workers = Vec::with_capacity(nthreads);
        for i in 0..nthreads {
            let mut worker = Thread::new();
            worker.set_pool_index(i);
            let shared = Arc::clone(&shared);
            if let Err(e) = worker.start(move || worker_main(&shared, i)) {
                panic!("{e}");
            }
            workers.push(worker);
        }

        ThreadPool {
            shared,
            _workers: workers,
            nthreads,
            ended: AtomicBool::new(false),
        }
    }

    /// Returns the singleton, constructing it on first use.
    pub fn instance() -> &'static ThreadPool {
        &POOL
    }

    /// Constructs the pool with `nthreads` workers, or the default
    /// (`POOL_NTHREAD`, else one less than the CPU count) when `None`.
    ///
    /// Invoke while the process is still single-threaded. The first
    /// construction wins; a later `begin` cannot resize the pool.
    pub fn begin(nthreads: Option<usize>) {
        if let Some(n) = nthreads {
            REQUESTED.store(n, Ordering::Release);
        }
        lazy_static::initialize(&POOL);
    }

    /// Shuts the pool down: waits for the queue to drain, wakes every
    /// worker with a sentinel, and returns once all workers have exited.
    /// Running tasks are never preempted. Idempotent.
    pub fn end() {
        let pool = Self::instance();
        if pool.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut waiter = BackoffWaiter::new();
        while !pool.shared.queue.is_empty() {
            waiter.wait();
        }
        pool.shared.finish.store(true, Ordering::Release);
        for _ in 0..pool.nthreads {
            pool.shared.queue.push_back(Box::new(ShutdownTask));
        }
        waiter.reset();
        while pool.shared.finished.load(Ordering::Acquire) != pool.nthreads {
            waiter.wait();
        }
    }

    /// Submits a task, transferring ownership to the pool. High-priority
    /// tasks go to the front of the queue, the rest to the back.
    pub fn submit(task: Box<dyn PoolTask>) {
        let pool = Self::instance();
        if task.attrs().is_high_priority() {
            pool.shared.queue.push_front(task);
        } else {
            pool.shared.queue.push_back(task);
        }
    }

    /// Submits a batch of tasks in order.
    pub fn submit_all(tasks: Vec<Box<dyn PoolTask>>) {
        for task in tasks {
            Self::submit(task);
        }
    }

    /// Runs one queued task on the calling thread without blocking.
    /// Returns whether a task was run; an otherwise idle thread can call
    /// this to help drain the queue.
    pub fn run_one_task() -> bool {
        match Self::instance().shared.queue.pop_front(false) {
            Some(task) => {
                task.run();
                true
            }
            None => false,
        }
    }

    /// Number of workers in the pool.
    pub fn size() -> usize {
        Self::instance().nthreads
    }

    /// Number of workers that have exited their main loop.
    pub fn finished_count() -> usize {
        Self::instance().shared.finished.load(Ordering::Acquire)
    }

    /// Queue statistics.
    pub fn stats() -> DequeStats {
        Self::instance().shared.queue.stats()
    }
}
