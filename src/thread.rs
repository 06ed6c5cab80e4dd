//! Detached thread wrapper and the process-wide CPU affinity policy.

use std::sync::Mutex;
use std::thread;

use lazy_static::lazy_static;

use crate::error::PoolError;

/// Logical thread classes the affinity pattern distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalThread {
    /// The process main thread.
    Main = 0,
    /// The communication (messaging) thread.
    Comm = 1,
    /// A pool worker; pass the worker index to [`set_affinity`].
    PoolWorker = 2,
}

#[derive(Debug, Clone, Copy)]
struct AffinityPolicy {
    bind: [bool; 3],
    cpu_lo: [usize; 3],
    cpu_hi: [usize; 3],
}

lazy_static! {
    static ref AFFINITY: Mutex<Option<AffinityPolicy>> = Mutex::new(None);
}

fn ncpu() -> usize {
    core_affinity::get_core_ids()
        .map(|ids| ids.len())
        .unwrap_or(1)
        .max(1)
}

/// Installs the process-wide affinity pattern.
///
/// Index 0 describes the main thread, 1 the communication thread, 2 the
/// pool workers. A bound class pins inside `[cpu_lo, cpu_hi]`; an unbound
/// class is left on the OS default mask. Call this before the pool starts;
/// every range must satisfy `cpu_lo <= cpu_hi < ncpu`.
pub fn set_affinity_pattern(
    bind: [bool; 3],
    cpu_lo: [usize; 3],
    cpu_hi: [usize; 3],
) -> Result<(), PoolError> {
    let ncpu = ncpu();
    for i in 0..3 {
        if cpu_lo[i] > cpu_hi[i] || cpu_hi[i] >= ncpu {
            return Err(PoolError::Config(format!(
                "affinity range [{}, {}] for logical thread {} does not fit {} cpus",
                cpu_lo[i], cpu_hi[i], i, ncpu
            )));
        }
    }
    *AFFINITY.lock().unwrap() = Some(AffinityPolicy {
        bind,
        cpu_lo,
        cpu_hi,
    });
    Ok(())
}

/// Applies the installed pattern to the calling thread.
///
/// Workers pass their pool index; consecutive workers spread across the
/// configured range, worker `i` landing on `cpu_lo + (i % width)`. Main
/// and communication threads pin to their `cpu_lo`. A pinning failure is
/// reported on stderr and otherwise ignored, so the thread still runs.
pub fn set_affinity(which: LogicalThread, index: Option<usize>) {
    let policy = match *AFFINITY.lock().unwrap() {
        Some(p) => p,
        None => return,
    };
    let id = which as usize;
    if !policy.bind[id] {
        return;
    }
    let cpu = match which {
        LogicalThread::PoolWorker => {
            let Some(ind) = index else {
                eprintln!("set_affinity: pool worker without an index");
                return;
            };
            let width = policy.cpu_hi[id] - policy.cpu_lo[id] + 1;
            policy.cpu_lo[id] + ind % width
        }
        _ => policy.cpu_lo[id],
    };
    if !core_affinity::set_for_current(core_affinity::CoreId { id: cpu }) {
        eprintln!("set_affinity: could not pin to cpu {cpu}");
    }
}

/// Minimal handle over a detached OS thread.
///
/// Construction starts nothing; [`start`](Thread::start) spawns the thread
/// detached with kernel scheduling. There is no join: the kernel resource
/// cleans itself up when the closure returns.
pub struct Thread {
    id: Option<thread::ThreadId>,
    pool_index: i64,
}

impl Thread {
    pub fn new() -> Self {
        Thread {
            id: None,
            pool_index: -1,
        }
    }

    pub(crate) fn set_pool_index(&mut self, index: usize) {
        self.pool_index = index as i64;
    }

    /// Index of this thread in the pool, or -1 outside a pool.
    pub fn pool_index(&self) -> i64 {
        self.pool_index
    }

    /// OS identity of the running thread, if started.
    pub fn id(&self) -> Option<thread::ThreadId> {
        self.id
    }

    /// Spawns the thread running `work` and detaches it.
    pub fn start<F>(&mut self, work: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = if self.pool_index >= 0 {
            format!("pool-worker-{}", self.pool_index)
        } else {
            "taskpool-thread".to_string()
        };
        let handle = thread::Builder::new()
            .name(name)
            .spawn(work)
            .map_err(|e| PoolError::Resource(format!("thread creation failed: {e}")))?;
        self.id = Some(handle.thread().id());
        // Dropping the join handle detaches the thread.
        drop(handle);
        Ok(())
    }
}

impl Default for Thread {
    fn default() -> Self {
        Thread::new()
    }
}
