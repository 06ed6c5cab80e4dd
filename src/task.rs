//! Task attributes and the runnable unit executed by the pool.

use serde::{Deserialize, Serialize};

const GENERATOR: u64 = 1;
const STEALABLE: u64 = 1 << 1;
const HIGH_PRIORITY: u64 = 1 << 2;

/// Scheduling hints attached to a task.
///
/// `generator` hints that the task will spawn further tasks, so a
/// scheduler can throttle or widen parallelism around it. `stealable`
/// marks the task as migratable for dynamic load balancing. Neither is
/// interpreted by the pool itself. `high_priority` routes the task to the
/// front of the queue. All default to off.
///
/// Serializes as the raw flag word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskAttributes {
    flags: u64,
}

impl TaskAttributes {
    pub fn new() -> Self {
        TaskAttributes::default()
    }

    /// Attributes with only the generator hint set.
    pub fn generator() -> Self {
        TaskAttributes { flags: GENERATOR }
    }

    /// Attributes with only the high-priority hint set.
    pub fn high_priority() -> Self {
        TaskAttributes {
            flags: HIGH_PRIORITY,
        }
    }

    pub fn is_generator(&self) -> bool {
        self.flags & GENERATOR != 0
    }

    pub fn is_stealable(&self) -> bool {
        self.flags & STEALABLE != 0
    }

    pub fn is_high_priority(&self) -> bool {
        self.flags & HIGH_PRIORITY != 0
    }

    pub fn set_generator(&mut self, on: bool) {
        self.set_flag(GENERATOR, on);
    }

    pub fn set_stealable(&mut self, on: bool) {
        self.set_flag(STEALABLE, on);
    }

    pub fn set_high_priority(&mut self, on: bool) {
        self.set_flag(HIGH_PRIORITY, on);
    }

    fn set_flag(&mut self, bit: u64, on: bool) {
        if on {
            self.flags |= bit;
        } else {
            self.flags &= !bit;
        }
    }
}

/// A unit of work owned by the pool once submitted.
///
/// The pool calls [`run`](PoolTask::run) exactly once; the task is
/// consumed and dropped when it returns. There is no return channel at
/// this layer.
pub trait PoolTask: Send {
    /// Scheduling hints for this task.
    fn attrs(&self) -> TaskAttributes {
        TaskAttributes::default()
    }

    /// Executes the task, consuming it.
    fn run(self: Box<Self>);
}

/// Adapts a closure into a [`PoolTask`].
pub struct TaskFn {
    attrs: TaskAttributes,
    work: Box<dyn FnOnce() + Send>,
}

impl TaskFn {
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        TaskFn {
            attrs: TaskAttributes::default(),
            work: Box::new(work),
        }
    }

    pub fn with_attrs<F>(work: F, attrs: TaskAttributes) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        TaskFn {
            attrs,
            work: Box::new(work),
        }
    }
}

impl PoolTask for TaskFn {
    fn attrs(&self) -> TaskAttributes {
        self.attrs
    }

    fn run(self: Box<Self>) {
        (self.work)();
    }
}

/// No-op sentinel enqueued during shutdown so every blocked worker wakes
/// and observes the finish flag.
pub(crate) struct ShutdownTask;

impl PoolTask for ShutdownTask {
    fn run(self: Box<Self>) {}
}
