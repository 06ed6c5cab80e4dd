//! Fair condition variable with signal accumulation.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::backoff::BackoffWaiter;
use crate::lock::RawLock;
use crate::mutex::Mutex;

/// Upper bound on simultaneous waiters.
pub const MAX_WAITERS: usize = 64;

/// `front` names the oldest waiter, `back` the next free slot;
/// `front == back` means nobody waits.
struct SignalQueue {
    /// Signals issued with no waiter around to consume them.
    nsig: usize,
    front: usize,
    back: usize,
    slots: [*const AtomicBool; MAX_WAITERS],
}

/// Condition variable that wakes waiters in enqueue order and banks
/// signals issued while nobody waits.
///
/// Unlike a POSIX condition variable, a signal with no waiter present is
/// not lost: it accumulates and is consumed by the next [`wait`]. A wakeup
/// can therefore never be missed inside one critical section of the
/// embedded mutex, and no predicate re-check loop is needed.
///
/// The embedded mutex is exposed through [`RawLock`], so a
/// [`ScopedGuard`](crate::ScopedGuard) can hold it; callers must hold it
/// across [`wait`] and [`signal`].
///
/// Waiters park on a flag on their own stack, spinning locally through a
/// [`BackoffWaiter`] rather than generating shared-memory traffic.
///
/// [`wait`]: ConditionVariable::wait
/// [`signal`]: ConditionVariable::signal
pub struct ConditionVariable {
    mutex: Mutex,
    q: UnsafeCell<SignalQueue>,
}

unsafe impl Send for ConditionVariable {}
unsafe impl Sync for ConditionVariable {}

impl ConditionVariable {
    pub fn new() -> Self {
        ConditionVariable {
            mutex: Mutex::new(),
            q: UnsafeCell::new(SignalQueue {
                nsig: 0,
                front: 0,
                back: 0,
                slots: [ptr::null(); MAX_WAITERS],
            }),
        }
    }

    /// Wakes queued waiters while banked signals remain, oldest first.
    fn drain(q: &mut SignalQueue) {
        while q.nsig > 0 && q.front != q.back {
            q.nsig -= 1;
            let flag = q.slots[q.front];
            q.slots[q.front] = ptr::null();
            q.front = (q.front + 1) % MAX_WAITERS;
            // SAFETY: the waiter spins on its stack flag until this store
            // lands, so the pointee is still alive.
            unsafe { (*flag).store(true, Ordering::Release) };
        }
    }

    /// Blocks until a signal is available, consuming it.
    ///
    /// The embedded mutex must be held on entry; it is released while
    /// waiting and reacquired before returning.
    pub fn wait(&self) {
        // SAFETY: the caller holds the embedded mutex, so the queue is not
        // concurrently mutated; each borrow ends before the lock is
        // released below.
        let consumed = {
            let q = unsafe { &mut *self.q.get() };
            if q.nsig > 0 {
                q.nsig -= 1;
                true
            } else {
                false
            }
        };

        if !consumed {
            let myturn = AtomicBool::new(false);
            {
                let q = unsafe { &mut *self.q.get() };
                let next_back = (q.back + 1) % MAX_WAITERS;
                if next_back == q.front {
                    // The embedded mutex is still held; a guard further up
                    // the stack releases it during unwinding.
                    panic!("condition variable: waiter capacity exceeded");
                }
                q.slots[q.back] = &myturn;
                q.back = next_back;
            }
            self.mutex.unlock();
            let mut waiter = BackoffWaiter::new();
            while !myturn.load(Ordering::Acquire) {
                waiter.wait();
            }
            self.mutex.lock();
        }

        // Cascade signals that arrived while this thread was queued.
        let q = unsafe { &mut *self.q.get() };
        Self::drain(q);
    }

    /// Wakes the oldest waiter, or banks the signal when nobody waits.
    ///
    /// The embedded mutex must be held.
    pub fn signal(&self) {
        // SAFETY: the caller holds the embedded mutex.
        let q = unsafe { &mut *self.q.get() };
        q.nsig += 1;
        Self::drain(q);
    }
}

impl RawLock for ConditionVariable {
    fn lock(&self) {
        self.mutex.lock();
    }

    fn unlock(&self) {
        self.mutex.unlock();
    }

    fn try_lock(&self) -> bool {
        self.mutex.try_lock()
    }
}

impl Default for ConditionVariable {
    fn default() -> Self {
        ConditionVariable::new()
    }
}
