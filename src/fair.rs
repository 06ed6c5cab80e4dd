//! FIFO ("fair") mutual exclusion.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::CachePadded;

use crate::backoff::BackoffWaiter;
use crate::lock::RawLock;
use crate::mutex::Mutex;

/// Upper bound on simultaneous holders plus waiters.
pub const MAX_WAITERS: usize = 64;

/// Circular buffer of pointers to waiter flags. `front` names the next
/// waiter to wake, `back` the next free slot; `front == back` means nobody
/// is queued, so at most `MAX_WAITERS - 1` waiters can be pending.
struct WaitRing {
    /// Holder count plus pending waiters.
    n: usize,
    front: usize,
    back: usize,
    slots: [*const AtomicBool; MAX_WAITERS],
}

/// Mutex granting acquisition strictly in arrival order.
///
/// Each waiter appends a pointer to a flag on its own stack and spins on
/// that flag, so a waiting thread generates no shared-memory traffic until
/// its predecessor wakes it. The internal basic mutex only protects the
/// waiter ring; it is never held while waiting.
pub struct FairMutex {
    gate: Mutex,
    ring: CachePadded<UnsafeCell<WaitRing>>,
}

unsafe impl Send for FairMutex {}
unsafe impl Sync for FairMutex {}

impl FairMutex {
    pub fn new() -> Self {
        FairMutex {
            gate: Mutex::new(),
            ring: CachePadded::new(UnsafeCell::new(WaitRing {
                n: 0,
                front: 0,
                back: 0,
                slots: [ptr::null(); MAX_WAITERS],
            })),
        }
    }
}

impl RawLock for FairMutex {
    fn lock(&self) {
        let myturn = AtomicBool::new(false);
        let mut mine = false;

        self.gate.lock();
        // SAFETY: the ring is only touched while `gate` is held.
        let ring = unsafe { &mut *self.ring.get() };
        if ring.n >= MAX_WAITERS {
            self.gate.unlock();
            panic!("fair mutex: waiter capacity exceeded");
        }
        ring.n += 1;
        if ring.n == 1 {
            if ring.front != ring.back {
                self.gate.unlock();
                panic!("fair mutex: waiter ring not empty while the lock is free");
            }
            mine = true;
        } else {
            ring.slots[ring.back] = &myturn;
            ring.back = (ring.back + 1) % MAX_WAITERS;
        }
        self.gate.unlock();

        if !mine {
            let mut waiter = BackoffWaiter::new();
            while !myturn.load(Ordering::Acquire) {
                waiter.wait();
            }
        }
    }

    fn unlock(&self) {
        let mut next: *const AtomicBool = ptr::null();

        self.gate.lock();
        // SAFETY: the ring is only touched while `gate` is held.
        let ring = unsafe { &mut *self.ring.get() };
        if ring.n == 0 {
            self.gate.unlock();
            panic!("fair mutex: unlock without holding the lock");
        }
        ring.n -= 1;
        if ring.n > 0 {
            next = ring.slots[ring.front];
            ring.slots[ring.front] = ptr::null();
            ring.front = (ring.front + 1) % MAX_WAITERS;
        } else if ring.front != ring.back {
            self.gate.unlock();
            panic!("fair mutex: waiter ring not empty after the last release");
        }
        self.gate.unlock();

        if !next.is_null() {
            // SAFETY: the flag lives on the successor's stack, and the
            // successor cannot return from `lock` before this store.
            unsafe { (*next).store(true, Ordering::Release) };
        }
    }

    /// Spinning outside a fair lock makes little sense, but the contract
    /// requires it: succeeds only when nobody holds or awaits the lock.
    fn try_lock(&self) -> bool {
        self.gate.lock();
        // SAFETY: the ring is only touched while `gate` is held.
        let ring = unsafe { &mut *self.ring.get() };
        let got = ring.n == 0;
        if got {
            ring.n = 1;
        }
        self.gate.unlock();
        got
    }
}

impl Default for FairMutex {
    fn default() -> Self {
        FairMutex::new()
    }
}
