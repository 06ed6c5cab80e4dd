//! Basic mutual exclusion: the kernel-backed [`Mutex`] and the user-space
//! [`Spinlock`].
//!
//! Both expose the same [`RawLock`] contract. The mutex parks waiters in
//! the kernel and can hand its native handle to a condition variable; the
//! spinlock never leaves user space and is the right choice only for
//! critical sections of a handful of instructions.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::CachePadded;

use crate::backoff::BackoffWaiter;
use crate::lock::RawLock;

#[cfg(not(feature = "spin-lock"))]
use std::cell::UnsafeCell;

#[cfg(not(feature = "spin-lock"))]
use crate::error::PoolError;

/// User-space test-and-test-and-set spinlock.
///
/// Waiters poll a cached copy of the lock word and escalate through a
/// [`BackoffWaiter`] once contention persists. There is no native handle
/// and no fairness guarantee.
pub struct Spinlock {
    locked: CachePadded<AtomicBool>,
}

impl Spinlock {
    pub const fn new() -> Self {
        Spinlock {
            locked: CachePadded::new(AtomicBool::new(false)),
        }
    }
}

impl RawLock for Spinlock {
    fn lock(&self) {
        let mut waiter = BackoffWaiter::new();
        loop {
            if self.try_lock() {
                return;
            }
            // Poll the shared word read-only until it looks free, then
            // retry the exchange.
            while self.locked.load(Ordering::Relaxed) {
                waiter.wait();
            }
        }
    }

    fn unlock(&self) {
        debug_assert!(
            self.locked.load(Ordering::Relaxed),
            "spinlock: unlock without holding the lock"
        );
        self.locked.store(false, Ordering::Release);
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for Spinlock {
    fn default() -> Self {
        Spinlock::new()
    }
}

/// Kernel-backed mutual exclusion.
///
/// Wraps a pthread mutex so waiters block instead of spinning, and so a
/// native condition variable can bind to [`native_handle`](Mutex::native_handle).
/// In debug builds the mutex is created error-checking, which turns an
/// unlock by a non-holder into a reported errno instead of undefined
/// behavior.
///
/// The `spin-lock` cargo feature swaps the backend for [`Spinlock`]; the
/// native handle is unavailable in that configuration.
#[cfg(not(feature = "spin-lock"))]
pub struct Mutex {
    inner: UnsafeCell<libc::pthread_mutex_t>,
}

#[cfg(not(feature = "spin-lock"))]
unsafe impl Send for Mutex {}
#[cfg(not(feature = "spin-lock"))]
unsafe impl Sync for Mutex {}

#[cfg(not(feature = "spin-lock"))]
impl Mutex {
    pub fn new() -> Self {
        let inner = UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER);
        if cfg!(debug_assertions) {
            // SAFETY: the mutex storage is freshly created and not yet
            // shared.
            unsafe {
                let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
                libc::pthread_mutexattr_init(&mut attr);
                libc::pthread_mutexattr_settype(&mut attr, libc::PTHREAD_MUTEX_ERRORCHECK);
                libc::pthread_mutex_init(inner.get(), &attr);
                libc::pthread_mutexattr_destroy(&mut attr);
            }
        }
        Mutex { inner }
    }

    /// Pointer to the underlying pthread mutex, for binding a native
    /// condition variable. Valid while `self` is not moved or dropped.
    pub fn native_handle(&self) -> *mut libc::pthread_mutex_t {
        self.inner.get()
    }
}

#[cfg(not(feature = "spin-lock"))]
impl RawLock for Mutex {
    fn lock(&self) {
        // SAFETY: the pointer targets this mutex's own storage.
        let rc = unsafe { libc::pthread_mutex_lock(self.inner.get()) };
        if rc != 0 {
            panic!(
                "{}",
                PoolError::Lock {
                    op: "pthread_mutex_lock",
                    errno: rc,
                }
            );
        }
    }

    fn unlock(&self) {
        // SAFETY: the pointer targets this mutex's own storage.
        let rc = unsafe { libc::pthread_mutex_unlock(self.inner.get()) };
        if rc != 0 {
            panic!(
                "{}",
                PoolError::Lock {
                    op: "pthread_mutex_unlock",
                    errno: rc,
                }
            );
        }
    }

    fn try_lock(&self) -> bool {
        // SAFETY: the pointer targets this mutex's own storage.
        unsafe { libc::pthread_mutex_trylock(self.inner.get()) == 0 }
    }
}

#[cfg(not(feature = "spin-lock"))]
impl Drop for Mutex {
    fn drop(&mut self) {
        // Best effort: destroying a locked mutex reports EBUSY and the
        // kernel object is leaked.
        unsafe { libc::pthread_mutex_destroy(self.inner.get()) };
    }
}

#[cfg(not(feature = "spin-lock"))]
impl Default for Mutex {
    fn default() -> Self {
        Mutex::new()
    }
}

/// User-space rendition of [`Mutex`] selected by the `spin-lock` feature.
#[cfg(feature = "spin-lock")]
pub struct Mutex {
    inner: Spinlock,
}

#[cfg(feature = "spin-lock")]
impl Mutex {
    pub const fn new() -> Self {
        Mutex {
            inner: Spinlock::new(),
        }
    }
}

#[cfg(feature = "spin-lock")]
impl RawLock for Mutex {
    fn lock(&self) {
        self.inner.lock();
    }

    fn unlock(&self) {
        self.inner.unlock();
    }

    fn try_lock(&self) -> bool {
        self.inner.try_lock()
    }
}

#[cfg(feature = "spin-lock")]
impl Default for Mutex {
    fn default() -> Self {
        Mutex::new()
    }
}

/// Attempts to acquire two locks without blocking while holding either.
///
/// `second` is only tried once `first` is held; on failure `first` is
/// released again before returning.
pub fn try_two_locks<A: RawLock, B: RawLock>(first: &A, second: &B) -> bool {
    if !first.try_lock() {
        return false;
    }
    if second.try_lock() {
        return true;
    }
    first.unlock();
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_spinlock_try_lock() {
        let lock = Spinlock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(lock.try_lock());
        lock.unlock();
    }

    #[test]
    fn test_mutex_try_lock() {
        let lock = Mutex::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        lock.unlock();
    }

    #[cfg(not(feature = "spin-lock"))]
    #[test]
    fn test_mutex_native_handle() {
        let lock = Mutex::new();
        assert!(!lock.native_handle().is_null());
    }

    #[test]
    fn test_mutual_exclusion() {
        const THREADS: usize = 8;
        const ITERS: usize = 10_000;

        let lock = Arc::new(Mutex::new());
        let value = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let lock = lock.clone();
                let value = value.clone();
                thread::spawn(move || {
                    for _ in 0..ITERS {
                        lock.lock();
                        // Unsynchronized-looking increment; the lock makes
                        // the load/store pair exclusive.
                        let v = value.load(Ordering::Relaxed);
                        value.store(v + 1, Ordering::Relaxed);
                        lock.unlock();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(value.load(Ordering::Relaxed), THREADS * ITERS);
    }

    #[test]
    fn test_try_two_locks() {
        let a = Spinlock::new();
        let b = Spinlock::new();

        assert!(try_two_locks(&a, &b));
        a.unlock();
        b.unlock();

        b.lock();
        assert!(!try_two_locks(&a, &b));
        // The first lock must have been released again.
        assert!(a.try_lock());
        a.unlock();
        b.unlock();
    }
}
