//! Reader/writer mutual exclusion with lock-mode conversion.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::backoff::BackoffWaiter;
use crate::lock::ScopedGuard;
use crate::mutex::Spinlock;

/// The mode a caller holds a [`ReaderWriterMutex`] in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    NoLock,
    Read,
    Write,
}

/// Many readers or one writer.
///
/// Writers get no precedence: a steady stream of readers can starve a
/// writer indefinitely. Use [`FairMutex`](crate::FairMutex) when arrival
/// order matters.
///
/// The `{nreaders, writer}` pair is only mutated under the internal
/// spinlock, whose acquire/release pair also publishes the transition.
pub struct ReaderWriterMutex {
    guard: Spinlock,
    nreaders: AtomicUsize,
    writer: AtomicBool,
}

impl ReaderWriterMutex {
    pub const fn new() -> Self {
        ReaderWriterMutex {
            guard: Spinlock::new(),
            nreaders: AtomicUsize::new(0),
            writer: AtomicBool::new(false),
        }
    }

    /// Takes a read lock unless a writer holds the lock.
    pub fn try_read_lock(&self) -> bool {
        let _protect = ScopedGuard::new(&self.guard);
        if self.writer.load(Ordering::Relaxed) {
            return false;
        }
        self.nreaders.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Takes the write lock when there is no writer and no reader.
    pub fn try_write_lock(&self) -> bool {
        let _protect = ScopedGuard::new(&self.guard);
        if self.writer.load(Ordering::Relaxed) || self.nreaders.load(Ordering::Relaxed) != 0 {
            return false;
        }
        self.writer.store(true, Ordering::Relaxed);
        true
    }

    pub fn try_lock(&self, mode: LockMode) -> bool {
        match mode {
            LockMode::Read => self.try_read_lock(),
            LockMode::Write => self.try_write_lock(),
            LockMode::NoLock => true,
        }
    }

    pub fn read_lock(&self) {
        let mut waiter = BackoffWaiter::new();
        while !self.try_read_lock() {
            waiter.wait();
        }
    }

    pub fn write_lock(&self) {
        let mut waiter = BackoffWaiter::new();
        while !self.try_write_lock() {
            waiter.wait();
        }
    }

    pub fn lock(&self, mode: LockMode) {
        let mut waiter = BackoffWaiter::new();
        while !self.try_lock(mode) {
            waiter.wait();
        }
    }

    pub fn read_unlock(&self) {
        let _protect = ScopedGuard::new(&self.guard);
        let readers = self.nreaders.load(Ordering::Relaxed);
        if readers == 0 {
            panic!("reader/writer mutex: read_unlock without a read lock");
        }
        self.nreaders.store(readers - 1, Ordering::Relaxed);
    }

    pub fn write_unlock(&self) {
        let _protect = ScopedGuard::new(&self.guard);
        if !self.writer.load(Ordering::Relaxed) {
            panic!("reader/writer mutex: write_unlock without the write lock");
        }
        self.writer.store(false, Ordering::Relaxed);
    }

    pub fn unlock(&self, mode: LockMode) {
        match mode {
            LockMode::Read => self.read_unlock(),
            LockMode::Write => self.write_unlock(),
            LockMode::NoLock => {}
        }
    }

    /// Upgrades atomically when the caller is the sole reader.
    pub fn try_convert_read_to_write(&self) -> bool {
        let _protect = ScopedGuard::new(&self.guard);
        if self.writer.load(Ordering::Relaxed) || self.nreaders.load(Ordering::Relaxed) != 1 {
            return false;
        }
        self.nreaders.store(0, Ordering::Relaxed);
        self.writer.store(true, Ordering::Relaxed);
        true
    }

    /// Upgrades a read lock to the write lock without releasing it.
    ///
    /// Deadlock is guaranteed if two or more readers wait to convert at the
    /// same time; the caller must ensure at most one converter.
    pub fn convert_read_to_write(&self) {
        let mut waiter = BackoffWaiter::new();
        while !self.try_convert_read_to_write() {
            waiter.wait();
        }
    }

    /// Downgrades the write lock to a read lock. Never blocks.
    pub fn convert_write_to_read(&self) {
        let _protect = ScopedGuard::new(&self.guard);
        debug_assert!(
            self.writer.load(Ordering::Relaxed),
            "reader/writer mutex: convert_write_to_read without the write lock"
        );
        self.nreaders.fetch_add(1, Ordering::Relaxed);
        self.writer.store(false, Ordering::Relaxed);
    }
}

impl Default for ReaderWriterMutex {
    fn default() -> Self {
        ReaderWriterMutex::new()
    }
}
