//! Adaptive waiting for busy loops.

use std::hint;
use std::thread;
use std::time::Duration;

/// Calls spent busy-spinning before the first sleep; roughly 10 ms of
/// polling at 1 GHz.
const SPIN_CALLS: u32 = 10_000_000;
/// Calls spent napping 1 ms before escalating to the long sleep, so a
/// moderately contended wait burns between one and ten seconds here.
const NAP_CALLS: u32 = 1_000;

const NAP: Duration = Duration::from_millis(1);
const SLEEP: Duration = Duration::from_millis(10);

/// Tiered spin / nap / sleep strategy for throttling a spin loop.
///
/// Call [`wait`](BackoffWaiter::wait) on every failed poll. The first
/// `SPIN_CALLS` invocations spin without touching the kernel; the next
/// `NAP_CALLS` sleep 1 ms each; every invocation after that sleeps 10 ms.
/// Yielding to the scheduler is deliberately avoided: its resume time is
/// undefined and it keeps the CPU spinning in the kernel.
pub struct BackoffWaiter {
    count: u32,
}

impl BackoffWaiter {
    pub fn new() -> Self {
        BackoffWaiter { count: 0 }
    }

    /// Starts the strategy over from the spin tier.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// One wait step at the current tier.
    pub fn wait(&mut self) {
        self.count = self.count.saturating_add(1);
        if self.count < SPIN_CALLS {
            for _ in 0..100 {
                hint::spin_loop();
            }
        } else if self.count < SPIN_CALLS + NAP_CALLS {
            thread::sleep(NAP);
        } else {
            thread::sleep(SLEEP);
        }
    }
}

impl Default for BackoffWaiter {
    fn default() -> Self {
        BackoffWaiter::new()
    }
}
