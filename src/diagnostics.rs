//! Runtime counters for the vibrator controller.
//!
//! Bumped from the worker and timer contexts with relaxed atomics; read
//! back as a [`Stats`] snapshot.  Counters only ever grow.

use core::sync::atomic::{AtomicU32, Ordering};

/// Point-in-time copy of the controller counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Deferred hardware updates that ran to completion.
    pub updates_run: u32,
    /// Updates that ended in a hardware write failure.
    pub write_failures: u32,
    /// Deadlines that expired and turned the motor off.
    pub expiries: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    updates_run: AtomicU32,
    write_failures: AtomicU32,
    expiries: AtomicU32,
}

impl Counters {
    pub(crate) fn record_update(&self, failed: bool) {
        self.updates_run.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_expiry(&self) {
        self.expiries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            updates_run: self.updates_run.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            expiries: self.expiries.load(Ordering::Relaxed),
        }
    }
}
