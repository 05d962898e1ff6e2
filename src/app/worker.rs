//! Deferred hardware update.
//!
//! The only context that touches the [`HapticPort`].  Callers and the
//! deadline timer never write hardware themselves; they flip the desired
//! state under the state lock and [`schedule`](WorkQueue::schedule) an
//! update.  The worker task then reads the *current* desired state and
//! pushes it out.
//!
//! ```text
//!  request_activation ─┐
//!                      ├─▶ WorkQueue (one pending slot) ─▶ worker ─▶ HapticPort
//!  deadline expiry ────┘
//! ```
//!
//! The queue is an `embassy-sync` [`Signal`]: signalling an already
//! signalled queue is a no-op, so any burst of requests before the worker
//! wakes collapses into one update.  A request that lands while an update
//! is running re-signals and is picked up by the next run.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future::block_on;
use log::debug;

use crate::config::PulseSettings;
use crate::error::ActuatorError;

use super::ports::HapticPort;
use super::service::Shared;

// ───────────────────────────────────────────────────────────────
// Work queue
// ───────────────────────────────────────────────────────────────

/// Single-slot, coalescing hand-off to the worker task.
pub(crate) struct WorkQueue {
    pending: Signal<CriticalSectionRawMutex, ()>,
    stopping: AtomicBool,
}

impl WorkQueue {
    pub(crate) const fn new() -> Self {
        Self {
            pending: Signal::new(),
            stopping: AtomicBool::new(false),
        }
    }

    /// Ask for one hardware update.  Merges into an update that is
    /// already pending.
    pub(crate) fn schedule(&self) {
        self.pending.signal(());
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.signaled()
    }

    /// Consume the pending update without blocking.
    #[cfg(test)]
    pub(crate) fn take(&self) -> bool {
        self.pending.try_take().is_some()
    }

    /// Block until an update is pending.  Returns `false` once the queue
    /// is stopping.
    pub(crate) fn wait(&self) -> bool {
        block_on(self.pending.wait());
        !self.stopping.load(Ordering::Acquire)
    }

    /// Wake the worker for the last time.  A pending update is dropped.
    pub(crate) fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
        self.pending.signal(());
    }
}

// ───────────────────────────────────────────────────────────────
// Hardware update
// ───────────────────────────────────────────────────────────────

/// Drive the port to `on` with the given pulse settings.
///
/// On: configure the pulse, start it, then raise the enable line.
/// Off: drop the enable line, then stop the pulse.  No hidden toggling:
/// the same inputs always produce the same call sequence.
pub fn drive<P: HapticPort + ?Sized>(
    port: &mut P,
    on: bool,
    pulse: PulseSettings,
) -> Result<(), ActuatorError> {
    if on {
        port.configure_pulse(pulse.period_ns(), pulse.high_time_ns())?;
        port.enable_pulse()?;
        port.set_enable_line(true);
    } else {
        port.set_enable_line(false);
        port.disable_pulse();
    }
    Ok(())
}

/// Worker task body.  Hands the port back when the queue stops.
pub(crate) fn run<P: HapticPort>(shared: &Shared, mut port: P) -> P {
    debug!("vibrator worker: running");
    while shared.work.wait() {
        shared.update_hardware(&mut port);
    }
    debug!("vibrator worker: stopped");
    port
}
