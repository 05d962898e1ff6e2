//! One-shot deadline timer.
//!
//! Sleeps until the armed instant and then invokes the expiry callback
//! with the token it was armed with.  Arming replaces any previous
//! deadline; cancelling clears it.  The timer never re-arms itself.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: an `esp_timer` one-shot with `ESP_TIMER_TASK` dispatch, so
//! the callback runs in the esp_timer task (not ISR).
//! On host/test: a dedicated thread waiting on a `Condvar`.
//!
//! On both targets the callback runs outside the timer's own lock, so it
//! may take other locks.  A callback that already left the wait when a
//! cancel or re-arm happens still runs: consumers tell stale expiries apart
//! by the token.  [`DeadlineTimer::shutdown`] waits for a callback in
//! progress.

use std::sync::{Arc, Condvar, Mutex};
#[cfg(not(target_os = "espidf"))]
use std::thread::JoinHandle;
use std::time::Instant;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys;
use log::{debug, warn};

#[cfg(not(target_os = "espidf"))]
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::Result;
#[cfg(not(target_os = "espidf"))]
use crate::sync::{wait, wait_timeout};
use crate::sync::lock;

#[cfg(not(target_os = "espidf"))]
const TIMER_TASK_PRIORITY: u8 = 10;
#[cfg(not(target_os = "espidf"))]
const TIMER_TASK_STACK_KB: usize = 16;

#[derive(Debug, Default)]
struct Slot {
    /// Deadline and token of the current arming.
    pending: Option<(Instant, u64)>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct TimerShared {
    slot: Mutex<Slot>,
    cv: Condvar,
}

/// Fire the pending arming if its deadline has passed.
///
/// A wake-up for an arming that was since replaced by a later deadline
/// finds `now < at` and does nothing.
fn fire(shared: &TimerShared, on_expiry: &dyn Fn(u64)) {
    let mut slot = lock(&shared.slot);
    match slot.pending {
        Some((at, token)) if Instant::now() >= at => {
            slot.pending = None;
            drop(slot);
            debug!("deadline timer: token {} expired", token);
            on_expiry(token);
        }
        _ => {}
    }
}

/// Handle to a running one-shot timer.
pub struct DeadlineTimer {
    shared: Arc<TimerShared>,
    #[cfg(not(target_os = "espidf"))]
    task: Option<JoinHandle<()>>,
    #[cfg(target_os = "espidf")]
    hw: Option<esp::HwTimer>,
}

impl DeadlineTimer {
    /// Start the timer.  `name` must be null-terminated.
    pub fn start(
        name: &'static str,
        on_expiry: impl Fn(u64) + Send + Sync + 'static,
    ) -> Result<Self> {
        let shared = Arc::new(TimerShared::default());

        #[cfg(not(target_os = "espidf"))]
        let timer = {
            let task_shared = Arc::clone(&shared);
            let task = spawn_on_core(
                Core::App,
                TIMER_TASK_PRIORITY,
                TIMER_TASK_STACK_KB,
                name,
                move || run(&task_shared, &on_expiry),
            )?;
            Self {
                shared,
                task: Some(task),
            }
        };

        #[cfg(target_os = "espidf")]
        let timer = {
            let hw = esp::HwTimer::create(name, Arc::clone(&shared), Box::new(on_expiry))?;
            Self {
                shared,
                hw: Some(hw),
            }
        };

        Ok(timer)
    }

    /// Arm for `at`, replacing any pending deadline.
    pub fn arm(&self, at: Instant, token: u64) {
        let mut slot = lock(&self.shared.slot);
        if slot.shutdown {
            warn!("deadline timer: arm after shutdown ignored");
            return;
        }
        slot.pending = Some((at, token));
        self.shared.cv.notify_all();

        #[cfg(target_os = "espidf")]
        if let Some(hw) = &self.hw {
            hw.start_once(at);
        }
    }

    /// Drop the pending deadline, if any.
    pub fn cancel(&self) {
        let mut slot = lock(&self.shared.slot);
        if slot.pending.take().is_some() {
            self.shared.cv.notify_all();

            #[cfg(target_os = "espidf")]
            if let Some(hw) = &self.hw {
                hw.stop();
            }
        }
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        lock(&self.shared.slot).pending.is_some()
    }

    /// Cancel, stop the timer and wait for any running callback.
    pub fn shutdown(&mut self) {
        {
            let mut slot = lock(&self.shared.slot);
            slot.pending = None;
            slot.shutdown = true;
            self.shared.cv.notify_all();
        }

        #[cfg(not(target_os = "espidf"))]
        if let Some(task) = self.task.take() {
            if task.join().is_err() {
                warn!("deadline timer: task panicked");
            }
        }

        #[cfg(target_os = "espidf")]
        if let Some(hw) = self.hw.take() {
            hw.delete();
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Host timer thread ─────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn run(shared: &TimerShared, on_expiry: &dyn Fn(u64)) {
    let mut slot = lock(&shared.slot);
    loop {
        if slot.shutdown {
            break;
        }
        match slot.pending {
            None => slot = wait(&shared.cv, slot),
            Some((at, _)) => {
                let now = Instant::now();
                if now < at {
                    slot = wait_timeout(&shared.cv, slot, at - now);
                    continue;
                }
                drop(slot);
                fire(shared, on_expiry);
                slot = lock(&shared.slot);
            }
        }
    }
}

// ── ESP-IDF esp_timer ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use log::{error, info, warn};

    use super::{fire, sys, TimerShared};
    use crate::error::{Error, Result};

    /// How long `delete` waits for the esp_timer task to drain.
    const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

    type Expiry = Box<dyn Fn(u64) + Send + Sync>;

    /// Context handed to the esp_timer callback.
    struct Dispatch {
        shared: Arc<TimerShared>,
        on_expiry: Expiry,
    }

    /// Owned `esp_timer` handle plus the callback context it points at.
    pub(super) struct HwTimer {
        handle: sys::esp_timer_handle_t,
        ctx: *const Dispatch,
    }

    // SAFETY: the handle is only passed to the thread-safe esp_timer API;
    // `ctx` points at a `Dispatch`, which is `Send + Sync`.
    unsafe impl Send for HwTimer {}
    unsafe impl Sync for HwTimer {}

    unsafe extern "C" fn deadline_cb(arg: *mut core::ffi::c_void) {
        // SAFETY: `arg` is the `ctx` of a live `HwTimer`; `delete` drains
        // the esp_timer task before releasing it.
        let ctx = unsafe { &*(arg as *const Dispatch) };
        fire(&ctx.shared, &*ctx.on_expiry);
    }

    unsafe extern "C" fn drain_cb(arg: *mut core::ffi::c_void) {
        // SAFETY: `arg` came from `Box::into_raw` in `drain_timer_task` and
        // this one-shot fires once.
        let done = unsafe { Box::from_raw(arg as *mut mpsc::SyncSender<()>) };
        let _ = done.send(());
    }

    impl HwTimer {
        pub(super) fn create(
            name: &'static str,
            shared: Arc<TimerShared>,
            on_expiry: Expiry,
        ) -> Result<Self> {
            let ctx = Arc::into_raw(Arc::new(Dispatch { shared, on_expiry }));
            let args = sys::esp_timer_create_args_t {
                callback: Some(deadline_cb),
                arg: ctx as *mut _,
                dispatch_method: sys::esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: name.as_ptr() as *const _,
                skip_unhandled_events: false,
            };
            let mut handle: sys::esp_timer_handle_t = core::ptr::null_mut();
            // SAFETY: `args` and `handle` outlive the call; `ctx` stays
            // valid until `delete`.
            let ret = unsafe { sys::esp_timer_create(&args, &mut handle) };
            if ret != sys::ESP_OK as i32 {
                error!("deadline timer: create failed (rc={})", ret);
                // SAFETY: the timer was not created, nothing else holds ctx.
                drop(unsafe { Arc::from_raw(ctx) });
                return Err(Error::Task("esp_timer create failed"));
            }
            info!("deadline timer: '{}' on esp_timer task", name.trim_end_matches('\0'));
            Ok(Self { handle, ctx })
        }

        pub(super) fn start_once(&self, at: Instant) {
            let delay_us = at.saturating_duration_since(Instant::now()).as_micros();
            // SAFETY: `handle` is valid until `delete`.  Stopping an idle
            // timer returns ESP_ERR_INVALID_STATE, which is fine here.
            let ret = unsafe {
                sys::esp_timer_stop(self.handle);
                sys::esp_timer_start_once(self.handle, u64::try_from(delay_us).unwrap_or(u64::MAX))
            };
            if ret != sys::ESP_OK as i32 {
                warn!("deadline timer: start failed (rc={})", ret);
            }
        }

        pub(super) fn stop(&self) {
            // SAFETY: see start_once().
            unsafe {
                sys::esp_timer_stop(self.handle);
            }
        }

        pub(super) fn delete(self) {
            // SAFETY: no further starts happen once the slot is shut down.
            unsafe {
                sys::esp_timer_stop(self.handle);
                sys::esp_timer_delete(self.handle);
            }
            if drain_timer_task() {
                // SAFETY: the timer is deleted and the esp_timer task has run
                // past any callback that was holding `ctx`.
                drop(unsafe { Arc::from_raw(self.ctx) });
            } else {
                warn!("deadline timer: esp_timer task did not drain, context kept");
            }
        }
    }

    /// Wait until the esp_timer task has finished every callback already
    /// dispatched.  Callbacks on that task run one after another, so a
    /// zero-delay one-shot queued now runs after them.
    fn drain_timer_task() -> bool {
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        let arg = Box::into_raw(Box::new(tx));
        let args = sys::esp_timer_create_args_t {
            callback: Some(drain_cb),
            arg: arg as *mut _,
            dispatch_method: sys::esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"vib-drain\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let mut handle: sys::esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: `args` outlives the calls; `arg` is reclaimed by drain_cb
        // or below when the timer never starts.
        unsafe {
            if sys::esp_timer_create(&args, &mut handle) != sys::ESP_OK as i32 {
                drop(Box::from_raw(arg));
                return false;
            }
            if sys::esp_timer_start_once(handle, 0) != sys::ESP_OK as i32 {
                sys::esp_timer_delete(handle);
                drop(Box::from_raw(arg));
                return false;
            }
        }
        let drained = rx.recv_timeout(DRAIN_TIMEOUT).is_ok();
        if drained {
            // SAFETY: the one-shot has fired and is no longer running.
            unsafe {
                sys::esp_timer_delete(handle);
            }
        }
        drained
    }
}
