//! Vibrator controller — the core of the driver.
//!
//! [`Vibrator`] owns the activation state, the deadline timer and the
//! deferred worker that holds the [`HapticPort`].  Three contexts meet here:
//!
//! ```text
//!  callers ──request_activation──┐
//!                                ├──▶ state lock ──▶ WorkQueue ──▶ worker ──▶ HapticPort
//!  deadline timer ──on_deadline──┘
//! ```
//!
//! The state lock is held across "cancel timer, update state, re-arm
//! timer" and never across hardware I/O.  The worker snapshots the desired
//! state under the lock when it runs, so the hardware always converges to
//! the latest request.

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use log::{debug, error, info};

use crate::config::{
    clamp_duty_percent, clamp_frequency_hz, HardwareDescription, PulseSettings, VibratorConfig,
};
use crate::diagnostics::{Counters, Stats};
use crate::drivers::deadline_timer::DeadlineTimer;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::{Error, Result};
use crate::sync::lock;

use super::ports::HapticPort;
use super::state::{ActuatorState, Phase};
use super::worker::{self, WorkQueue};

const WORKER_TASK_PRIORITY: u8 = 5;
const WORKER_TASK_STACK_KB: usize = 16;

/// Worker task body; yields the port back when the worker stops.
type WorkerBody<P> = Box<dyn FnOnce() -> Option<P> + Send>;

// ───────────────────────────────────────────────────────────────
// Shared record
// ───────────────────────────────────────────────────────────────

/// State reachable from the caller, timer and worker contexts.
pub(crate) struct Shared {
    state: Mutex<ActuatorState>,
    frequency_hz: AtomicU32,
    duty_percent: AtomicU8,
    max_timeout_ms: u32,
    pub(crate) work: WorkQueue,
    counters: Counters,
}

impl Shared {
    fn new(config: VibratorConfig) -> Self {
        Self {
            state: Mutex::new(ActuatorState::new()),
            frequency_hz: AtomicU32::new(config.pwm_frequency_hz),
            duty_percent: AtomicU8::new(config.duty_percent),
            max_timeout_ms: config.max_timeout_ms,
            work: WorkQueue::new(),
            counters: Counters::default(),
        }
    }

    fn pulse(&self) -> PulseSettings {
        PulseSettings {
            frequency_hz: self.frequency_hz.load(Ordering::Relaxed),
            duty_percent: self.duty_percent.load(Ordering::Relaxed),
        }
    }

    /// Deadline timer callback.
    fn on_deadline(&self, token: u64) {
        let expired = lock(&self.state).expire(token);
        if expired {
            debug!("vibrator: deadline {} expired, switching off", token);
            self.counters.record_expiry();
            self.work.schedule();
        } else {
            debug!("vibrator: stale deadline {} ignored", token);
        }
    }

    /// One deferred hardware update: snapshot, release the lock, write.
    pub(crate) fn update_hardware<P: HapticPort + ?Sized>(&self, port: &mut P) {
        let on = lock(&self.state).desired_on();
        let result = worker::drive(port, on, self.pulse());
        if let Err(e) = result {
            error!("vibrator: {}", Error::from(e));
        }
        self.counters.record_update(result.is_err());
    }
}

// ───────────────────────────────────────────────────────────────
// Vibrator
// ───────────────────────────────────────────────────────────────

/// A timed haptic vibrator bound to one hardware port.
pub struct Vibrator<P: HapticPort + 'static> {
    shared: Arc<Shared>,
    timer: DeadlineTimer,
    worker: Option<JoinHandle<Option<P>>>,
}

impl<P: HapticPort + 'static> Vibrator<P> {
    // ── Lifecycle ─────────────────────────────────────────────

    /// Reserve the hardware and start the timer and worker tasks.
    ///
    /// The motor starts off.  Frequency and duty in `config` are clamped.
    pub fn attach(desc: &HardwareDescription, config: VibratorConfig, port: P) -> Result<Self> {
        Self::attach_with(desc, config, port, |body| {
            spawn_on_core(
                Core::App,
                WORKER_TASK_PRIORITY,
                WORKER_TASK_STACK_KB,
                "vib-work\0",
                body,
            )
        })
    }

    fn attach_with(
        desc: &HardwareDescription,
        config: VibratorConfig,
        mut port: P,
        spawn: impl FnOnce(WorkerBody<P>) -> Result<JoinHandle<Option<P>>>,
    ) -> Result<Self> {
        if let Err(e) = desc.validate().and_then(|()| port.claim(desc)) {
            error!("vibrator: attach failed: {}", e);
            return Err(e);
        }

        let mut vib = match Self::assemble(config) {
            Ok(v) => v,
            Err(e) => {
                error!("vibrator: attach failed: {}", e);
                port.release();
                return Err(e);
            }
        };

        // The port reaches the worker through a slot so that a failed
        // spawn leaves it here to be released.
        let handoff = Arc::new(Mutex::new(Some(port)));
        let body: WorkerBody<P> = {
            let shared = Arc::clone(&vib.shared);
            let handoff = Arc::clone(&handoff);
            Box::new(move || {
                let port = lock(&handoff).take()?;
                Some(worker::run(&shared, port))
            })
        };
        match spawn(body) {
            Ok(handle) => vib.worker = Some(handle),
            Err(e) => {
                error!("vibrator: attach failed: {}", e);
                if let Some(mut port) = lock(&handoff).take() {
                    port.release();
                }
                return Err(e);
            }
        }

        let pulse = vib.shared.pulse();
        info!(
            "vibrator: attached (en={}, rail={}, pwm-ch={}, max={}ms, {}Hz/{}%)",
            desc.motor_enable_gpio,
            desc.haptic_rail_gpio,
            desc.pwm_channel,
            vib.shared.max_timeout_ms,
            pulse.frequency_hz,
            pulse.duty_percent,
        );
        Ok(vib)
    }

    /// Controller without a worker task.  `attach` adds the worker.
    fn assemble(config: VibratorConfig) -> Result<Self> {
        let shared = Arc::new(Shared::new(config.clamped()));
        let timer = {
            let shared = Arc::clone(&shared);
            DeadlineTimer::start("vib-timer\0", move |token| shared.on_deadline(token))?
        };
        Ok(Self {
            shared,
            timer,
            worker: None,
        })
    }

    /// Stop everything, force the motor off and release the hardware.
    ///
    /// Returns the released port.
    pub fn teardown(mut self) -> Result<P> {
        self.shutdown()?.ok_or(Error::Task("hardware worker already stopped"))
    }

    fn shutdown(&mut self) -> Result<Option<P>> {
        {
            let mut state = lock(&self.shared.state);
            self.timer.cancel();
            state.request(Instant::now(), 0);
        }
        self.timer.shutdown();
        self.shared.work.stop();

        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };
        let joined = worker.join().map_err(|_| Error::Task("hardware worker panicked"))?;
        let Some(mut port) = joined else {
            return Ok(None);
        };
        port.set_enable_line(false);
        port.disable_pulse();
        port.release();
        info!("vibrator: detached");
        Ok(Some(port))
    }

    // ── Activation ────────────────────────────────────────────

    /// Run the motor for `duration_ms`, or stop it when that is `0`.
    ///
    /// The duration is clamped to the maximum timeout.  A new request
    /// replaces the previous deadline.  The hardware follows
    /// asynchronously.
    pub fn request_activation(&self, duration_ms: u32) {
        let duration_ms = duration_ms.min(self.shared.max_timeout_ms);
        {
            let mut state = lock(&self.shared.state);
            self.timer.cancel();
            if let Some(arming) = state.request(Instant::now(), duration_ms) {
                self.timer.arm(arming.until, arming.token);
            }
        }
        self.shared.work.schedule();
    }

    /// Milliseconds until the motor switches off, rounded up; `0` when idle.
    pub fn remaining_ms(&self) -> u32 {
        let left = lock(&self.shared.state).remaining(Instant::now());
        u32::try_from(left.as_micros().div_ceil(1000)).unwrap_or(u32::MAX)
    }

    /// Microseconds until the motor switches off; `0` when idle.
    pub fn remaining_us(&self) -> u64 {
        let left = lock(&self.shared.state).remaining(Instant::now());
        u64::try_from(left.as_micros()).unwrap_or(u64::MAX)
    }

    pub fn phase(&self) -> Phase {
        lock(&self.shared.state).phase()
    }

    pub fn is_active(&self) -> bool {
        self.phase() == Phase::Active
    }

    // ── Tunables ──────────────────────────────────────────────

    /// Store a duty cycle, clamped to `[80, 100]`.  Returns the stored
    /// value.  Applies from the next hardware update.
    pub fn set_duty_percent(&self, value: i64) -> u8 {
        let duty = clamp_duty_percent(value);
        self.shared.duty_percent.store(duty, Ordering::Relaxed);
        debug!("vibrator: duty {}% (requested {})", duty, value);
        duty
    }

    pub fn duty_percent(&self) -> u8 {
        self.shared.duty_percent.load(Ordering::Relaxed)
    }

    /// Store a pulse frequency, clamped to `[10000, 50000]` Hz.  Returns
    /// the stored value.  Applies from the next hardware update.
    pub fn set_pwm_frequency_hz(&self, value: i64) -> u32 {
        let freq = clamp_frequency_hz(value);
        self.shared.frequency_hz.store(freq, Ordering::Relaxed);
        debug!("vibrator: pwm {}Hz (requested {})", freq, value);
        freq
    }

    pub fn pwm_frequency_hz(&self) -> u32 {
        self.shared.frequency_hz.load(Ordering::Relaxed)
    }

    pub fn max_timeout_ms(&self) -> u32 {
        self.shared.max_timeout_ms
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn stats(&self) -> Stats {
        self.shared.counters.snapshot()
    }
}

impl<P: HapticPort + 'static> Drop for Vibrator<P> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("vibrator: shutdown on drop failed: {}", e);
        }
    }
}
