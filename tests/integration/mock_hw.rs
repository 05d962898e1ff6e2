//! Mock haptic port for integration tests.
//!
//! Records every port call into a shared log so tests can assert on the
//! full hardware history after the port has moved into the worker task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use isa1000::error::{ActuatorError, Error, Resource, Result};
use isa1000::{HapticPort, HardwareDescription};

// ── Port call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwCall {
    Claim,
    Configure { period_ns: u32, high_ns: u32 },
    EnablePulse,
    DisablePulse,
    EnableLine(bool),
    Release,
}

/// Handle kept by the test while the port lives in the worker.
#[derive(Clone, Default)]
pub struct HwLog {
    calls: Arc<Mutex<Vec<HwCall>>>,
    fail_configure: Arc<AtomicBool>,
    gate: Arc<WriteGate>,
}

/// Holds `configure_pulse` inside the port while a test inspects or
/// races the controller.  `(held, entered)`.
#[derive(Default)]
struct WriteGate {
    state: Mutex<(bool, bool)>,
    cv: Condvar,
}

#[allow(dead_code)]
impl HwLog {
    pub fn calls(&self) -> Vec<HwCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Level of the enable line after the last write, `false` if never written.
    pub fn line(&self) -> bool {
        self.calls()
            .iter()
            .rev()
            .find_map(|c| match c {
                HwCall::EnableLine(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn configures(&self) -> Vec<(u32, u32)> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                HwCall::Configure { period_ns, high_ns } => Some((*period_ns, *high_ns)),
                _ => None,
            })
            .collect()
    }

    pub fn set_fail_configure(&self, fail: bool) {
        self.fail_configure.store(fail, Ordering::SeqCst);
    }

    /// Block the next pulse writes inside the port until `release_writes`.
    pub fn hold_writes(&self) {
        let mut st = self.gate.state.lock().unwrap();
        *st = (true, false);
    }

    pub fn release_writes(&self) {
        self.gate.state.lock().unwrap().0 = false;
        self.gate.cv.notify_all();
    }

    /// Wait until a write has reached the held gate.
    pub fn wait_entered(&self, timeout: Duration) -> bool {
        let st = self.gate.state.lock().unwrap();
        let (st, _) = self
            .gate
            .cv
            .wait_timeout_while(st, timeout, |(_, entered)| !*entered)
            .unwrap();
        st.1
    }

    /// Poll until `cond` holds on the call log or `timeout` passes.
    pub fn wait_for(&self, timeout: Duration, cond: impl Fn(&[HwCall]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if cond(&self.calls()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

// ── MockPort ──────────────────────────────────────────────────

pub struct MockPort {
    log: HwLog,
    refuse: Option<Resource>,
}

#[allow(dead_code)]
impl MockPort {
    pub fn new() -> (Self, HwLog) {
        let log = HwLog::default();
        (
            Self {
                log: log.clone(),
                refuse: None,
            },
            log,
        )
    }

    pub fn refusing(resource: Resource) -> (Self, HwLog) {
        let (mut port, log) = Self::new();
        port.refuse = Some(resource);
        (port, log)
    }

    fn push(&self, call: HwCall) {
        self.log.calls.lock().unwrap().push(call);
    }
}

impl HapticPort for MockPort {
    fn claim(&mut self, _desc: &HardwareDescription) -> Result<()> {
        if let Some(r) = self.refuse {
            return Err(Error::HardwareUnavailable(r));
        }
        self.push(HwCall::Claim);
        Ok(())
    }

    fn configure_pulse(
        &mut self,
        period_ns: u32,
        high_time_ns: u32,
    ) -> core::result::Result<(), ActuatorError> {
        self.push(HwCall::Configure {
            period_ns,
            high_ns: high_time_ns,
        });
        {
            let gate = &self.log.gate;
            let mut st = gate.state.lock().unwrap();
            st.1 = true;
            gate.cv.notify_all();
            while st.0 {
                st = gate.cv.wait(st).unwrap();
            }
        }
        if self.log.fail_configure.load(Ordering::SeqCst) {
            Err(ActuatorError::PwmConfigFailed)
        } else {
            Ok(())
        }
    }

    fn enable_pulse(&mut self) -> core::result::Result<(), ActuatorError> {
        self.push(HwCall::EnablePulse);
        Ok(())
    }

    fn disable_pulse(&mut self) {
        self.push(HwCall::DisablePulse);
    }

    fn set_enable_line(&mut self, active: bool) {
        self.push(HwCall::EnableLine(active));
    }

    fn release(&mut self) {
        self.push(HwCall::Release);
    }
}
