//! Activation state machine.
//!
//! ```text
//!            request(d > 0)              request(d > 0) (re-arm)
//!   ┌──────┐ ─────────────▶ ┌────────┐ ◀──────────────┐
//!   │ Idle │                │ Active │ ───────────────┘
//!   └──────┘ ◀───────────── └────────┘
//!            request(0) / expire(token)
//! ```
//!
//! Pure data: no locking, no timers, no I/O.  The controller holds this
//! behind its state lock and mirrors every [`Arming`] into the deadline
//! timer.  `desired_on` is `true` exactly when an arming is present.

use std::time::{Duration, Instant};

/// Externally visible phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Motor off, no deadline pending.
    Idle,
    /// Motor on, deadline armed.
    Active,
}

/// A pending deadline together with the token that identifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arming {
    pub until: Instant,
    pub token: u64,
}

/// The compact record guarded by the controller's state lock.
#[derive(Debug, Default)]
pub struct ActuatorState {
    desired_on: bool,
    armed: Option<Arming>,
    next_token: u64,
}

impl ActuatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state the hardware should be driven to.
    pub fn desired_on(&self) -> bool {
        self.desired_on
    }

    pub fn armed(&self) -> Option<Arming> {
        self.armed
    }

    pub fn armed_until(&self) -> Option<Instant> {
        self.armed.map(|a| a.until)
    }

    pub fn phase(&self) -> Phase {
        if self.desired_on {
            Phase::Active
        } else {
            Phase::Idle
        }
    }

    /// Apply an activation request of an already-clamped duration.
    ///
    /// Returns the new arming for the timer, or `None` when the request
    /// turned the motor off.
    pub fn request(&mut self, now: Instant, duration_ms: u32) -> Option<Arming> {
        if duration_ms == 0 {
            self.turn_off();
            return None;
        }

        let arming = Arming {
            until: now + Duration::from_millis(u64::from(duration_ms)),
            token: self.next_token,
        };
        self.next_token = self.next_token.wrapping_add(1);
        self.desired_on = true;
        self.armed = Some(arming);
        Some(arming)
    }

    /// Deadline callback for the arming identified by `token`.
    ///
    /// Returns `false` (and changes nothing) when that arming was already
    /// replaced or cancelled.
    pub fn expire(&mut self, token: u64) -> bool {
        match self.armed {
            Some(a) if a.token == token => {
                self.turn_off();
                true
            }
            _ => false,
        }
    }

    /// Time left until the armed deadline, zero when idle or overdue.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.armed
            .map_or(Duration::ZERO, |a| a.until.saturating_duration_since(now))
    }

    fn turn_off(&mut self) {
        self.desired_on = false;
        self.armed = None;
    }

    /// `desired_on` and the arming move together.
    pub fn is_consistent(&self) -> bool {
        self.desired_on == self.armed.is_some()
    }
}
