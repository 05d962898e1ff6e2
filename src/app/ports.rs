//! Port traits — the boundary between the controller and the hardware.
//!
//! ```text
//!   Vibrator ──▶ HapticPort ──▶ lines + pulse channel
//! ```
//!
//! The [`Vibrator`](super::service::Vibrator) owns exactly one
//! [`HapticPort`] and hands it to its deferred worker, which is the only
//! context that ever calls into it.  Implementations may block.

use crate::config::HardwareDescription;
use crate::error::{ActuatorError, Result};

// ───────────────────────────────────────────────────────────────
// Haptic port (driven adapter: controller → hardware)
// ───────────────────────────────────────────────────────────────

/// Everything the controller needs from the motor hardware.
pub trait HapticPort: Send {
    /// Reserve both lines and the pulse channel.
    ///
    /// On success the motor enable line is inactive, the haptic rail is
    /// active and the pulse output is stopped.  Failures name the
    /// resource via [`Error::HardwareUnavailable`](crate::error::Error).
    fn claim(&mut self, desc: &HardwareDescription) -> Result<()>;

    /// Program the pulse period and active time, both in nanoseconds.
    fn configure_pulse(&mut self, period_ns: u32, high_time_ns: u32)
        -> core::result::Result<(), ActuatorError>;

    /// Start the pulse output.
    fn enable_pulse(&mut self) -> core::result::Result<(), ActuatorError>;

    /// Stop the pulse output.
    fn disable_pulse(&mut self);

    /// Drive the motor enable line.
    fn set_enable_line(&mut self, active: bool);

    /// Drop the rail and give every reserved resource back.
    fn release(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Pulse channel (one PWM output)
// ───────────────────────────────────────────────────────────────

/// A single PWM output, as used by
/// [`LineHapticPort`](crate::adapters::hardware::LineHapticPort).
pub trait PulseChannel {
    /// Reserve the channel with the given identifier.
    fn acquire(&mut self, channel: u32) -> core::result::Result<(), ActuatorError>;

    fn configure(&mut self, period_ns: u32, high_time_ns: u32)
        -> core::result::Result<(), ActuatorError>;

    fn enable(&mut self) -> core::result::Result<(), ActuatorError>;

    fn disable(&mut self);

    fn release(&mut self);
}
