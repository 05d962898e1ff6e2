//! Unified error types for the ISA1000 vibrator driver.
//!
//! A single `Error` enum that every layer converts into. All variants are
//! `Copy` so they can be handed across the caller, timer and worker
//! contexts without allocation.
//!
//! Out-of-range tunables are deliberately absent from this taxonomy: duty
//! cycle, pulse frequency and activation duration are clamped, never
//! rejected.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level driver error
// ---------------------------------------------------------------------------

/// Every fallible operation in the driver funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A required line or channel could not be reserved at attach.
    HardwareUnavailable(Resource),
    /// A pulse or line write failed during a deferred hardware update.
    HardwareWriteFailed(ActuatorError),
    /// Control-surface input could not be interpreted.
    InvalidInput(&'static str),
    /// The hardware description is malformed.
    Config(&'static str),
    /// A driver task could not be spawned or joined.
    Task(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareUnavailable(r) => write!(f, "hardware unavailable: {r}"),
            Self::HardwareWriteFailed(e) => write!(f, "hardware write failed: {e}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Task(msg) => write!(f, "task: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Reservable resources
// ---------------------------------------------------------------------------

/// The hardware resources the controller reserves at attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Digital enable line of the motor driver (`gpio-isa1000-en`).
    MotorEnableLine,
    /// Haptic power rail line (`gpio-haptic-en`).
    HapticRailLine,
    /// PWM output modulating the motor drive strength.
    PulseChannel,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MotorEnableLine => write!(f, "motor enable line"),
            Self::HapticRailLine => write!(f, "haptic rail line"),
            Self::PulseChannel => write!(f, "pulse channel"),
        }
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Period/high-time configuration was rejected by the pulse channel.
    PwmConfigFailed,
    /// The pulse output could not be started.
    PwmEnableFailed,
    /// A digital line write failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmConfigFailed => write!(f, "PWM config failed"),
            Self::PwmEnableFailed => write!(f, "PWM enable failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::HardwareWriteFailed(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Driver-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
