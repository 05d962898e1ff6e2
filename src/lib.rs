//! ISA1000 haptic vibrator driver.
//!
//! Timed activation of a PWM-driven vibration motor: callers request "run
//! for N ms", a one-shot deadline switches the motor off, and every
//! hardware write happens on a deferred worker task.  All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod pins;

mod sync;

// Links the std critical-section implementation behind embassy-sync on host.
#[cfg(not(target_os = "espidf"))]
use critical_section as _;

pub use app::commands::{Attribute, ControlCommand, DEVICE_NAME};
pub use app::ports::{HapticPort, PulseChannel};
pub use app::service::Vibrator;
pub use app::state::Phase;
pub use config::{HardwareDescription, VibratorConfig};
pub use diagnostics::Stats;
pub use error::{ActuatorError, Error, Resource, Result};
