//! Vibrator configuration parameters
//!
//! [`HardwareDescription`] is what the board tells the driver about its
//! wiring; [`VibratorConfig`] holds the tunables the controller runs with.
//! Tunables outside their documented range are clamped, never rejected.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Resource, Result};
use crate::pins;

// --- Ranges ---

/// Default pulse frequency (inaudible on the ISA1000 reference motor).
pub const DEFAULT_PWM_FREQUENCY_HZ: u32 = 25_000;
pub const MIN_PWM_FREQUENCY_HZ: u32 = 10_000;
pub const MAX_PWM_FREQUENCY_HZ: u32 = 50_000;

/// Default duty cycle.  Below 80 % the motor stalls.
pub const DEFAULT_DUTY_PERCENT: u8 = 100;
pub const MIN_DUTY_PERCENT: u8 = 80;
pub const MAX_DUTY_PERCENT: u8 = 100;

/// Maximum activation used when the description omits `timeout-ms`.
pub const DEFAULT_TIMEOUT_MS: u32 = 15_000;

const NSEC_PER_SEC: u32 = 1_000_000_000;

/// Clamp a requested duty cycle into `[80, 100]`.
pub fn clamp_duty_percent(value: i64) -> u8 {
    value.clamp(i64::from(MIN_DUTY_PERCENT), i64::from(MAX_DUTY_PERCENT)) as u8
}

/// Clamp a requested pulse frequency into `[10000, 50000]`.
pub fn clamp_frequency_hz(value: i64) -> u32 {
    value.clamp(i64::from(MIN_PWM_FREQUENCY_HZ), i64::from(MAX_PWM_FREQUENCY_HZ)) as u32
}

// ---------------------------------------------------------------------------
// Hardware description
// ---------------------------------------------------------------------------

/// Board wiring, keyed by the device-tree property names of the ISA1000
/// binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareDescription {
    /// Motor driver enable line.
    #[serde(rename = "gpio-isa1000-en")]
    pub motor_enable_gpio: i32,
    /// Haptic power rail line.
    #[serde(rename = "gpio-haptic-en")]
    pub haptic_rail_gpio: i32,
    /// Longest activation the controller will honour.
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u32,
    /// Pulse channel identifier.
    #[serde(rename = "pwm-channel", default)]
    pub pwm_channel: u32,
}

fn default_timeout_ms() -> u32 {
    DEFAULT_TIMEOUT_MS
}

impl Default for HardwareDescription {
    fn default() -> Self {
        Self {
            motor_enable_gpio: pins::MOTOR_ENABLE_GPIO,
            haptic_rail_gpio: pins::HAPTIC_RAIL_GPIO,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            pwm_channel: pins::MOTOR_PWM_CHANNEL,
        }
    }
}

impl HardwareDescription {
    /// Parse a description from its JSON form.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|_| Error::Config("malformed hardware description"))
    }

    /// Check that both lines are usable before anything is reserved.
    pub fn validate(&self) -> Result<()> {
        if self.motor_enable_gpio < 0 {
            return Err(Error::HardwareUnavailable(Resource::MotorEnableLine));
        }
        if self.haptic_rail_gpio < 0 || self.haptic_rail_gpio == self.motor_enable_gpio {
            return Err(Error::HardwareUnavailable(Resource::HapticRailLine));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pulse settings
// ---------------------------------------------------------------------------

/// Frequency and duty cycle, as read by one hardware update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseSettings {
    pub frequency_hz: u32,
    pub duty_percent: u8,
}

impl PulseSettings {
    /// Pulse period in nanoseconds.
    pub fn period_ns(&self) -> u32 {
        NSEC_PER_SEC / self.frequency_hz.max(1)
    }

    /// Active portion of each period in nanoseconds.
    pub fn high_time_ns(&self) -> u32 {
        (u64::from(self.period_ns()) * u64::from(self.duty_percent) / 100) as u32
    }
}

// ---------------------------------------------------------------------------
// Controller configuration
// ---------------------------------------------------------------------------

/// Tunables the controller is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibratorConfig {
    /// Pulse frequency in Hz, `[10000, 50000]`.
    pub pwm_frequency_hz: u32,
    /// Duty cycle in percent, `[80, 100]`.
    pub duty_percent: u8,
    /// Upper bound for a single activation; fixed after attach.
    pub max_timeout_ms: u32,
}

impl Default for VibratorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl VibratorConfig {
    /// Default tunables with the given activation ceiling.
    pub fn new(max_timeout_ms: u32) -> Self {
        Self {
            pwm_frequency_hz: DEFAULT_PWM_FREQUENCY_HZ,
            duty_percent: DEFAULT_DUTY_PERCENT,
            max_timeout_ms,
        }
    }

    pub fn from_description(desc: &HardwareDescription) -> Self {
        Self::new(desc.timeout_ms)
    }

    /// Copy with frequency and duty forced into range.
    pub fn clamped(self) -> Self {
        Self {
            pwm_frequency_hz: clamp_frequency_hz(i64::from(self.pwm_frequency_hz)),
            duty_percent: clamp_duty_percent(i64::from(self.duty_percent)),
            ..self
        }
    }

    pub fn pulse(&self) -> PulseSettings {
        PulseSettings {
            frequency_hz: self.pwm_frequency_hz,
            duty_percent: self.duty_percent,
        }
    }
}
