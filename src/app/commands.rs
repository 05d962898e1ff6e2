//! Attribute-style control surface.
//!
//! The vibrator is exposed as one device named [`DEVICE_NAME`] with four
//! text attributes, read and written the way a sysfs timed-output device
//! is:
//!
//! | Attribute   | Access | Meaning                                   |
//! |-------------|--------|-------------------------------------------|
//! | `enable`    | write  | run for N ms, `0` stops                   |
//! | `remaining` | read   | time left in microseconds                 |
//! | `amp`       | r/w    | duty cycle in percent, clamped `[80,100]` |
//! | `pwm`       | r/w    | pulse frequency in Hz, clamped            |
//!
//! Values are trimmed decimal integers.  Out-of-range numbers are clamped;
//! text that is not a number is rejected and changes nothing.

use core::fmt::Write as _;
use core::str::FromStr;

use log::{debug, warn};

use crate::error::{Error, Result};

use super::ports::HapticPort;
use super::service::Vibrator;

/// Name the device is registered under.
pub const DEVICE_NAME: &str = "vibrator";

/// Text returned by [`Vibrator::show`].
pub type AttrText = heapless::String<16>;

// ───────────────────────────────────────────────────────────────
// Attributes
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Enable,
    Remaining,
    Amp,
    Pwm,
}

impl Attribute {
    pub const ALL: [Self; 4] = [Self::Enable, Self::Remaining, Self::Amp, Self::Pwm];

    pub fn name(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Remaining => "remaining",
            Self::Amp => "amp",
            Self::Pwm => "pwm",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    pub fn readable(self) -> bool {
        !matches!(self, Self::Enable)
    }

    pub fn writable(self) -> bool {
        !matches!(self, Self::Remaining)
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s.trim()).ok_or(Error::InvalidInput("unknown attribute"))
    }
}

// ───────────────────────────────────────────────────────────────
// Commands
// ───────────────────────────────────────────────────────────────

/// A parsed attribute write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Activation request in milliseconds, `0` stops.
    Enable(u32),
    /// Requested duty cycle, clamped when applied.
    SetAmp(i64),
    /// Requested pulse frequency, clamped when applied.
    SetPwm(i64),
}

impl ControlCommand {
    /// Parse the text written to `attr`.
    pub fn parse(attr: Attribute, text: &str) -> Result<Self> {
        if !attr.writable() {
            return Err(Error::InvalidInput("attribute is read-only"));
        }
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput("not a decimal integer"))?;

        Ok(match attr {
            Attribute::Enable => {
                Self::Enable(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
            }
            Attribute::Amp => Self::SetAmp(value),
            Attribute::Pwm => Self::SetPwm(value),
            Attribute::Remaining => return Err(Error::InvalidInput("attribute is read-only")),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Surface on the controller
// ───────────────────────────────────────────────────────────────

impl<P: HapticPort + 'static> Vibrator<P> {
    /// Apply a parsed command.
    pub fn execute(&self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::Enable(ms) => self.request_activation(ms),
            ControlCommand::SetAmp(v) => {
                self.set_duty_percent(v);
            }
            ControlCommand::SetPwm(v) => {
                self.set_pwm_frequency_hz(v);
            }
        }
    }

    /// Render `attr` as `"<value>\n"`.
    pub fn show(&self, attr: Attribute) -> Result<AttrText> {
        let mut out = AttrText::new();
        let written = match attr {
            Attribute::Enable => return Err(Error::InvalidInput("attribute is write-only")),
            Attribute::Remaining => writeln!(out, "{}", self.remaining_us()),
            Attribute::Amp => writeln!(out, "{}", self.duty_percent()),
            Attribute::Pwm => writeln!(out, "{}", self.pwm_frequency_hz()),
        };
        written.map_err(|_| Error::InvalidInput("value does not fit"))?;
        Ok(out)
    }

    /// Parse and apply a write to `attr`.  Returns the bytes consumed.
    pub fn store(&self, attr: Attribute, text: &str) -> Result<usize> {
        match ControlCommand::parse(attr, text) {
            Ok(cmd) => {
                debug!("{}/{}: {:?}", DEVICE_NAME, attr.name(), cmd);
                self.execute(cmd);
                Ok(text.len())
            }
            Err(e) => {
                warn!("{}/{}: rejected {:?}: {}", DEVICE_NAME, attr.name(), text, e);
                Err(e)
            }
        }
    }
}
