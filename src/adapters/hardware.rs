//! Hardware adapter — bridges the motor lines and pulse channel to
//! [`HapticPort`].
//!
//! Generic over `embedded-hal` output pins so the same adapter runs on
//! ESP-IDF `PinDriver`s and on test doubles.  This is the only module in
//! the driver that touches the enable lines.

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::app::ports::{HapticPort, PulseChannel};
use crate::config::HardwareDescription;
use crate::error::{ActuatorError, Error, Resource, Result};

/// Enable line, haptic rail and pulse channel behind [`HapticPort`].
pub struct LineHapticPort<EN, RAIL, CH> {
    enable: EN,
    rail: RAIL,
    pulse: CH,
    claimed: bool,
}

impl<EN, RAIL, CH> LineHapticPort<EN, RAIL, CH>
where
    EN: OutputPin,
    RAIL: OutputPin,
    CH: PulseChannel,
{
    pub fn new(enable: EN, rail: RAIL, pulse: CH) -> Self {
        Self {
            enable,
            rail,
            pulse,
            claimed: false,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// Give back the underlying pins and channel.
    pub fn into_parts(self) -> (EN, RAIL, CH) {
        (self.enable, self.rail, self.pulse)
    }

    fn write_enable(&mut self, active: bool) -> core::result::Result<(), ActuatorError> {
        let r = if active {
            self.enable.set_high()
        } else {
            self.enable.set_low()
        };
        r.map_err(|_| ActuatorError::GpioWriteFailed)
    }
}

// ── HapticPort implementation ─────────────────────────────────

impl<EN, RAIL, CH> HapticPort for LineHapticPort<EN, RAIL, CH>
where
    EN: OutputPin + Send,
    RAIL: OutputPin + Send,
    CH: PulseChannel + Send,
{
    fn claim(&mut self, desc: &HardwareDescription) -> Result<()> {
        self.write_enable(false)
            .map_err(|_| Error::HardwareUnavailable(Resource::MotorEnableLine))?;
        self.rail
            .set_high()
            .map_err(|_| Error::HardwareUnavailable(Resource::HapticRailLine))?;
        if self.pulse.acquire(desc.pwm_channel).is_err() {
            if self.rail.set_low().is_err() {
                warn!(
                    "haptic port: rail line on failed claim: {}",
                    ActuatorError::GpioWriteFailed
                );
            }
            return Err(Error::HardwareUnavailable(Resource::PulseChannel));
        }
        self.pulse.disable();
        self.claimed = true;
        info!(
            "haptic port: claimed en={} rail={} pwm-ch={}",
            desc.motor_enable_gpio, desc.haptic_rail_gpio, desc.pwm_channel
        );
        Ok(())
    }

    fn configure_pulse(
        &mut self,
        period_ns: u32,
        high_time_ns: u32,
    ) -> core::result::Result<(), ActuatorError> {
        self.pulse.configure(period_ns, high_time_ns)
    }

    fn enable_pulse(&mut self) -> core::result::Result<(), ActuatorError> {
        self.pulse.enable()
    }

    fn disable_pulse(&mut self) {
        self.pulse.disable();
    }

    fn set_enable_line(&mut self, active: bool) {
        if let Err(e) = self.write_enable(active) {
            warn!("haptic port: enable line -> {}: {}", active, e);
        }
    }

    fn release(&mut self) {
        if !self.claimed {
            debug!("haptic port: release without claim");
            return;
        }
        if let Err(e) = self.write_enable(false) {
            warn!("haptic port: enable line on release: {}", e);
        }
        self.pulse.release();
        if self.rail.set_low().is_err() {
            warn!(
                "haptic port: rail line on release: {}",
                ActuatorError::GpioWriteFailed
            );
        }
        self.claimed = false;
        info!("haptic port: released");
    }
}
