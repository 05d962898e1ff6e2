//! LEDC pulse channel driving the ISA1000 PWM input.
//!
//! One LEDC timer feeds one LEDC channel.  Period changes retune the
//! timer; the active time becomes the channel duty at
//! [`PWM_RESOLUTION_BITS`](crate::pins::PWM_RESOLUTION_BITS) resolution.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: programs the LEDC peripheral.
//! On host/test: tracks state in-memory only.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys;
use log::{debug, info};

use crate::app::ports::PulseChannel;
use crate::error::ActuatorError;
use crate::pins;

const NSEC_PER_SEC: u32 = 1_000_000_000;
const DUTY_FULL_SCALE: u32 = 1 << pins::PWM_RESOLUTION_BITS;

pub struct LedcPulseChannel {
    gpio: i32,
    timer: u32,
    channel: Option<u32>,
    period_ns: u32,
    duty: u32,
    running: bool,
}

impl LedcPulseChannel {
    pub fn new(gpio: i32, timer: u32) -> Self {
        Self {
            gpio,
            timer,
            channel: None,
            period_ns: 0,
            duty: 0,
            running: false,
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.running
    }

    /// Duty register value for the last configuration.
    #[cfg(test)]
    fn duty(&self) -> u32 {
        self.duty
    }

    #[cfg(test)]
    fn frequency_hz(&self) -> u32 {
        NSEC_PER_SEC.checked_div(self.period_ns).unwrap_or(0)
    }

    fn channel(&self) -> Result<u32, ActuatorError> {
        self.channel.ok_or(ActuatorError::PwmConfigFailed)
    }

    // ── Hardware access ───────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn setup_hw(&self, channel: u32) -> Result<(), ActuatorError> {
        let timer = sys::ledc_timer_config_t {
            speed_mode: sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num: self.timer,
            duty_resolution: pins::PWM_RESOLUTION_BITS,
            freq_hz: crate::config::DEFAULT_PWM_FREQUENCY_HZ,
            clk_cfg: sys::soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        // SAFETY: the timer and channel are owned by this driver alone.
        let rc = unsafe { sys::ledc_timer_config(&timer) };
        if rc != sys::ESP_OK as i32 {
            return Err(ActuatorError::PwmConfigFailed);
        }
        let rc = unsafe {
            sys::ledc_channel_config(&sys::ledc_channel_config_t {
                speed_mode: sys::ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel: self.timer,
                gpio_num: self.gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            })
        };
        if rc != sys::ESP_OK as i32 {
            return Err(ActuatorError::PwmConfigFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn setup_hw(&self, _channel: u32) -> Result<(), ActuatorError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn set_freq_hw(&self, freq_hz: u32) -> Result<(), ActuatorError> {
        // SAFETY: timer configured in setup_hw().
        let rc = unsafe {
            sys::ledc_set_freq(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, self.timer, freq_hz)
        };
        if rc == sys::ESP_OK as i32 {
            Ok(())
        } else {
            Err(ActuatorError::PwmConfigFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_freq_hw(&self, _freq_hz: u32) -> Result<(), ActuatorError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn set_duty_hw(&self, channel: u32, duty: u32) -> Result<(), ActuatorError> {
        // SAFETY: channel configured in setup_hw(); only the hardware
        // worker calls into this driver.
        let rc = unsafe {
            let rc = sys::ledc_set_duty(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
            if rc == sys::ESP_OK as i32 {
                sys::ledc_update_duty(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, channel)
            } else {
                rc
            }
        };
        if rc == sys::ESP_OK as i32 {
            Ok(())
        } else {
            Err(ActuatorError::PwmEnableFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_duty_hw(&self, _channel: u32, _duty: u32) -> Result<(), ActuatorError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn stop_hw(&self, channel: u32) {
        // SAFETY: see set_duty_hw().  Idle level low keeps the motor quiet.
        unsafe {
            sys::ledc_stop(sys::ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn stop_hw(&self, _channel: u32) {}
}

impl PulseChannel for LedcPulseChannel {
    fn acquire(&mut self, channel: u32) -> Result<(), ActuatorError> {
        self.setup_hw(channel)?;
        self.channel = Some(channel);
        self.running = false;
        info!("ledc: channel {} on GPIO {} (timer {})", channel, self.gpio, self.timer);
        Ok(())
    }

    fn configure(&mut self, period_ns: u32, high_time_ns: u32) -> Result<(), ActuatorError> {
        self.channel()?;
        if period_ns == 0 || high_time_ns > period_ns {
            return Err(ActuatorError::PwmConfigFailed);
        }
        if period_ns != self.period_ns {
            self.set_freq_hw(NSEC_PER_SEC / period_ns)?;
            self.period_ns = period_ns;
        }
        self.duty =
            (u64::from(high_time_ns) * u64::from(DUTY_FULL_SCALE) / u64::from(period_ns)) as u32;
        debug!("ledc: period {}ns, duty {}/{}", period_ns, self.duty, DUTY_FULL_SCALE);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), ActuatorError> {
        let channel = self.channel().map_err(|_| ActuatorError::PwmEnableFailed)?;
        self.set_duty_hw(channel, self.duty)?;
        self.running = true;
        Ok(())
    }

    fn disable(&mut self) {
        if let Some(channel) = self.channel {
            self.stop_hw(channel);
        }
        self.running = false;
    }

    fn release(&mut self) {
        self.disable();
        self.channel = None;
        self.period_ns = 0;
    }
}
