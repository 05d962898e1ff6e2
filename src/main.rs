//! ISA1000 haptic vibrator — ESP-IDF entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  UART console  ──"<attr> [value]"──▶  show / store        │
//! │                                                          │
//! │  ───────────────── Vibrator (app core) ─────────────────  │
//! │  state lock · deadline timer · deferred worker           │
//! │                                                          │
//! │  ──────────────── HapticPort boundary ────────────────    │
//! │  LineHapticPort: PinDriver en + PinDriver rail + LEDC    │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;

use anyhow::Result;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::{error, info, warn};

use isa1000::adapters::hardware::LineHapticPort;
use isa1000::drivers::ledc::LedcPulseChannel;
use isa1000::{pins, Attribute, HardwareDescription, Vibrator, VibratorConfig, DEVICE_NAME};

/// Buzz once at boot so a dead motor is noticed on the bench.
const SELF_TEST_MS: u32 = 150;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ISA1000 vibrator v{}             ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Hardware ───────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let desc = HardwareDescription::default();
    let enable = PinDriver::output(peripherals.pins.gpio5)?;
    let rail = PinDriver::output(peripherals.pins.gpio6)?;
    let pulse = LedcPulseChannel::new(pins::MOTOR_PWM_GPIO, pins::MOTOR_PWM_TIMER);
    let port = LineHapticPort::new(enable, rail, pulse);

    // ── 3. Controller ─────────────────────────────────────────
    let vibrator = Vibrator::attach(&desc, VibratorConfig::from_description(&desc), port)?;
    vibrator.request_activation(SELF_TEST_MS);

    // ── 4. Console: "<attr>" reads, "<attr> <value>" writes ───
    info!("{}: attributes enable, remaining, amp, pwm", DEVICE_NAME);
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("console read failed: {}", e);
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, value) = match line.split_once(char::is_whitespace) {
            Some((n, v)) => (n, Some(v)),
            None => (line, None),
        };
        let attr: Attribute = match name.parse() {
            Ok(a) => a,
            Err(e) => {
                warn!("{}: {}", name, e);
                continue;
            }
        };
        match value {
            Some(v) => {
                if let Err(e) = vibrator.store(attr, v) {
                    warn!("{}/{}: {}", DEVICE_NAME, attr.name(), e);
                }
            }
            None => match vibrator.show(attr) {
                Ok(text) => print!("{}", text),
                Err(e) => warn!("{}/{}: {}", DEVICE_NAME, attr.name(), e),
            },
        }
    }

    error!("console closed, detaching");
    let _port = vibrator.teardown()?;
    Ok(())
}
