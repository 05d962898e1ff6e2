//! Fuzz target: `ControlCommand::parse`
//!
//! Drives arbitrary text into every attribute and asserts that parsing
//! never panics, only accepts writable attributes, and that applying the
//! result always leaves the tunables inside their clamped ranges.
//!
//! cargo fuzz run fuzz_attribute_store

#![no_main]

use isa1000::config::{clamp_duty_percent, clamp_frequency_hz};
use isa1000::{Attribute, ControlCommand};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    for attr in Attribute::ALL {
        match ControlCommand::parse(attr, text) {
            Ok(ControlCommand::Enable(_)) => assert_eq!(attr, Attribute::Enable),
            Ok(ControlCommand::SetAmp(v)) => {
                assert_eq!(attr, Attribute::Amp);
                assert!((80..=100).contains(&clamp_duty_percent(v)));
            }
            Ok(ControlCommand::SetPwm(v)) => {
                assert_eq!(attr, Attribute::Pwm);
                assert!((10_000..=50_000).contains(&clamp_frequency_hz(v)));
            }
            Err(_) => {}
        }
    }
});
