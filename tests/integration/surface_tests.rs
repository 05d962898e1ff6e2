//! Attribute surface tests: text in, clamped state out.

use std::time::Duration;

use isa1000::error::Error;
use isa1000::{Attribute, HardwareDescription, Phase, Vibrator, VibratorConfig, DEVICE_NAME};

use crate::mock_hw::{HwCall, MockPort};

fn attach() -> (Vibrator<MockPort>, crate::mock_hw::HwLog) {
    let (port, log) = MockPort::new();
    let vib = Vibrator::attach(&HardwareDescription::default(), VibratorConfig::new(2_000), port)
        .unwrap();
    (vib, log)
}

#[test]
fn device_is_named_vibrator() {
    assert_eq!(DEVICE_NAME, "vibrator");
}

#[test]
fn amp_and_pwm_show_defaults() {
    let (vib, _log) = attach();
    assert_eq!(vib.show(Attribute::Amp).unwrap().as_str(), "100\n");
    assert_eq!(vib.show(Attribute::Pwm).unwrap().as_str(), "25000\n");
    assert_eq!(vib.show(Attribute::Remaining).unwrap().as_str(), "0\n");
}

#[test]
fn store_clamps_tunables() {
    let (vib, _log) = attach();
    assert_eq!(vib.store(Attribute::Amp, "150\n"), Ok(4));
    assert_eq!(vib.show(Attribute::Amp).unwrap().as_str(), "100\n");
    vib.store(Attribute::Amp, "50").unwrap();
    assert_eq!(vib.duty_percent(), 80);
    vib.store(Attribute::Pwm, " 5000 ").unwrap();
    assert_eq!(vib.show(Attribute::Pwm).unwrap().as_str(), "10000\n");
    vib.store(Attribute::Pwm, "999999").unwrap();
    assert_eq!(vib.pwm_frequency_hz(), 50_000);
}

#[test]
fn enable_runs_motor_and_remaining_reports_microseconds() {
    let (vib, log) = attach();
    assert_eq!(vib.store(Attribute::Enable, "1000\n"), Ok(5));
    assert_eq!(vib.phase(), Phase::Active);

    let shown = vib.show(Attribute::Remaining).unwrap();
    let us: u64 = shown.trim_end().parse().unwrap();
    assert!(us > 0 && us <= 1_000_000, "remaining {us}us");
    assert!(shown.ends_with('\n'));

    assert!(log.wait_for(Duration::from_secs(2), |c| c.contains(&HwCall::EnableLine(true))));

    vib.store(Attribute::Enable, "0").unwrap();
    assert_eq!(vib.phase(), Phase::Idle);
    assert_eq!(vib.show(Attribute::Remaining).unwrap().as_str(), "0\n");
}

#[test]
fn negative_enable_turns_off() {
    let (vib, _log) = attach();
    vib.store(Attribute::Enable, "1000").unwrap();
    vib.store(Attribute::Enable, "-20").unwrap();
    assert_eq!(vib.phase(), Phase::Idle);
}

#[test]
fn invalid_text_leaves_state_untouched() {
    let (vib, _log) = attach();
    vib.store(Attribute::Amp, "90").unwrap();
    assert!(matches!(vib.store(Attribute::Amp, "ninety"), Err(Error::InvalidInput(_))));
    assert!(matches!(vib.store(Attribute::Enable, "1e3"), Err(Error::InvalidInput(_))));
    assert_eq!(vib.duty_percent(), 90);
    assert_eq!(vib.phase(), Phase::Idle);
}

#[test]
fn access_mode_violations_are_rejected() {
    let (vib, _log) = attach();
    assert!(matches!(vib.show(Attribute::Enable), Err(Error::InvalidInput(_))));
    assert!(matches!(vib.store(Attribute::Remaining, "5"), Err(Error::InvalidInput(_))));
}
