//! Controller lifecycle, timing and hardware-sequence tests.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use isa1000::error::{Error, Resource};
use isa1000::{HardwareDescription, Phase, Vibrator, VibratorConfig};

use crate::mock_hw::{HwCall, HwLog, MockPort};

const SETTLE: Duration = Duration::from_secs(2);

fn attach(max_timeout_ms: u32) -> (Vibrator<MockPort>, HwLog) {
    let (port, log) = MockPort::new();
    let vib = Vibrator::attach(
        &HardwareDescription::default(),
        VibratorConfig::new(max_timeout_ms),
        port,
    )
    .unwrap();
    (vib, log)
}

fn wait_idle(vib: &Vibrator<MockPort>) {
    let deadline = Instant::now() + SETTLE;
    while vib.is_active() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
}

// ── Attach / teardown ─────────────────────────────────────────

#[test]
fn attach_claims_and_starts_idle() {
    let (vib, log) = attach(1_000);
    assert_eq!(log.calls(), vec![HwCall::Claim]);
    assert_eq!(vib.phase(), Phase::Idle);
    assert_eq!(vib.remaining_ms(), 0);
    assert_eq!(vib.pwm_frequency_hz(), 25_000);
    assert_eq!(vib.duty_percent(), 100);
}

#[test]
fn attach_reports_unavailable_resource() {
    let (port, log) = MockPort::refusing(Resource::PulseChannel);
    let err = Vibrator::attach(&HardwareDescription::default(), VibratorConfig::new(100), port)
        .err()
        .unwrap();
    assert_eq!(err, Error::HardwareUnavailable(Resource::PulseChannel));
    assert!(log.calls().is_empty());
}

#[test]
fn attach_rejects_invalid_description_before_claim() {
    let (port, log) = MockPort::new();
    let desc = HardwareDescription {
        motor_enable_gpio: -1,
        ..HardwareDescription::default()
    };
    let err = Vibrator::attach(&desc, VibratorConfig::new(100), port).err().unwrap();
    assert_eq!(err, Error::HardwareUnavailable(Resource::MotorEnableLine));
    assert!(log.calls().is_empty());
}

#[test]
fn teardown_while_active_forces_off_and_releases() {
    let (vib, log) = attach(10_000);
    vib.request_activation(5_000);
    assert!(log.wait_for(SETTLE, |c| c.contains(&HwCall::EnableLine(true))));

    let _port = vib.teardown().unwrap();
    let calls = log.calls();
    assert_eq!(
        &calls[calls.len() - 3..],
        &[HwCall::EnableLine(false), HwCall::DisablePulse, HwCall::Release]
    );
    assert!(!log.line());
}

#[test]
fn drop_releases_port() {
    let (vib, log) = attach(1_000);
    drop(vib);
    assert_eq!(log.calls().last(), Some(&HwCall::Release));
}

// ── Timing ────────────────────────────────────────────────────

#[test]
fn end_to_end_hardware_sequence() {
    let (vib, log) = attach(1_000);
    let start = Instant::now();
    vib.request_activation(50);
    wait_idle(&vib);
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(log.wait_for(SETTLE, |c| c.contains(&HwCall::DisablePulse)));

    assert_eq!(
        log.calls(),
        vec![
            HwCall::Claim,
            HwCall::Configure {
                period_ns: 40_000,
                high_ns: 40_000
            },
            HwCall::EnablePulse,
            HwCall::EnableLine(true),
            HwCall::EnableLine(false),
            HwCall::DisablePulse,
        ]
    );
    assert_eq!(vib.stats().expiries, 1);
}

#[test]
fn cancel_before_deadline_prevents_expiry() {
    let (vib, log) = attach(1_000);
    vib.request_activation(100);
    vib.request_activation(0);
    assert_eq!(vib.phase(), Phase::Idle);

    thread::sleep(Duration::from_millis(200));
    assert_eq!(vib.phase(), Phase::Idle);
    assert_eq!(vib.stats().expiries, 0);
    assert!(!log.line());
}

#[test]
fn remaining_time_counts_down_to_zero() {
    let (vib, _log) = attach(1_000);
    vib.request_activation(500);

    let mut last = vib.remaining_ms();
    assert!(last > 0 && last <= 500, "remaining {last}");
    while last > 0 {
        thread::sleep(Duration::from_millis(20));
        let now = vib.remaining_ms();
        assert!(now <= last, "remaining went up: {last} -> {now}");
        last = now;
    }
    wait_idle(&vib);
    assert_eq!(vib.phase(), Phase::Idle);
}

#[test]
fn rearm_extends_deadline() {
    let (vib, _log) = attach(1_000);
    vib.request_activation(60);
    thread::sleep(Duration::from_millis(30));
    vib.request_activation(300);

    thread::sleep(Duration::from_millis(80));
    assert!(vib.is_active());
    assert!(vib.remaining_ms() > 100);
}

#[test]
fn request_beyond_max_is_clamped() {
    let (vib, _log) = attach(80);
    vib.request_activation(60_000);
    assert!(vib.remaining_ms() <= 80);
    wait_idle(&vib);
    assert_eq!(vib.phase(), Phase::Idle);
}

// ── Tunables and failures ─────────────────────────────────────

#[test]
fn tunables_take_effect_on_next_activation() {
    let (vib, log) = attach(1_000);
    vib.request_activation(500);
    assert!(log.wait_for(SETTLE, |c| c.contains(&HwCall::EnableLine(true))));

    assert_eq!(vib.set_pwm_frequency_hz(10_000), 10_000);
    assert_eq!(vib.set_duty_percent(50), 80);
    assert_eq!(log.configures(), vec![(40_000, 40_000)]);

    vib.request_activation(500);
    assert!(log.wait_for(SETTLE, |_| log.configures().len() == 2));
    assert_eq!(log.configures()[1], (100_000, 80_000));
}

#[test]
fn write_failure_keeps_state_and_next_request_retries() {
    let (vib, log) = attach(1_000);
    log.set_fail_configure(true);
    vib.request_activation(500);
    assert!(log.wait_for(SETTLE, |_| vib.stats().write_failures == 1));
    assert!(vib.is_active());
    assert_eq!(log.count(&HwCall::EnablePulse), 0);
    assert!(!log.line());

    log.set_fail_configure(false);
    vib.request_activation(500);
    assert!(log.wait_for(SETTLE, |c| c.contains(&HwCall::EnableLine(true))));
    assert_eq!(vib.stats().write_failures, 1);
}

#[test]
fn concurrent_requests_converge_to_last_state() {
    let (vib, log) = attach(5_000);
    let vib = Arc::new(vib);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let vib = Arc::clone(&vib);
            thread::spawn(move || {
                for n in 0..50u32 {
                    vib.request_activation(if (n + i) % 3 == 0 { 0 } else { 1_000 });
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    vib.request_activation(0);
    assert!(log.wait_for(SETTLE, |c| c.last() == Some(&HwCall::DisablePulse)));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(log.calls().last(), Some(&HwCall::DisablePulse));
    assert!(!log.line());
    assert_eq!(vib.phase(), Phase::Idle);
}

// ── Writes in flight ──────────────────────────────────────────

#[test]
fn turn_off_during_blocked_write_ends_off() {
    let (vib, log) = attach(10_000);
    log.hold_writes();
    vib.request_activation(500);
    assert!(log.wait_entered(SETTLE));

    vib.request_activation(0);
    assert_eq!(vib.phase(), Phase::Idle);
    log.release_writes();

    assert!(log.wait_for(SETTLE, |c| c.last() == Some(&HwCall::DisablePulse)));
    thread::sleep(Duration::from_millis(50));
    let calls = log.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[HwCall::EnableLine(false), HwCall::DisablePulse]
    );
    assert!(!log.line());
}

#[test]
fn teardown_waits_for_blocked_write() {
    let (vib, log) = attach(10_000);
    log.hold_writes();
    vib.request_activation(500);
    assert!(log.wait_entered(SETTLE));

    let releaser = {
        let log = log.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            log.release_writes();
        })
    };
    let _port = vib.teardown().unwrap();
    releaser.join().unwrap();

    let calls = log.calls();
    let n = calls.len();
    assert_eq!(
        &calls[n - 3..],
        &[HwCall::EnableLine(false), HwCall::DisablePulse, HwCall::Release]
    );
    let started = calls.iter().position(|c| *c == HwCall::EnablePulse).unwrap();
    assert!(started < n - 3);
    assert!(!log.line());
}
