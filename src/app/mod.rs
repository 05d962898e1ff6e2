//! Application core — the timed-activation controller.
//!
//! Owns the activation state machine, the deadline timer wiring and the
//! deferred hardware worker.  All hardware access goes through the
//! [`ports::HapticPort`] trait, keeping this layer testable without real
//! peripherals.

pub mod commands;
pub mod ports;
pub mod service;
pub mod state;
pub mod worker;
