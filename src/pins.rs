//! Default line and channel assignments for the reference haptic board.
//!
//! Used when no hardware description is supplied and by the ESP-IDF
//! LEDC channel driver.  Board variants override these through
//! [`HardwareDescription`](crate::config::HardwareDescription).

// ---------------------------------------------------------------------------
// ISA1000 motor driver
// ---------------------------------------------------------------------------

/// Digital output: ISA1000 enable (active HIGH).
pub const MOTOR_ENABLE_GPIO: i32 = 5;
/// Digital output: haptic power rail (active HIGH), held on while attached.
pub const HAPTIC_RAIL_GPIO: i32 = 6;
/// PWM output pin routed to the ISA1000 PWM input.
pub const MOTOR_PWM_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// Pulse channel identifier (LEDC channel on ESP32).
pub const MOTOR_PWM_CHANNEL: u32 = 0;
/// LEDC timer driving the motor channel.
pub const MOTOR_PWM_TIMER: u32 = 0;
/// LEDC timer resolution (bits).  10-bit keeps duty steps below 0.1 %.
pub const PWM_RESOLUTION_BITS: u32 = 10;
