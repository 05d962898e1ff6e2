//! Timer, task and peripheral drivers.

pub mod deadline_timer;
pub mod ledc;
pub mod task_pin;
