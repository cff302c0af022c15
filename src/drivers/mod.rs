//! Sensor input drivers and hardware initialisation.

pub mod hw_init;
pub mod sim_timer;
