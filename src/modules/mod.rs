//! Drivers for modules whose safety monitoring is handled here.
//!
//! These cover the monitoring side of each module only. Driving motors or setting output
//! voltages is left to the application.

mod bench_power;
mod big_motor;

pub use bench_power::BenchPowerModule;
pub use big_motor::BigMotorModule;
