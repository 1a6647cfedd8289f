//! This crate supervises a Yukon modular power-distribution and expansion board.
//!
//! A Yukon has six slots for add-on modules, a switchable main output shared by all of them and
//! a single analog mux through which every measurement is taken. The supervisor:
//! * identifies the module fitted to each slot from its signature and checks it against the
//!   driver registered for that slot,
//! * sequences the main output on, waiting for it to settle, and off again,
//! * monitors input voltage, output voltage, current and temperature while the output is on,
//!   turning it off at the first fault, along with each module's own checks,
//! * gathers min/max/average readings over each monitoring period.
//!
//! Hardware is reached through `embedded-hal` pins plus the small traits in [`hal`]. Implement
//! [`board::Board`] for your target, assemble a [`board::BoardParts`] and hand the resulting
//! [`board::BoardHandle`] to [`Yukon::new`].
//!
//! The board's electrical limits:
//! * Input: 4.8V to 17.2V by default, configurable up to 18V
//! * Current: 20A by default
//! * Temperature: 80°C by default
//!
//! Logging goes through `tracing`. [`LogLevel`] converts to a `tracing` level filter for use
//! when installing a subscriber.

pub mod board;
pub mod config;
pub mod conversion;
pub mod driver;
pub mod error;
pub mod hal;
pub mod modules;
pub mod mux;
pub mod readings;
pub mod registry;
pub mod signature;
pub mod slot;
pub mod timing;
mod yukon;

#[cfg(test)]
mod mock_board;

pub use config::{LogLevel, YukonConfig};
pub use driver::{ModuleDriver, SlotContext};
pub use error::{Error, Result};
pub use registry::ModuleType;
pub use slot::SlotId;
pub use yukon::{MonitorAction, RailState, SlotAllowance, Yukon};
