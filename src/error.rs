//! Our error types for the Yukon supervisor.
//!
//! The safety faults ([`Error::OverVoltage`], [`Error::UnderVoltage`], [`Error::OverCurrent`],
//! [`Error::OverTemperature`] and [`Error::Fault`]) are never retried by the supervisor.
//! By the time one reaches the caller the main output has already been turned off.

use core::fmt;

use embedded_hal::digital::ErrorKind;
use thiserror::Error;

use crate::{
    registry::ModuleType,
    slot::{NUM_SLOTS, SlotId},
};

pub type Result<T> = core::result::Result<T, Error>;

/// A list of slots, as carried by verification failures.
pub type SlotList = heapless::Vec<SlotId, NUM_SLOTS>;

/// The part of the system that raised a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The Yukon board itself.
    Board,
    /// A module driver registered with a slot.
    Slot(SlotId, ModuleType),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Board => write!(f, "[Yukon]"),
            Origin::Slot(slot, module) => write!(f, "[{slot} '{module}']"),
        }
    }
}

/// Which of the board's voltage sense points a voltage fault refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoltageSense {
    Input,
    Output,
}

impl fmt::Display for VoltageSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoltageSense::Input => write!(f, "Input"),
            VoltageSense::Output => write!(f, "Output"),
        }
    }
}

/// Causes of a [`Error::Fault`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaultReason {
    /// The output collapsed whilst the input was healthy.
    ShortCircuit { output: f32, input: f32 },
    /// The output voltage never settled after the rail was enabled.
    DidNotStabilise,
    /// The output voltage stayed too high for module detection.
    DidNotDissipate,
    /// A module's driver chip reported a fault.
    DriverFault,
    /// A module's regulator reported that its power is not good.
    PowerNotGood,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultReason::ShortCircuit { output, input } => write!(
                f,
                "Possible short circuit! Output voltage was {output}V whilst the input voltage was {input}V"
            ),
            FaultReason::DidNotStabilise => {
                write!(f, "Output voltage did not stabilise in an acceptable time")
            }
            FaultReason::DidNotDissipate => {
                write!(f, "Output voltage did not dissipate in an acceptable time")
            }
            FaultReason::DriverFault => write!(f, "Fault detected on driver"),
            FaultReason::PowerNotGood => write!(f, "Power is not good"),
        }
    }
}

/// Raised by module verification, before the main output is ever enabled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error(
        "No modules have been registered. At least one module needs to be registered to enable the output"
    )]
    NoModules,
    #[error("Detected a different module than the one registered in {0:?}")]
    Discrepancy(SlotList),
    #[error("Registered modules were not detected in {0:?}")]
    Undetected(SlotList),
    #[error("Detected modules that have not been registered in {0:?}")]
    Unregistered(SlotList),
}

/// Custom error type for the Yukon supervisor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{origin} {sense} voltage of {measured}V exceeded the limit of {limit}V")]
    OverVoltage {
        origin: Origin,
        sense: VoltageSense,
        measured: f32,
        limit: f32,
    },
    #[error("{origin} {sense} voltage of {measured}V below the minimum of {limit}V")]
    UnderVoltage {
        origin: Origin,
        sense: VoltageSense,
        measured: f32,
        limit: f32,
    },
    #[error("{origin} Current of {measured}A exceeded the limit of {limit}A")]
    OverCurrent {
        origin: Origin,
        measured: f32,
        limit: f32,
    },
    #[error("{origin} Temperature of {measured}°C exceeded the limit of {limit}°C")]
    OverTemperature {
        origin: Origin,
        measured: f32,
        limit: f32,
    },
    #[error("{origin} {reason}")]
    Fault { origin: Origin, reason: FaultReason },
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("Cannot {0} whilst the main output is active")]
    OutputEnabled(&'static str),
    #[error("{0} is already populated")]
    SlotOccupied(SlotId),
    #[error("Modules of unknown type cannot be registered")]
    UnregistrableModule,
    #[error("Slot index {0} out of range. Expected 1 to 6")]
    InvalidSlot(u8),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("Duration must be greater than zero")]
    InvalidDuration,
    #[error("Pin error: {0:?}")]
    Pin(ErrorKind),
    #[error("Failed to write readings report")]
    Report,
}

impl Error {
    /// Collapse a pin error down to its kind.
    pub(crate) fn pin<E: embedded_hal::digital::Error>(err: E) -> Self {
        Error::Pin(err.kind())
    }

    /// Whether this is one of the electrical safety faults.
    pub fn is_safety_fault(&self) -> bool {
        matches!(
            self,
            Error::OverVoltage { .. }
                | Error::UnderVoltage { .. }
                | Error::OverCurrent { .. }
                | Error::OverTemperature { .. }
                | Error::Fault { .. }
        )
    }

    /// The part of the system that raised a safety fault, if this is one.
    pub fn origin(&self) -> Option<Origin> {
        match self {
            Error::OverVoltage { origin, .. }
            | Error::UnderVoltage { origin, .. }
            | Error::OverCurrent { origin, .. }
            | Error::OverTemperature { origin, .. }
            | Error::Fault { origin, .. } => Some(*origin),
            _ => None,
        }
    }
}
