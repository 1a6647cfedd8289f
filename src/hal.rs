//! Hardware traits the supervisor is written against.
//!
//! Pins use the `embedded-hal` digital traits directly. The I/O expander, the shared ADC and
//! the monotonic timer have no `embedded-hal` 1.0 equivalent, so they get small traits of
//! their own here.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// A point on the supervisor's monotonic timeline, in microseconds.
pub type Instant = fugit::TimerInstantU64<1_000_000>;
/// A span of time on the supervisor's monotonic timeline.
pub type Duration = fugit::TimerDurationU64<1_000_000>;

/// A monotonic time source.
pub trait Clock {
    fn now(&mut self) -> Instant;
}

/// The board's single shared ADC input, sat behind the analog mux.
pub trait AnalogInput {
    /// Take one sample, scaled to the full `u16` range.
    fn read_u16(&mut self) -> u16;
}

/// The output side of an I/O expander.
pub trait ExpanderPort: ErrorType {
    /// Set every output in `mask` to the matching bit of `state`, in a single bus transaction.
    ///
    /// Outputs outside of `mask` must be left untouched.
    fn change_output_mask(&mut self, mask: u16, state: u16) -> Result<(), Self::Error>;
}

/// A pin that can be switched between input and output at runtime.
///
/// Slot pins need this, as module detection reads them as inputs before a driver may go on to
/// use them as outputs.
pub trait FlexPin: InputPin + OutputPin {
    fn set_as_input(&mut self) -> Result<(), Self::Error>;
    fn set_as_output(&mut self, high: bool) -> Result<(), Self::Error>;
}
