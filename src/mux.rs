//! Driver for the pair of 8 channel analog multiplexers in front of the shared ADC.
//!
//! The two muxes share three address lines and each has its own active-low enable. Bit 3 of a
//! channel address picks which mux is enabled. All five lines sit on the I/O expander and are
//! always written together, so the bus never shows a half-changed address.

use modular_bitfield::prelude::*;

use crate::{
    error::{Error, Result},
    hal::{AnalogInput, ExpanderPort},
};

/// Highest valid channel address.
pub const MAX_ADDRESS: u8 = 0b1111;

/// Board level sense channels. The remaining twelve belong to the slots.
pub const CURRENT_SENSE_ADDR: u8 = 12;
pub const TEMP_SENSE_ADDR: u8 = 13;
pub const VOLTAGE_OUT_SENSE_ADDR: u8 = 14;
pub const VOLTAGE_IN_SENSE_ADDR: u8 = 15;

/// Full scale of the shared ADC, in volts.
pub const ADC_REFERENCE: f32 = 3.3;

/// Layout of a channel address.
#[bitfield(bits = 8)]
#[derive(Debug, Clone, Copy)]
pub struct MuxAddress {
    /// Value placed on the shared address lines.
    pub line: B3,
    /// `false` enables the first mux, `true` the second.
    pub bank: bool,
    #[skip]
    __: B4,
}

/// Which I/O expander outputs the mux lines are wired to, as bit positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxLines {
    /// Active-low enables of the first and second mux.
    pub enables: [u8; 2],
    /// Address lines, least significant first.
    pub addresses: [u8; 3],
}

impl Default for MuxLines {
    fn default() -> Self {
        Self {
            enables: [3, 4],
            addresses: [0, 1, 2],
        }
    }
}

impl MuxLines {
    const fn bit(line: u8) -> u16 {
        1 << line
    }

    /// Every expander output driven by the mux.
    pub fn mask(&self) -> u16 {
        self.enables
            .iter()
            .chain(self.addresses.iter())
            .fold(0, |mask, &line| mask | Self::bit(line))
    }

    /// Expander state that connects `address` to the ADC.
    ///
    /// # Panics
    ///
    /// If `address` is greater than [`MAX_ADDRESS`].
    pub fn select_state(&self, address: u8) -> u16 {
        assert!(
            address <= MAX_ADDRESS,
            "mux address {address} is greater than the number of available addresses"
        );
        let decoded = MuxAddress::from_bytes([address]);

        let mut state = self
            .addresses
            .iter()
            .enumerate()
            .filter(|(index, _)| decoded.line() & (1 << index) != 0)
            .fold(0, |state, (_, &line)| state | Self::bit(line));

        // The enables are active low, so the mux not being selected has its enable held high.
        state |= if decoded.bank() {
            Self::bit(self.enables[0])
        } else {
            Self::bit(self.enables[1])
        };
        state
    }

    /// Expander state with both muxes disabled and the address lines at zero.
    pub fn deselect_state(&self) -> u16 {
        Self::bit(self.enables[0]) | Self::bit(self.enables[1])
    }
}

/// Convert an averaged raw sample to volts at the ADC pin.
pub fn adc_to_voltage(raw: f32) -> f32 {
    (raw * ADC_REFERENCE) / 65535.0
}

/// Read access to the mux channels, as handed to module drivers.
pub trait ChannelReader {
    /// Average `samples` raw readings of a channel.
    fn read_raw(&mut self, address: u8, samples: u16) -> Result<f32>;

    /// Average `samples` readings of a channel, in volts.
    fn read_voltage(&mut self, address: u8, samples: u16) -> Result<f32> {
        Ok(adc_to_voltage(self.read_raw(address, samples)?))
    }
}

/// The analog mux and the ADC behind it.
pub struct AnalogMux<E, A> {
    expander: E,
    adc: A,
    lines: MuxLines,
    selected: Option<u8>,
}

impl<E: ExpanderPort, A: AnalogInput> AnalogMux<E, A> {
    pub fn new(expander: E, adc: A, lines: MuxLines) -> Self {
        Self {
            expander,
            adc,
            lines,
            selected: None,
        }
    }

    /// Connect a channel to the ADC.
    ///
    /// # Panics
    ///
    /// If `address` is greater than [`MAX_ADDRESS`].
    pub fn select(&mut self, address: u8) -> Result<()> {
        let state = self.lines.select_state(address);
        self.expander
            .change_output_mask(self.lines.mask(), state)
            .map_err(Error::pin)?;
        self.selected = Some(address);
        Ok(())
    }

    /// Disconnect all channels from the ADC.
    pub fn deselect(&mut self) -> Result<()> {
        self.expander
            .change_output_mask(self.lines.mask(), self.lines.deselect_state())
            .map_err(Error::pin)?;
        self.selected = None;
        Ok(())
    }

    /// The channel currently connected, if any.
    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    /// Average `samples` raw readings of a channel, rounded down.
    pub fn read_u16(&mut self, address: u8, samples: u16) -> Result<u16> {
        Ok(self.read_raw(address, samples)? as u16)
    }

    fn sample(&mut self, samples: u16) -> f32 {
        let samples = samples.max(1);
        let total: u32 = (0..samples).map(|_| u32::from(self.adc.read_u16())).sum();
        total as f32 / f32::from(samples)
    }
}

impl<E: ExpanderPort, A: AnalogInput> ChannelReader for AnalogMux<E, A> {
    fn read_raw(&mut self, address: u8, samples: u16) -> Result<f32> {
        self.select(address)?;
        let value = self.sample(samples);
        self.deselect()?;
        Ok(value)
    }
}
