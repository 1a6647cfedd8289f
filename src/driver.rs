//! The contract between the supervisor and the driver of each fitted module.

use crate::{
    conversion::analog_to_temp,
    error::{Origin, Result},
    hal::FlexPin,
    mux::ChannelReader,
    readings::Readings,
    registry::ModuleType,
    slot::{Slot, SlotPins},
};

/// Access to a slot's two mux channels, and nothing else.
pub struct SlotAdc<'a> {
    slot: Slot,
    mux: &'a mut dyn ChannelReader,
}

impl<'a> SlotAdc<'a> {
    pub fn new(slot: Slot, mux: &'a mut dyn ChannelReader) -> Self {
        Self { slot, mux }
    }

    /// Average voltage of the slot's ADC1 line.
    pub fn read_adc1(&mut self, samples: u16) -> Result<f32> {
        self.mux.read_voltage(self.slot.adc1_addr, samples)
    }

    /// Average voltage of the slot's ADC2 line.
    pub fn read_adc2(&mut self, samples: u16) -> Result<f32> {
        self.mux.read_voltage(self.slot.adc2_therm_addr, samples)
    }

    /// Temperature in °C of a thermistor fitted to the slot's ADC2 line.
    pub fn read_adc2_as_temp(&mut self, samples: u16) -> Result<f32> {
        Ok(analog_to_temp(self.read_adc2(samples)?))
    }
}

/// Everything a module driver may touch while handling a call from the supervisor.
pub struct SlotContext<'a, P> {
    pub slot: Slot,
    pub pins: &'a mut SlotPins<P>,
    pub adc: SlotAdc<'a>,
}

impl<'a, P> SlotContext<'a, P> {
    pub fn new(slot: Slot, pins: &'a mut SlotPins<P>, mux: &'a mut dyn ChannelReader) -> Self {
        Self {
            slot,
            pins,
            adc: SlotAdc::new(slot, mux),
        }
    }

    /// Where a fault raised by a module of the given type in this slot comes from.
    pub fn origin(&self, module: ModuleType) -> Origin {
        Origin::Slot(self.slot.id, module)
    }
}

/// Implemented by the driver of each kind of module.
///
/// The supervisor only ever calls these methods whilst it holds the board, handing the driver
/// a [`SlotContext`] for the slot it is registered with.
pub trait ModuleDriver<P: FlexPin> {
    /// The kind of module this driver is for.
    fn module_type(&self) -> ModuleType;

    /// Take ownership of the slot's pins and bring the module to a known state.
    fn initialise(&mut self, _ctx: &mut SlotContext<'_, P>) -> Result<()> {
        Ok(())
    }

    /// Return the module to its power-on state.
    fn reset(&mut self, _ctx: &mut SlotContext<'_, P>) -> Result<()> {
        Ok(())
    }

    /// Check the module's own limits. Called once per monitor tick while the output is on.
    ///
    /// Any error returned causes the main output to be turned off.
    fn monitor(&mut self, _ctx: &mut SlotContext<'_, P>) -> Result<()> {
        Ok(())
    }

    /// Readings gathered by [`Self::monitor`].
    fn get_readings(&self) -> Readings {
        Readings::new()
    }

    fn clear_readings(&mut self) {}

    /// Post-process readings at the end of a monitoring period, e.g. computing averages.
    fn process_readings(&mut self) {}
}
