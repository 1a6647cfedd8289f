//! The board handle: every pin and peripheral the supervisor drives, owned in one place.

use embedded_hal::digital::{InputPin, OutputPin, StatefulOutputPin};

use crate::{
    conversion::{analog_to_temp, u16_to_current, u16_to_voltage_in, u16_to_voltage_out},
    driver::SlotContext,
    error::{Error, Result},
    hal::{AnalogInput, Clock, ExpanderPort, FlexPin, Instant},
    mux::{
        AnalogMux, CURRENT_SENSE_ADDR, ChannelReader, MuxLines, TEMP_SENSE_ADDR,
        VOLTAGE_IN_SENSE_ADDR, VOLTAGE_OUT_SENSE_ADDR,
    },
    slot::{NUM_SLOTS, SlotId, SlotPins},
};

/// The concrete peripheral types of a board.
pub trait Board {
    /// Slot signal pins.
    type Pin: FlexPin;
    /// Enable of the main output rail. High turns the rail on.
    type MainEnable: StatefulOutputPin;
    /// User and boot switches. All are active low.
    type Switch: InputPin;
    type Led: StatefulOutputPin;
    type Expander: ExpanderPort;
    type Adc: AnalogInput;
    type Clock: Clock;
}

/// One of the two user switches, and the LED beside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    A,
    B,
}

impl Switch {
    const fn index(self) -> usize {
        match self {
            Switch::A => 0,
            Switch::B => 1,
        }
    }
}

/// The parts a [`BoardHandle`] is assembled from.
pub struct BoardParts<B: Board> {
    pub main_en: B::MainEnable,
    pub expander: B::Expander,
    pub mux_lines: MuxLines,
    pub adc: B::Adc,
    /// Indexed by slot, so `slots[0]` belongs to slot 1.
    pub slots: [SlotPins<B::Pin>; NUM_SLOTS],
    pub switches: [B::Switch; 2],
    pub boot: B::Switch,
    pub leds: [B::Led; 2],
    pub clock: B::Clock,
}

pub struct BoardHandle<B: Board> {
    main_en: B::MainEnable,
    mux: AnalogMux<B::Expander, B::Adc>,
    slots: [SlotPins<B::Pin>; NUM_SLOTS],
    switches: [B::Switch; 2],
    boot: B::Switch,
    leds: [B::Led; 2],
    clock: B::Clock,
}

impl<B: Board> BoardHandle<B> {
    /// Take ownership of the board, putting it into a safe state.
    ///
    /// The main output is turned off, the LEDs are turned off and the mux is deselected.
    pub fn new(parts: BoardParts<B>) -> Result<Self> {
        let BoardParts {
            main_en,
            expander,
            mux_lines,
            adc,
            slots,
            switches,
            boot,
            leds,
            clock,
        } = parts;

        let mut handle = Self {
            main_en,
            mux: AnalogMux::new(expander, adc, mux_lines),
            slots,
            switches,
            boot,
            leds,
            clock,
        };

        handle.set_main_output(false)?;
        for led in [Switch::A, Switch::B] {
            handle.set_led(led, false)?;
        }
        handle.mux.deselect()?;
        Ok(handle)
    }

    pub fn now(&mut self) -> Instant {
        self.clock.now()
    }

    pub(crate) fn set_main_output(&mut self, on: bool) -> Result<()> {
        if on {
            self.main_en.set_high().map_err(Error::pin)
        } else {
            self.main_en.set_low().map_err(Error::pin)
        }
    }

    /// Whether the main output enable is currently driven high.
    pub fn is_main_output_set(&mut self) -> Result<bool> {
        self.main_en.is_set_high().map_err(Error::pin)
    }

    pub fn mux(&mut self) -> &mut AnalogMux<B::Expander, B::Adc> {
        &mut self.mux
    }

    pub fn slot_pins(&mut self, slot: SlotId) -> &mut SlotPins<B::Pin> {
        &mut self.slots[slot.index()]
    }

    /// Hand out a slot's pins and ADC channels together.
    pub fn slot_context(&mut self, slot: SlotId) -> SlotContext<'_, B::Pin> {
        SlotContext::new(slot.slot(), &mut self.slots[slot.index()], &mut self.mux)
    }

    pub fn read_input_voltage(&mut self, samples: u16) -> Result<f32> {
        Ok(u16_to_voltage_in(self.mux.read_raw(VOLTAGE_IN_SENSE_ADDR, samples)?))
    }

    pub fn read_output_voltage(&mut self, samples: u16) -> Result<f32> {
        Ok(u16_to_voltage_out(self.mux.read_raw(VOLTAGE_OUT_SENSE_ADDR, samples)?))
    }

    pub fn read_current(&mut self, samples: u16) -> Result<f32> {
        Ok(u16_to_current(self.mux.read_raw(CURRENT_SENSE_ADDR, samples)?))
    }

    /// Board temperature in °C.
    pub fn read_temperature(&mut self, samples: u16) -> Result<f32> {
        Ok(analog_to_temp(self.mux.read_voltage(TEMP_SENSE_ADDR, samples)?))
    }

    pub fn is_pressed(&mut self, switch: Switch) -> Result<bool> {
        self.switches[switch.index()].is_low().map_err(Error::pin)
    }

    pub fn is_boot_pressed(&mut self) -> Result<bool> {
        self.boot.is_low().map_err(Error::pin)
    }

    pub fn set_led(&mut self, led: Switch, on: bool) -> Result<()> {
        let led = &mut self.leds[led.index()];
        if on {
            led.set_high().map_err(Error::pin)
        } else {
            led.set_low().map_err(Error::pin)
        }
    }

    pub fn is_led_on(&mut self, led: Switch) -> Result<bool> {
        self.leds[led.index()].is_set_high().map_err(Error::pin)
    }
}
