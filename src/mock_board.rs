//! We use this mocking module in unit tests to emulate a Yukon board.
//!
//! Every mock peripheral shares one [`MockState`], so a test can keep a [`MockBoard`] around
//! to script analog channels, drive switches and inspect what the supervisor did.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin, StatefulOutputPin};

use crate::{
    board::{Board, BoardParts, Switch},
    conversion::{VOLTAGE_IN_CALIBRATION, VOLTAGE_OUT_CALIBRATION, VoltageCalibration},
    hal::{AnalogInput, Clock, ExpanderPort, FlexPin, Instant},
    mux::{
        ADC_REFERENCE, AnalogMux, CURRENT_SENSE_ADDR, MuxLines, TEMP_SENSE_ADDR,
        VOLTAGE_IN_SENSE_ADDR, VOLTAGE_OUT_SENSE_ADDR,
    },
    signature::{AdcLevel, Signature},
    slot::{NUM_SLOTS, SlotId, SlotPins},
};

const MAIN_EN: usize = 0;
const LEDS: usize = 1;
const SWITCHES: usize = 3;
const BOOT: usize = 5;
const SLOT_PINS: usize = 6;
const PINS_PER_SLOT: usize = 7;
const NUM_PINS: usize = SLOT_PINS + NUM_SLOTS * PINS_PER_SLOT;

/// Offsets of the slow pins within a slot's pins.
const SLOW1: usize = 4;
const SLOW2: usize = 5;
const SLOW3: usize = 6;

/// State of a single emulated pin.
#[derive(Debug, Clone, Copy)]
struct PinState {
    /// Level the outside world drives onto the pin.
    external: bool,
    /// Level the pin drives when it is an output.
    driven: bool,
    is_output: bool,
}

impl PinState {
    fn level(&self) -> bool {
        if self.is_output {
            self.driven
        } else {
            self.external
        }
    }
}

impl Default for PinState {
    fn default() -> Self {
        // Everything on the board has a pull-up.
        Self {
            external: true,
            driven: false,
            is_output: false,
        }
    }
}

/// State shared by all the mock peripherals of one board.
pub struct MockState {
    pins: [PinState; NUM_PINS],
    /// Current state of the expander outputs.
    expander_state: u16,
    /// Every `(mask, state)` pair written to the expander.
    expander_writes: Vec<(u16, u16)>,
    /// Flag to simulate expander write errors
    should_error_on_expander: bool,
    /// Flag to simulate pin errors
    should_error_on_pins: bool,
    /// Raw value each mux channel reads when nothing is scripted.
    channels: [u16; 16],
    /// Raw values to return before falling back to `channels`, per channel.
    scripts: [VecDeque<u16>; 16],
    /// Keep the output channel live even when the main output is off.
    output_held: bool,
    /// Current time in microseconds.
    now_us: u64,
    /// How far time moves on every read of the clock.
    step_us: u64,
    /// Number of ADC samples taken, per channel.
    samples: [usize; 16],
}

impl MockState {
    fn new() -> Self {
        let mut channels = [0; 16];
        // Nothing fitted: ADC1 floats mid-rail and ADC2 is pulled up.
        for id in SlotId::ALL {
            let slot = id.slot();
            channels[slot.adc1_addr as usize] = 32768;
            channels[slot.adc2_therm_addr as usize] = 65535;
        }

        Self {
            pins: [PinState::default(); NUM_PINS],
            expander_state: 0,
            expander_writes: Vec::new(),
            should_error_on_expander: false,
            should_error_on_pins: false,
            channels,
            scripts: Default::default(),
            output_held: false,
            now_us: 0,
            step_us: 1000,
            samples: [0; 16],
        }
    }

    /// Decode which channel the expander currently connects to the ADC.
    fn selected_channel(&self) -> Option<u8> {
        let lines = MuxLines::default();
        let high = |line: u8| self.expander_state & (1 << line) != 0;

        let bank = match (high(lines.enables[0]), high(lines.enables[1])) {
            (false, true) => 0,
            (true, false) => 8,
            _ => return None,
        };
        let line = lines
            .addresses
            .iter()
            .enumerate()
            .filter(|(_, line)| high(**line))
            .fold(0, |address, (index, _)| address | (1 << index));
        Some(bank + line)
    }

    fn sample(&mut self) -> u16 {
        let Some(channel) = self.selected_channel() else {
            return 0;
        };
        let channel = channel as usize;
        self.samples[channel] += 1;

        let value = self.scripts[channel]
            .pop_front()
            .unwrap_or(self.channels[channel]);
        if channel == VOLTAGE_OUT_SENSE_ADDR as usize
            && !self.pins[MAIN_EN].driven
            && !self.output_held
        {
            0
        } else {
            value
        }
    }
}

/// Handle to an emulated board. Cloning it gives another handle to the same board.
#[derive(Clone)]
pub struct MockBoard {
    state: Rc<RefCell<MockState>>,
}

impl Board for MockBoard {
    type Pin = MockPin;
    type MainEnable = MockPin;
    type Switch = MockPin;
    type Led = MockPin;
    type Expander = MockExpander;
    type Adc = MockAdc;
    type Clock = MockClock;
}

impl MockBoard {
    pub fn new() -> Self {
        let board = Self {
            state: Rc::new(RefCell::new(MockState::new())),
        };
        board.set_input_voltage(12.0);
        board.set_output_voltage(12.0);
        board.set_current(0.5);
        board.set_temperature(25.0);
        board
    }

    fn pin(&self, index: usize) -> MockPin {
        MockPin {
            state: self.state.clone(),
            index,
        }
    }

    fn slot_pin_index(slot: SlotId, offset: usize) -> usize {
        SLOT_PINS + slot.index() * PINS_PER_SLOT + offset
    }

    /// Assemble the parts of a board handle, all wired to this board.
    pub fn parts(&self) -> BoardParts<MockBoard> {
        let slots = SlotId::ALL.map(|slot| SlotPins {
            fast1: self.pin(Self::slot_pin_index(slot, 0)),
            fast2: self.pin(Self::slot_pin_index(slot, 1)),
            fast3: self.pin(Self::slot_pin_index(slot, 2)),
            fast4: self.pin(Self::slot_pin_index(slot, 3)),
            slow1: self.pin(Self::slot_pin_index(slot, SLOW1)),
            slow2: self.pin(Self::slot_pin_index(slot, SLOW2)),
            slow3: self.pin(Self::slot_pin_index(slot, SLOW3)),
        });

        let main_en = self.pin(MAIN_EN);
        self.state.borrow_mut().pins[MAIN_EN].is_output = true;
        let leds = [self.pin(LEDS), self.pin(LEDS + 1)];
        for index in [LEDS, LEDS + 1] {
            self.state.borrow_mut().pins[index].is_output = true;
        }

        BoardParts {
            main_en,
            expander: MockExpander {
                state: self.state.clone(),
            },
            mux_lines: MuxLines::default(),
            adc: MockAdc {
                state: self.state.clone(),
            },
            slots,
            switches: [self.pin(SWITCHES), self.pin(SWITCHES + 1)],
            boot: self.pin(BOOT),
            leds,
            clock: MockClock {
                state: self.state.clone(),
            },
        }
    }

    /// A standalone mux wired to this board.
    pub fn mux(&self) -> AnalogMux<MockExpander, MockAdc> {
        let parts = self.parts();
        AnalogMux::new(parts.expander, parts.adc, parts.mux_lines)
    }

    pub fn expander_writes(&self) -> Vec<(u16, u16)> {
        self.state.borrow().expander_writes.clone()
    }

    pub fn fail_expander(&self, fail: bool) {
        self.state.borrow_mut().should_error_on_expander = fail;
    }

    pub fn fail_pins(&self, fail: bool) {
        self.state.borrow_mut().should_error_on_pins = fail;
    }

    /// Whether the main output enable is being driven high.
    pub fn main_enable(&self) -> bool {
        self.state.borrow().pins[MAIN_EN].driven
    }

    pub fn set_main_enable(&self, on: bool) {
        self.state.borrow_mut().pins[MAIN_EN].driven = on;
    }

    pub fn set_led_state(&self, led: Switch, on: bool) {
        let index = LEDS + led as usize;
        self.state.borrow_mut().pins[index].driven = on;
    }

    pub fn set_switch(&self, switch: Switch, pressed: bool) {
        let index = SWITCHES + switch as usize;
        self.state.borrow_mut().pins[index].external = !pressed;
    }

    pub fn set_boot(&self, pressed: bool) {
        self.state.borrow_mut().pins[BOOT].external = !pressed;
    }

    pub fn set_channel_raw(&self, channel: u8, raw: u16) {
        self.state.borrow_mut().channels[channel as usize] = raw;
    }

    /// Queue raw values to be read from a channel, one per sample, ahead of its fixed value.
    pub fn script_channel(&self, channel: u8, raw: impl IntoIterator<Item = u16>) {
        self.state.borrow_mut().scripts[channel as usize].extend(raw);
    }

    pub fn samples_taken(&self, channel: u8) -> usize {
        self.state.borrow().samples[channel as usize]
    }

    pub fn set_input_voltage(&self, volts: f32) {
        self.set_channel_raw(VOLTAGE_IN_SENSE_ADDR, raw_for_volts(&VOLTAGE_IN_CALIBRATION, volts));
    }

    /// Set what the output reads whilst the main output is on.
    pub fn set_output_voltage(&self, volts: f32) {
        self.set_channel_raw(
            VOLTAGE_OUT_SENSE_ADDR,
            raw_for_volts(&VOLTAGE_OUT_CALIBRATION, volts),
        );
    }

    /// Queue output voltages to be read, one per sample.
    pub fn script_output_voltage(&self, volts: impl IntoIterator<Item = f32>) {
        self.script_channel(
            VOLTAGE_OUT_SENSE_ADDR,
            volts
                .into_iter()
                .map(|v| raw_for_volts(&VOLTAGE_OUT_CALIBRATION, v)),
        );
    }

    /// Keep the output reading live whilst the main output is off, as if it was not discharging.
    pub fn hold_output(&self, held: bool) {
        self.state.borrow_mut().output_held = held;
    }

    pub fn set_current(&self, amps: f32) {
        self.set_channel_raw(CURRENT_SENSE_ADDR, raw_for_amps(amps));
    }

    /// Queue currents to be read, one per sample.
    pub fn script_current(&self, amps: impl IntoIterator<Item = f32>) {
        self.script_channel(CURRENT_SENSE_ADDR, amps.into_iter().map(raw_for_amps));
    }

    pub fn set_temperature(&self, celsius: f32) {
        self.set_channel_raw(TEMP_SENSE_ADDR, raw_for_celsius(celsius));
    }

    /// Script the input voltage, one value per sample, ahead of its fixed value.
    pub fn script_input_voltage(&self, volts: impl IntoIterator<Item = f32>) {
        self.script_channel(
            VOLTAGE_IN_SENSE_ADDR,
            volts
                .into_iter()
                .map(|v| raw_for_volts(&VOLTAGE_IN_CALIBRATION, v)),
        );
    }

    /// Make a slot read back the given signature.
    pub fn set_signature(&self, slot: SlotId, signature: Signature) {
        let level_raw = |level: AdcLevel| match level {
            AdcLevel::Low => 0,
            AdcLevel::Float => 32768,
            AdcLevel::High => 65535,
        };
        let addresses = slot.slot();
        self.set_channel_raw(addresses.adc1_addr, level_raw(signature.adc1));
        self.set_channel_raw(addresses.adc2_therm_addr, level_raw(signature.adc2));

        let mut state = self.state.borrow_mut();
        for (offset, level) in [
            (SLOW1, signature.slow1),
            (SLOW2, signature.slow2),
            (SLOW3, signature.slow3),
        ] {
            state.pins[Self::slot_pin_index(slot, offset)].external = level;
        }
    }

    /// Set the level a module drives onto one of a slot's slow pins.
    pub fn set_slow_pin(&self, slot: SlotId, pin: u8, level: bool) {
        let offset = SLOW1 + usize::from(pin - 1);
        self.state.borrow_mut().pins[Self::slot_pin_index(slot, offset)].external = level;
    }

    /// Set the level a module drives onto one of a slot's fast pins.
    pub fn set_fast_pin(&self, slot: SlotId, pin: u8, level: bool) {
        let offset = usize::from(pin - 1);
        self.state.borrow_mut().pins[Self::slot_pin_index(slot, offset)].external = level;
    }

    /// Whether a slot's slow pin is an output, and if so, what it drives.
    pub fn slow_pin_output(&self, slot: SlotId, pin: u8) -> Option<bool> {
        let offset = SLOW1 + usize::from(pin - 1);
        let state = self.state.borrow().pins[Self::slot_pin_index(slot, offset)];
        state.is_output.then_some(state.driven)
    }

    /// Set the voltage seen on a slot's ADC1 line.
    pub fn set_slot_adc1(&self, slot: SlotId, volts: f32) {
        self.set_channel_raw(slot.slot().adc1_addr, raw_for_adc_volts(volts));
    }

    /// Set the temperature of a thermistor on a slot's ADC2 line.
    pub fn set_slot_temperature(&self, slot: SlotId, celsius: f32) {
        self.set_channel_raw(slot.slot().adc2_therm_addr, raw_for_celsius(celsius));
    }

    pub fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }
}

/// Inverse of [`VoltageCalibration::to_volts`], for voltages above zero.
fn raw_for_volts(calibration: &VoltageCalibration, volts: f32) -> u16 {
    let raw = if volts >= calibration.volts_at_min {
        (volts - calibration.volts_at_min)
            * (calibration.measured_at_max - calibration.measured_at_min)
            / (calibration.volts_at_max - calibration.volts_at_min)
            + calibration.measured_at_min
    } else if volts > 0.0 {
        volts * (calibration.measured_at_min - calibration.measured_at_zero)
            / calibration.volts_at_min
            + calibration.measured_at_zero
    } else {
        0.0
    };
    raw.round().clamp(0.0, 65535.0) as u16
}

fn raw_for_amps(amps: f32) -> u16 {
    let raw = (amps - 1.0) * (14255.0 - 1015.0) / 14.0 + 1015.0;
    raw.round().clamp(0.0, 65535.0) as u16
}

fn raw_for_adc_volts(volts: f32) -> u16 {
    (volts / ADC_REFERENCE * 65535.0).round().clamp(0.0, 65535.0) as u16
}

/// Voltage across a 10k B3435 thermistor under a 5.1k pull-up, at the given temperature.
fn raw_for_celsius(celsius: f32) -> u16 {
    let kelvin = celsius + 273.15;
    let resistance = 10000.0 * (3435.0 * (1.0 / kelvin - 1.0 / 298.15)).exp();
    raw_for_adc_volts(ADC_REFERENCE * resistance / (resistance + 5100.0))
}

#[derive(Debug)]
pub struct MockPinError;

impl digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Our mock type used to emulate any of the board's GPIO pins.
pub struct MockPin {
    state: Rc<RefCell<MockState>>,
    index: usize,
}

impl MockPin {
    fn with_pin<T>(&mut self, f: impl FnOnce(&mut PinState) -> T) -> Result<T, MockPinError> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_pins {
            return Err(MockPinError);
        }
        Ok(f(&mut state.pins[self.index]))
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.with_pin(|pin| pin.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.with_pin(|pin| !pin.level())
    }
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.with_pin(|pin| pin.driven = false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.with_pin(|pin| pin.driven = true)
    }
}

impl StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        self.with_pin(|pin| pin.driven)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.with_pin(|pin| !pin.driven)
    }
}

impl FlexPin for MockPin {
    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        self.with_pin(|pin| pin.is_output = false)
    }

    fn set_as_output(&mut self, high: bool) -> Result<(), Self::Error> {
        self.with_pin(|pin| {
            pin.is_output = true;
            pin.driven = high;
        })
    }
}

/// Our mock type used to emulate the I/O expander.
pub struct MockExpander {
    state: Rc<RefCell<MockState>>,
}

impl ErrorType for MockExpander {
    type Error = MockPinError;
}

impl ExpanderPort for MockExpander {
    fn change_output_mask(&mut self, mask: u16, state: u16) -> Result<(), Self::Error> {
        let mut board = self.state.borrow_mut();
        if board.should_error_on_expander {
            return Err(MockPinError);
        }
        board.expander_state = (board.expander_state & !mask) | (state & mask);
        board.expander_writes.push((mask, state));
        Ok(())
    }
}

/// Our mock type used to emulate the shared ADC.
pub struct MockAdc {
    state: Rc<RefCell<MockState>>,
}

impl AnalogInput for MockAdc {
    fn read_u16(&mut self) -> u16 {
        self.state.borrow_mut().sample()
    }
}

/// Our mock type used to emulate the monotonic timer. Time steps forward on every read.
pub struct MockClock {
    state: Rc<RefCell<MockState>>,
}

impl Clock for MockClock {
    fn now(&mut self) -> Instant {
        let mut state = self.state.borrow_mut();
        let now = state.now_us;
        state.now_us += state.step_us;
        Instant::from_ticks(now)
    }
}
