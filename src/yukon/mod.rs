//! The Yukon supervisor.
//!
//! [`Yukon`] owns the board, the modules registered with its slots and the state of the main
//! output. Its methods are split by concern:
//! * `slots` - registration, detection and verification of modules.
//! * `power` - sequencing the main output on and off.
//! * `monitor` - the safety checks run while the output is on.

mod monitor;
mod power;
mod slots;

use core::fmt;

pub use slots::SlotAllowance;

use crate::{
    board::{Board, BoardHandle, Switch},
    config::{LogLevel, YukonConfig},
    driver::ModuleDriver,
    error::{Error, Result},
    hal::{FlexPin, Instant},
    readings::{BoardReadings, MonitorSample, Readings, ReadingsFilter, format_section},
    registry::ModuleType,
    slot::{NUM_SLOTS, SlotId},
};

/// State of the main output rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailState {
    Disabled,
    /// Enabled, but the output voltage has not yet settled.
    Enabling,
    Stable,
}

/// A slot's registered module, if any.
struct Assignment<'m, P: FlexPin> {
    module: Option<&'m mut dyn ModuleDriver<P>>,
    initialised: bool,
}

impl<P: FlexPin> Assignment<'_, P> {
    fn empty() -> Self {
        Self {
            module: None,
            initialised: false,
        }
    }
}

/// Called with each tick's board measurements, after the board level checks pass.
pub type MonitorAction<'m> = &'m mut dyn FnMut(&MonitorSample);

/// Supervisor of a Yukon board and the modules fitted to it.
///
/// Modules are borrowed for the lifetime `'m`, and handed back by
/// [`deregister_slot`](Yukon::deregister_slot).
pub struct Yukon<'m, B: Board> {
    board: BoardHandle<B>,
    config: YukonConfig,
    assignments: [Assignment<'m, B::Pin>; NUM_SLOTS],
    rail: RailState,
    readings: BoardReadings,
    under_voltage_count: u8,
    monitor_action: Option<MonitorAction<'m>>,
}

impl<'m, B: Board> Yukon<'m, B> {
    pub fn new(board: BoardHandle<B>, config: YukonConfig) -> Self {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            voltage_limit = config.voltage_limit(),
            current_limit = config.current_limit(),
            temperature_limit = config.temperature_limit(),
            "Yukon supervisor ready"
        );

        Self {
            board,
            config,
            assignments: core::array::from_fn(|_| Assignment::empty()),
            rail: RailState::Disabled,
            readings: BoardReadings::default(),
            under_voltage_count: 0,
            monitor_action: None,
        }
    }

    pub fn config(&self) -> &YukonConfig {
        &self.config
    }

    pub fn rail_state(&self) -> RailState {
        self.rail
    }

    pub fn now(&mut self) -> Instant {
        self.board.now()
    }

    /// Return everything to its power-on state.
    ///
    /// Turns the main output off, deselects the mux, turns the LEDs off and resets every
    /// initialised module.
    pub fn reset(&mut self) -> Result<()> {
        tracing::debug!("[Yukon] Resetting");

        if self.is_main_output_enabled() {
            self.disable_main_output()?;
        }
        self.board.mux().deselect()?;
        self.board.set_led(Switch::A, false)?;
        self.board.set_led(Switch::B, false)?;

        for (slot, assignment) in SlotId::ALL.into_iter().zip(self.assignments.iter_mut()) {
            if let (Some(module), true) = (&mut assignment.module, assignment.initialised) {
                module.reset(&mut self.board.slot_context(slot))?;
            }
        }
        Ok(())
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.config.set_log_level(level);
    }

    /// Run `action` on every tick that passes the board level checks.
    pub fn assign_monitor_action(&mut self, action: Option<MonitorAction<'m>>) {
        self.monitor_action = action;
    }

    pub fn is_pressed(&mut self, switch: Switch) -> Result<bool> {
        self.board.is_pressed(switch)
    }

    pub fn is_boot_pressed(&mut self) -> Result<bool> {
        self.board.is_boot_pressed()
    }

    pub fn set_led(&mut self, led: Switch, on: bool) -> Result<()> {
        self.board.set_led(led, on)
    }

    pub fn is_led_on(&mut self, led: Switch) -> Result<bool> {
        self.board.is_led_on(led)
    }

    pub fn read_input_voltage(&mut self) -> Result<f32> {
        self.board.read_input_voltage(self.config.monitor_samples())
    }

    pub fn read_output_voltage(&mut self) -> Result<f32> {
        self.board.read_output_voltage(self.config.monitor_samples())
    }

    pub fn read_current(&mut self) -> Result<f32> {
        self.board.read_current(self.config.monitor_samples())
    }

    pub fn read_temperature(&mut self) -> Result<f32> {
        self.board.read_temperature(self.config.monitor_samples())
    }

    /// The board level readings from the last monitoring period.
    pub fn get_readings(&self) -> Readings {
        self.readings.to_readings()
    }

    /// The readings of the module registered with a slot, if any.
    pub fn get_module_readings(&self, slot: SlotId) -> Option<Readings> {
        self.assignments[slot.index()]
            .module
            .as_ref()
            .map(|module| module.get_readings())
    }

    /// Write the readings report, the board section followed by one per registered module.
    pub fn format_readings<W: fmt::Write>(
        &self,
        out: &mut W,
        filter: &ReadingsFilter<'_>,
    ) -> fmt::Result {
        format_section(out, "[Yukon]", &self.get_readings(), filter)?;

        if !filter.exclude_modules {
            for (slot, assignment) in SlotId::ALL.into_iter().zip(self.assignments.iter()) {
                if let Some(module) = &assignment.module {
                    format_section(out, format_args!("[{slot}]"), &module.get_readings(), filter)?;
                }
            }
        }
        Ok(())
    }

    /// Write the readings report to a byte sink, followed by a newline.
    pub fn print_readings<W: embedded_io::Write>(
        &self,
        out: &mut W,
        filter: &ReadingsFilter<'_>,
    ) -> Result<()> {
        let mut report = String::new();
        self.format_readings(&mut report, filter)
            .map_err(|_| Error::Report)?;
        report.push('\n');
        out.write_all(report.as_bytes()).map_err(|_| Error::Report)
    }

    /// Finalise the readings of the board and every registered module.
    pub fn process_readings(&mut self) {
        self.readings.finalise();
        for module in self.modules_mut() {
            module.process_readings();
        }
    }

    /// Discard the readings of the board and every registered module.
    pub fn clear_readings(&mut self) {
        self.readings.clear();
        self.under_voltage_count = 0;
        for module in self.modules_mut() {
            module.clear_readings();
        }
    }

    /// The type of module registered with a slot, if any.
    pub fn registered_in(&self, slot: SlotId) -> Option<ModuleType> {
        self.assignments[slot.index()]
            .module
            .as_ref()
            .map(|module| module.module_type())
    }

    fn modules_mut(&mut self) -> impl Iterator<Item = &mut (dyn ModuleDriver<B::Pin> + 'm)> + '_ {
        self.assignments
            .iter_mut()
            .filter_map(|assignment| assignment.module.as_deref_mut())
    }
}
