use crate::{
    board::Board,
    config::{LogLevel, UNDER_VOLTAGE_COUNT_LIMIT, VOLTAGE_LOWER_LIMIT, VOLTAGE_SHORT_LEVEL},
    error::{Error, FaultReason, Origin, Result, VoltageSense},
    hal::{Duration, Instant},
    readings::{MonitorSample, ReadingsFilter},
    slot::SlotId,
};

use super::Yukon;

impl<'m, B: Board> Yukon<'m, B> {
    /// Run one monitoring check of the board and every registered module.
    ///
    /// The first limit found to be exceeded turns the main output off and is returned.
    pub fn tick(&mut self) -> Result<()> {
        self.tick_with_debounce(UNDER_VOLTAGE_COUNT_LIMIT)
    }

    /// As [`tick`](Self::tick), raising an under-voltage fault once the input has been low for
    /// `debounce` consecutive checks.
    pub fn tick_with_debounce(&mut self, debounce: u8) -> Result<()> {
        let sample = match self.check_board(debounce) {
            Ok(sample) => sample,
            Err(err) => return self.shut_down_on(err),
        };

        if let Some(action) = self.monitor_action.as_deref_mut() {
            action(&sample);
        }

        if let Err(err) = self.monitor_modules() {
            return self.shut_down_on(err);
        }

        self.readings.record(&sample);
        Ok(())
    }

    /// Monitor continuously until `end`, checking at least once.
    pub fn run_until(&mut self, end: Instant) -> Result<()> {
        self.clear_readings();

        self.tick()?;
        while self.board.now() < end {
            self.tick()?;
        }

        self.process_readings();
        self.report_readings();
        Ok(())
    }

    /// Monitor continuously for the given time.
    pub fn monitored_sleep(&mut self, duration: Duration) -> Result<()> {
        let end = self.board.now() + duration;
        self.run_until(end)
    }

    pub fn monitored_sleep_ms(&mut self, ms: u32) -> Result<()> {
        self.monitored_sleep(Duration::millis(u64::from(ms)))
    }

    /// Run a single monitoring check, with no tolerance for a low input voltage.
    pub fn monitor_once(&mut self) -> Result<()> {
        self.clear_readings();
        self.tick_with_debounce(1)?;
        self.process_readings();
        self.report_readings();
        Ok(())
    }

    fn check_board(&mut self, debounce: u8) -> Result<MonitorSample> {
        let samples = self.config.monitor_samples();
        let voltage_in = self.board.read_input_voltage(samples)?;

        let limit = self.config.voltage_limit();
        if voltage_in > limit {
            return Err(Error::OverVoltage {
                origin: Origin::Board,
                sense: VoltageSense::Input,
                measured: voltage_in,
                limit,
            });
        }

        if voltage_in < VOLTAGE_LOWER_LIMIT {
            self.under_voltage_count = self.under_voltage_count.saturating_add(1);
            if self.under_voltage_count >= debounce || voltage_in < VOLTAGE_SHORT_LEVEL {
                return Err(Error::UnderVoltage {
                    origin: Origin::Board,
                    sense: VoltageSense::Input,
                    measured: voltage_in,
                    limit: VOLTAGE_LOWER_LIMIT,
                });
            }
            tracing::debug!(
                "[Yukon] Input voltage of {voltage_in}V low for {} checks",
                self.under_voltage_count
            );
        } else {
            self.under_voltage_count = 0;
        }

        let voltage_out = self.board.read_output_voltage(samples)?;
        if self.is_main_output_enabled()
            && voltage_out < VOLTAGE_SHORT_LEVEL
            && voltage_in >= VOLTAGE_LOWER_LIMIT
        {
            return Err(Error::Fault {
                origin: Origin::Board,
                reason: FaultReason::ShortCircuit {
                    output: voltage_out,
                    input: voltage_in,
                },
            });
        }

        let current = self.board.read_current(samples)?;
        if current > self.config.current_limit() {
            return Err(Error::OverCurrent {
                origin: Origin::Board,
                measured: current,
                limit: self.config.current_limit(),
            });
        }

        let temperature = self.board.read_temperature(samples)?;
        if temperature > self.config.temperature_limit() {
            return Err(Error::OverTemperature {
                origin: Origin::Board,
                measured: temperature,
                limit: self.config.temperature_limit(),
            });
        }

        Ok(MonitorSample {
            voltage_in,
            voltage_out,
            current,
            temperature,
        })
    }

    fn monitor_modules(&mut self) -> Result<()> {
        for (slot, assignment) in SlotId::ALL.into_iter().zip(self.assignments.iter_mut()) {
            if let Some(module) = &mut assignment.module {
                module.monitor(&mut self.board.slot_context(slot))?;
            }
        }
        Ok(())
    }

    fn report_readings(&self) {
        if self.config.log_level() < LogLevel::Debug {
            return;
        }

        let mut report = String::new();
        if self.format_readings(&mut report, &ReadingsFilter::default()).is_ok() {
            tracing::debug!("{report}");
        }
    }
}
