use crate::{
    board::Board,
    config::{
        ABSOLUTE_MAX_VOLTAGE_LIMIT, STABILISE_DELTA, STABILISE_TIMEOUT, STABILISE_WINDOW,
        VOLTAGE_LOWER_LIMIT, VOLTAGE_SHORT_LEVEL, VOLTAGE_ZERO_LEVEL,
    },
    error::{Error, FaultReason, Origin, Result, VoltageSense},
    hal::Instant,
};

use super::{RailState, Yukon};

impl<'m, B: Board> Yukon<'m, B> {
    /// Turn on the main output, waiting for its voltage to settle.
    ///
    /// The input voltage is checked first, and the enable pin is left untouched if it is out of
    /// range. Any failure once the pin has been driven turns the output back off before the error
    /// is returned.
    pub fn enable_main_output(&mut self) -> Result<()> {
        if self.is_main_output_enabled() {
            return Ok(());
        }

        tracing::info!("> Enabling output");
        let voltage_in = self.check_input_for_enable()?;

        let start = self.board.now();
        let old_voltage = self.board.read_output_voltage(1)?;

        self.rail = RailState::Enabling;
        if let Err(err) = self.board.set_main_output(true) {
            return self.shut_down_on(err);
        }
        if let Err(err) = self.wait_for_stable_output(start, old_voltage, voltage_in) {
            return self.shut_down_on(err);
        }

        self.clear_readings();
        self.rail = RailState::Stable;
        tracing::info!("[Yukon] Output enabled");
        Ok(())
    }

    /// Turn off the main output.
    pub fn disable_main_output(&mut self) -> Result<()> {
        self.board.set_main_output(false)?;
        self.rail = RailState::Disabled;
        tracing::info!("[Yukon] Output disabled");
        Ok(())
    }

    pub fn is_main_output_enabled(&self) -> bool {
        self.rail != RailState::Disabled
    }

    fn check_input_for_enable(&mut self) -> Result<f32> {
        let voltage_in = self.board.read_input_voltage(1)?;
        let limit = self.config.voltage_limit();

        if voltage_in > ABSOLUTE_MAX_VOLTAGE_LIMIT || voltage_in > limit {
            return Err(Error::OverVoltage {
                origin: Origin::Board,
                sense: VoltageSense::Input,
                measured: voltage_in,
                limit: limit.min(ABSOLUTE_MAX_VOLTAGE_LIMIT),
            });
        }

        if voltage_in < VOLTAGE_LOWER_LIMIT {
            // Nothing at all on the input is reported against the zero level.
            let limit = if voltage_in < VOLTAGE_ZERO_LEVEL {
                tracing::warn!("[Yukon] No input voltage detected! Make sure power is being provided");
                VOLTAGE_ZERO_LEVEL
            } else {
                VOLTAGE_LOWER_LIMIT
            };
            return Err(Error::UnderVoltage {
                origin: Origin::Board,
                sense: VoltageSense::Input,
                measured: voltage_in,
                limit,
            });
        }
        Ok(voltage_in)
    }

    /// Poll the output until successive readings agree for long enough.
    fn wait_for_stable_output(
        &mut self,
        start: Instant,
        mut old_voltage: f32,
        voltage_in: f32,
    ) -> Result<()> {
        let limit = self.config.voltage_limit();
        let mut stable_since = None;

        let voltage_out = loop {
            let new_voltage = self.board.read_output_voltage(1)?;
            if new_voltage > limit {
                return Err(Error::OverVoltage {
                    origin: Origin::Board,
                    sense: VoltageSense::Output,
                    measured: new_voltage,
                    limit,
                });
            }

            let now = self.board.now();
            if (new_voltage - old_voltage).abs() < STABILISE_DELTA {
                match stable_since {
                    None => stable_since = Some(now),
                    Some(since) if now > since + STABILISE_WINDOW => break new_voltage,
                    Some(_) => {}
                }
            } else {
                stable_since = None;
            }

            if now > start + STABILISE_TIMEOUT {
                return Err(Error::Fault {
                    origin: Origin::Board,
                    reason: FaultReason::DidNotStabilise,
                });
            }
            old_voltage = new_voltage;
        };

        if voltage_out < VOLTAGE_SHORT_LEVEL {
            return Err(Error::Fault {
                origin: Origin::Board,
                reason: FaultReason::ShortCircuit {
                    output: voltage_out,
                    input: voltage_in,
                },
            });
        }
        if voltage_out < VOLTAGE_LOWER_LIMIT {
            return Err(Error::UnderVoltage {
                origin: Origin::Board,
                sense: VoltageSense::Output,
                measured: voltage_out,
                limit: VOLTAGE_LOWER_LIMIT,
            });
        }
        Ok(())
    }

    /// Turn the output off after a failure, then hand the failure back.
    ///
    /// The rail is marked disabled even if the pin cannot be driven, and the first failure
    /// takes precedence over one from the pin.
    pub(super) fn shut_down_on<T>(&mut self, err: Error) -> Result<T> {
        if let Err(pin_err) = self.board.set_main_output(false) {
            tracing::error!("[Yukon] Failed to turn off the output: {pin_err}");
        }
        self.rail = RailState::Disabled;
        tracing::warn!("[Yukon] Output disabled: {err}");
        Err(err)
    }
}
