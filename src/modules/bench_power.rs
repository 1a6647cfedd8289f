use crate::{
    driver::{ModuleDriver, SlotContext},
    error::{Error, FaultReason, Result},
    hal::FlexPin,
    readings::{Aggregate, Readings},
    registry::ModuleType,
};

// Output voltage against the voltage measured on ADC1, at three PWM settings.
const VOLTAGE_AT_PWM_MIN: f32 = 0.6017;
const VOLTAGE_AT_PWM_MID: f32 = 6.4864;
const VOLTAGE_AT_PWM_MAX: f32 = 12.4303;
const MEASURED_AT_PWM_MIN: f32 = 0.1439;
const MEASURED_AT_PWM_MID: f32 = 1.3094;
const MEASURED_AT_PWM_MAX: f32 = 2.4976;

/// Bench Power module.
///
/// The regulator's power-good output is on fast1 and its enable on slow2. ADC1 carries a
/// divided down copy of the output voltage.
#[derive(Debug)]
pub struct BenchPowerModule {
    /// Turn off the main output if the regulator reports its power is not good.
    pub halt_on_not_pgood: bool,
    last_pgood: bool,
    pgood_throughout: bool,
    voltage_out: Aggregate,
    temperature: Aggregate,
}

impl Default for BenchPowerModule {
    fn default() -> Self {
        Self::new(false)
    }
}

impl BenchPowerModule {
    pub const TEMPERATURE_THRESHOLD: f32 = 80.0;

    pub fn new(halt_on_not_pgood: bool) -> Self {
        Self {
            halt_on_not_pgood,
            last_pgood: false,
            pgood_throughout: true,
            voltage_out: Aggregate::default(),
            temperature: Aggregate::default(),
        }
    }

    /// Convert the voltage measured on ADC1 to the module's output voltage.
    pub fn measured_to_output_voltage(measured: f32) -> f32 {
        if measured >= MEASURED_AT_PWM_MID {
            (measured - MEASURED_AT_PWM_MID) * (VOLTAGE_AT_PWM_MAX - VOLTAGE_AT_PWM_MID)
                / (MEASURED_AT_PWM_MAX - MEASURED_AT_PWM_MID)
                + VOLTAGE_AT_PWM_MID
        } else {
            ((measured - MEASURED_AT_PWM_MIN) * (VOLTAGE_AT_PWM_MID - VOLTAGE_AT_PWM_MIN)
                / (MEASURED_AT_PWM_MID - MEASURED_AT_PWM_MIN)
                + VOLTAGE_AT_PWM_MIN)
                .max(0.0)
        }
    }

    pub fn read_voltage<P>(ctx: &mut SlotContext<'_, P>, samples: u16) -> Result<f32> {
        Ok(Self::measured_to_output_voltage(ctx.adc.read_adc1(samples)?))
    }

    pub fn read_power_good<P: FlexPin>(ctx: &mut SlotContext<'_, P>) -> Result<bool> {
        ctx.pins.fast1.is_high().map_err(Error::pin)
    }

    pub fn read_temperature<P>(ctx: &mut SlotContext<'_, P>, samples: u16) -> Result<f32> {
        ctx.adc.read_adc2_as_temp(samples)
    }

    pub fn enable<P: FlexPin>(ctx: &mut SlotContext<'_, P>) -> Result<()> {
        ctx.pins.slow2.set_as_output(true).map_err(Error::pin)
    }

    pub fn disable<P: FlexPin>(ctx: &mut SlotContext<'_, P>) -> Result<()> {
        ctx.pins.slow2.set_as_output(false).map_err(Error::pin)
    }
}

impl<P: FlexPin> ModuleDriver<P> for BenchPowerModule {
    fn module_type(&self) -> ModuleType {
        ModuleType::BenchPower
    }

    fn reset(&mut self, ctx: &mut SlotContext<'_, P>) -> Result<()> {
        Self::disable(ctx)?;
        ctx.pins.fast1.set_as_input().map_err(Error::pin)
    }

    fn monitor(&mut self, ctx: &mut SlotContext<'_, P>) -> Result<()> {
        let origin = ctx.origin(ModuleType::BenchPower);

        let pgood = Self::read_power_good(ctx)?;
        if !pgood && self.halt_on_not_pgood {
            return Err(Error::Fault {
                origin,
                reason: FaultReason::PowerNotGood,
            });
        }

        let temperature = Self::read_temperature(ctx, 1)?;
        if temperature > Self::TEMPERATURE_THRESHOLD {
            return Err(Error::OverTemperature {
                origin,
                measured: temperature,
                limit: Self::TEMPERATURE_THRESHOLD,
            });
        }

        let voltage_out = Self::read_voltage(ctx, 1)?;

        if self.last_pgood && !pgood {
            tracing::warn!("{origin} Power is not good");
        } else if !self.last_pgood && pgood {
            tracing::warn!("{origin} Power is good");
        }

        self.last_pgood = pgood;
        self.pgood_throughout &= pgood;
        self.voltage_out.record(voltage_out);
        self.temperature.record(temperature);
        Ok(())
    }

    fn get_readings(&self) -> Readings {
        Readings::new()
            .with("PGood", self.pgood_throughout)
            .with("Vo_max", self.voltage_out.max)
            .with("Vo_min", self.voltage_out.min)
            .with("Vo_avg", self.voltage_out.average)
            .with("T_max", self.temperature.max)
            .with("T_min", self.temperature.min)
            .with("T_avg", self.temperature.average)
    }

    fn clear_readings(&mut self) {
        self.pgood_throughout = true;
        self.voltage_out.clear();
        self.temperature.clear();
    }

    fn process_readings(&mut self) {
        self.voltage_out.finalise();
        self.temperature.finalise();
    }
}
