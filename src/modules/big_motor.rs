use crate::{
    driver::{ModuleDriver, SlotContext},
    error::{Error, FaultReason, Result},
    hal::FlexPin,
    readings::{Aggregate, Readings},
    registry::ModuleType,
};

/// Big Motor + Encoder module.
///
/// The motor driver's active-low fault line is on slow2 and its enable on slow3. ADC1 carries
/// the amplified shunt voltage, centred on half the ADC reference.
#[derive(Debug, Default)]
pub struct BigMotorModule {
    fault_triggered: bool,
    current: Aggregate,
    temperature: Aggregate,
}

impl BigMotorModule {
    pub const CURRENT_THRESHOLD: f32 = 25.0;
    pub const TEMPERATURE_THRESHOLD: f32 = 50.0;
    const SHUNT_RESISTOR: f32 = 0.001;
    const GAIN: f32 = 80.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the motor driver is reporting a fault.
    pub fn read_fault<P: FlexPin>(ctx: &mut SlotContext<'_, P>) -> Result<bool> {
        ctx.pins.slow2.is_low().map_err(Error::pin)
    }

    /// Motor current in amps, regardless of direction.
    pub fn read_current<P>(ctx: &mut SlotContext<'_, P>, samples: u16) -> Result<f32> {
        let sense = ctx.adc.read_adc1(samples)?;
        Ok((sense - crate::mux::ADC_REFERENCE / 2.0).abs() / (Self::SHUNT_RESISTOR * Self::GAIN))
    }

    /// Temperature of the motor driver in °C.
    pub fn read_temperature<P>(ctx: &mut SlotContext<'_, P>, samples: u16) -> Result<f32> {
        ctx.adc.read_adc2_as_temp(samples)
    }

    pub fn enable<P: FlexPin>(ctx: &mut SlotContext<'_, P>) -> Result<()> {
        ctx.pins.slow3.set_as_output(true).map_err(Error::pin)
    }

    pub fn disable<P: FlexPin>(ctx: &mut SlotContext<'_, P>) -> Result<()> {
        ctx.pins.slow3.set_as_output(false).map_err(Error::pin)
    }
}

impl<P: FlexPin> ModuleDriver<P> for BigMotorModule {
    fn module_type(&self) -> ModuleType {
        ModuleType::BigMotor
    }

    fn reset(&mut self, ctx: &mut SlotContext<'_, P>) -> Result<()> {
        ctx.pins.slow2.set_as_input().map_err(Error::pin)?;
        Self::disable(ctx)
    }

    fn monitor(&mut self, ctx: &mut SlotContext<'_, P>) -> Result<()> {
        let origin = ctx.origin(ModuleType::BigMotor);

        let fault = Self::read_fault(ctx)?;
        if fault {
            return Err(Error::Fault {
                origin,
                reason: FaultReason::DriverFault,
            });
        }

        let current = Self::read_current(ctx, 1)?;
        if current > Self::CURRENT_THRESHOLD {
            return Err(Error::OverCurrent {
                origin,
                measured: current,
                limit: Self::CURRENT_THRESHOLD,
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

        self.fault_triggered |= fault;
        self.current.record(current);
        self.temperature.record(temperature);
        Ok(())
    }

    fn get_readings(&self) -> Readings {
        Readings::new()
            .with("Fault", self.fault_triggered)
            .with("C_max", self.current.max)
            .with("C_min", self.current.min)
            .with("C_avg", self.current.average)
            .with("T_max", self.temperature.max)
            .with("T_min", self.temperature.min)
            .with("T_avg", self.temperature.average)
    }

    fn clear_readings(&mut self) {
        self.fault_triggered = false;
        self.current.clear();
        self.temperature.clear();
    }

    fn process_readings(&mut self) {
        self.current.finalise();
        self.temperature.finalise();
    }
}
