//! Calibrated conversions from raw ADC readings to real units.
//!
//! The calibration points are averages taken across a batch of boards. Input and output
//! voltage are piecewise linear, with a steeper segment below 5V.

/// A piecewise linear fit through a zero point, a low point and a high point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageCalibration {
    /// Raw reading with no voltage present.
    pub measured_at_zero: f32,
    /// Raw reading at [`Self::volts_at_min`].
    pub measured_at_min: f32,
    /// Raw reading at [`Self::volts_at_max`].
    pub measured_at_max: f32,
    pub volts_at_min: f32,
    pub volts_at_max: f32,
}

impl VoltageCalibration {
    pub fn to_volts(&self, raw: f32) -> f32 {
        if raw >= self.measured_at_min {
            let gradient =
                (self.volts_at_max - self.volts_at_min) / (self.measured_at_max - self.measured_at_min);
            (raw - self.measured_at_min) * gradient + self.volts_at_min
        } else {
            let gradient = self.volts_at_min / (self.measured_at_min - self.measured_at_zero);
            ((raw - self.measured_at_zero) * gradient).max(0.0)
        }
    }
}

pub const VOLTAGE_IN_CALIBRATION: VoltageCalibration = VoltageCalibration {
    measured_at_zero: 432.0,
    measured_at_min: 13677.0,
    measured_at_max: 45874.0,
    volts_at_min: 5.0,
    volts_at_max: 17.0,
};

pub const VOLTAGE_OUT_CALIBRATION: VoltageCalibration = VoltageCalibration {
    measured_at_zero: 579.0,
    measured_at_min: 13760.0,
    measured_at_max: 45636.0,
    volts_at_min: 5.0,
    volts_at_max: 17.0,
};

const CURRENT_MID: f32 = 1.0;
const CURRENT_MAX: f32 = 15.0;
const MEASURED_AT_CURRENT_MID: f32 = 1015.0;
const MEASURED_AT_CURRENT_MAX: f32 = 14255.0;

const ZERO_CELSIUS_IN_KELVIN: f32 = 273.15;
const ROOM_TEMP_KELVIN: f32 = ZERO_CELSIUS_IN_KELVIN + 25.0;
const THERMISTOR_PULLUP_OHMS: f32 = 5100.0;
const THERMISTOR_OHMS_AT_ROOM_TEMP: f32 = 10000.0;
const THERMISTOR_BETA: f32 = 3435.0;
const ADC_REFERENCE: f32 = crate::mux::ADC_REFERENCE;

/// Board input voltage from an averaged raw reading.
pub fn u16_to_voltage_in(raw: f32) -> f32 {
    VOLTAGE_IN_CALIBRATION.to_volts(raw)
}

/// Board output voltage from an averaged raw reading.
pub fn u16_to_voltage_out(raw: f32) -> f32 {
    VOLTAGE_OUT_CALIBRATION.to_volts(raw)
}

/// Board output current from an averaged raw reading.
///
/// A single segment fit. It over-reports small currents, but never goes negative.
pub fn u16_to_current(raw: f32) -> f32 {
    let gradient = (CURRENT_MAX - CURRENT_MID) / (MEASURED_AT_CURRENT_MAX - MEASURED_AT_CURRENT_MID);
    ((raw - MEASURED_AT_CURRENT_MID) * gradient + CURRENT_MID).max(0.0)
}

/// Temperature in °C of an NTC thermistor on a 5.1k pull-up, from the voltage across it.
pub fn analog_to_temp(sense: f32) -> f32 {
    let r_thermistor = sense / ((ADC_REFERENCE - sense) / THERMISTOR_PULLUP_OHMS);
    let t_kelvin = (THERMISTOR_BETA * ROOM_TEMP_KELVIN)
        / (THERMISTOR_BETA
            + ROOM_TEMP_KELVIN * (r_thermistor / THERMISTOR_OHMS_AT_ROOM_TEMP).ln());
    t_kelvin - ZERO_CELSIUS_IN_KELVIN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn voltage_in_calibration_points() {
        assert!(close(u16_to_voltage_in(13677.0), 5.0, 1e-4));
        assert!(close(u16_to_voltage_in(45874.0), 17.0, 1e-3));
        assert!(close(u16_to_voltage_in(432.0), 0.0, 1e-4));
        // Never negative below the zero point.
        assert_eq!(u16_to_voltage_in(0.0), 0.0);
    }

    #[test]
    fn voltage_out_calibration_points() {
        assert!(close(u16_to_voltage_out(13760.0), 5.0, 1e-4));
        assert!(close(u16_to_voltage_out(45636.0), 17.0, 1e-3));
        assert_eq!(u16_to_voltage_out(100.0), 0.0);
    }

    #[test]
    fn voltage_is_monotonic_across_the_segment_change() {
        let below = u16_to_voltage_in(13676.0);
        let at = u16_to_voltage_in(13677.0);
        let above = u16_to_voltage_in(13678.0);
        assert!(below < at && at < above);
    }

    #[test]
    fn current_conversion() {
        assert!(close(u16_to_current(1015.0), 1.0, 1e-4));
        assert!(close(u16_to_current(14255.0), 15.0, 1e-3));
        assert_eq!(u16_to_current(0.0), 0.0);
    }

    #[test]
    fn thermistor_at_room_temperature() {
        // With the thermistor equal to the pull-up ratio at 25°C, i.e. 10k against 5.1k.
        let sense = ADC_REFERENCE * 10000.0 / (10000.0 + 5100.0);
        assert!(close(analog_to_temp(sense), 25.0, 0.01));
        // Lower resistance means hotter.
        assert!(analog_to_temp(1.0) > 25.0);
        assert!(analog_to_temp(2.5) < 25.0);
    }
}
