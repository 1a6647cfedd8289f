//! Module fingerprinting: classifying analog levels and the signatures built from them.

use core::fmt;

use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Number of samples averaged when reading a slot's ADC lines for detection.
pub const DETECTION_SAMPLES: u16 = 64;
/// Voltage at or below which a detection line reads as [`AdcLevel::Low`].
pub const DETECTION_ADC_LOW: f32 = 0.2;
/// Voltage at or above which a detection line reads as [`AdcLevel::High`].
pub const DETECTION_ADC_HIGH: f32 = 3.2;

/// Tri-state level of an analog detection line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum AdcLevel {
    /// Pulled down by the module.
    Low,
    /// Pulled up by the module.
    High,
    /// Neither, typically an open line or one held mid-rail by passives.
    Float,
}

impl fmt::Display for AdcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdcLevel::Low => write!(f, "LOW"),
            AdcLevel::High => write!(f, "HIGH"),
            AdcLevel::Float => write!(f, "FLOAT"),
        }
    }
}

/// Classify an averaged voltage against a pair of thresholds.
pub fn classify(voltage: f32, low_threshold: f32, high_threshold: f32) -> AdcLevel {
    if voltage <= low_threshold {
        AdcLevel::Low
    } else if voltage >= high_threshold {
        AdcLevel::High
    } else {
        AdcLevel::Float
    }
}

/// Classify a detection line voltage using the board's calibrated thresholds.
pub fn classify_detection(voltage: f32) -> AdcLevel {
    classify(voltage, DETECTION_ADC_LOW, DETECTION_ADC_HIGH)
}

/// The five values sampled from a slot that identify the module fitted to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub adc1: AdcLevel,
    pub adc2: AdcLevel,
    pub slow1: bool,
    pub slow2: bool,
    pub slow3: bool,
}

impl Signature {
    /// What an empty slot reads as: ADC2's pull-up and the slow pin pull-ups, nothing else.
    pub const EMPTY: Signature = Signature::new(AdcLevel::Float, AdcLevel::High, true, true, true);

    pub const fn new(adc1: AdcLevel, adc2: AdcLevel, slow1: bool, slow2: bool, slow3: bool) -> Self {
        Self {
            adc1,
            adc2,
            slow1,
            slow2,
            slow3,
        }
    }

    /// Whether this is the signature of an empty slot.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Every possible signature, 72 in all.
    pub fn all() -> impl Iterator<Item = Signature> {
        AdcLevel::iter().flat_map(|adc1| {
            AdcLevel::iter().flat_map(move |adc2| {
                (0u8..8).map(move |bits| {
                    Signature::new(adc1, adc2, bits & 0b100 != 0, bits & 0b010 != 0, bits & 0b001 != 0)
                })
            })
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ADC1 = {}, ADC2 = {}, SLOW1 = {}, SLOW2 = {}, SLOW3 = {}",
            self.adc1, self.adc2, self.slow1 as u8, self.slow2 as u8, self.slow3 as u8
        )
    }
}
