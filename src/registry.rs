//! The table of known Yukon modules and the signature matcher.
//!
//! Modules are tested in the order of [`KNOWN_MODULES`] and the first one whose predicate
//! accepts a signature wins. Some predicates overlap (Bench Power and Serial Bus Servo both
//! accept a floating ADC1 with slow pins `1 0 0`), so the order is part of the behaviour.

use strum_macros::{EnumIter, IntoStaticStr};

use crate::signature::{
    AdcLevel::{Float, High, Low},
    Signature,
};

/// Every module type the supervisor can recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, strum_macros::Display)]
pub enum ModuleType {
    #[strum(serialize = "Audio Amp")]
    AudioAmp,
    #[strum(serialize = "Bench Power")]
    BenchPower,
    #[strum(serialize = "Big Motor + Encoder")]
    BigMotor,
    #[strum(serialize = "Dual Motor")]
    DualMotor,
    #[strum(serialize = "Dual Switched Output")]
    DualOutput,
    #[strum(serialize = "LED Strip")]
    LedStrip,
    #[strum(serialize = "Proto Potentiometer")]
    ProtoPot,
    #[strum(serialize = "Quad Servo Direct")]
    QuadServoDirect,
    #[strum(serialize = "Quad Servo Regulated")]
    QuadServoReg,
    #[strum(serialize = "Serial Bus Servo")]
    SerialServo,
    #[strum(serialize = "Micro SD Card")]
    MicroSd,
    #[strum(serialize = "Mechanical Key + RGB")]
    MechKey,
    #[strum(serialize = "Potentiometer + RGB")]
    Potentiometer,
    /// Something is fitted but its signature matches no known module.
    #[strum(serialize = "Unknown")]
    Unknown,
}

/// Known modules in matching priority order.
pub const KNOWN_MODULES: [ModuleType; 13] = [
    ModuleType::AudioAmp,
    ModuleType::BenchPower,
    ModuleType::BigMotor,
    ModuleType::DualMotor,
    ModuleType::DualOutput,
    ModuleType::LedStrip,
    ModuleType::ProtoPot,
    ModuleType::QuadServoDirect,
    ModuleType::QuadServoReg,
    ModuleType::SerialServo,
    ModuleType::MicroSd,
    ModuleType::MechKey,
    ModuleType::Potentiometer,
];

impl ModuleType {
    /// Human readable name of the module.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Whether a slot with the given signature holds a module of this type.
    ///
    /// [`ModuleType::Unknown`] accepts anything that is not an empty slot.
    pub fn is_module(&self, sig: &Signature) -> bool {
        let Signature {
            adc1,
            adc2,
            slow1,
            slow2,
            slow3,
        } = *sig;

        match self {
            // Audio Amp uses ADC2 as an analog input.
            ModuleType::AudioAmp => adc1 == Float && !slow1 && slow2 && slow3,
            // The bench power regulator may pull ADC1 down, but never up.
            ModuleType::BenchPower => adc1 != High && slow1 && !slow2 && !slow3,
            // Slow2 carries the driver's fault line.
            ModuleType::BigMotor => adc1 == Low && !slow1 && slow3,
            ModuleType::DualMotor => adc1 == High && !slow1 && !slow2 && slow3,
            ModuleType::DualOutput => adc1 == Float && slow1 && !slow2 && slow3,
            ModuleType::LedStrip => adc1 == Low && slow1 && slow2 && slow3,
            // ADC1 is the wiper of the pot.
            ModuleType::ProtoPot => adc2 == High && slow1 && slow2 && !slow3,
            // ADC1 and ADC2 are user accessible analog inputs.
            ModuleType::QuadServoDirect => !slow1 && !slow2 && !slow3,
            ModuleType::QuadServoReg => adc1 == Float && !slow1 && slow2 && !slow3,
            ModuleType::SerialServo => adc1 == Float && slow1 && !slow2 && !slow3,
            ModuleType::MicroSd => adc1 == Low && adc2 != Float && slow1 && !slow2 && slow3,
            ModuleType::MechKey => adc1 == High && adc2 == Float && slow1 && !slow2 && !slow3,
            ModuleType::Potentiometer => adc1 == High && adc2 == Low && slow1 && slow2 && !slow3,
            ModuleType::Unknown => !sig.is_empty(),
        }
    }
}

/// Identify the module that produced a signature.
///
/// Returns `None` for an empty slot and [`ModuleType::Unknown`] for anything fitted that no
/// known module claims.
pub fn match_module(sig: &Signature) -> Option<ModuleType> {
    KNOWN_MODULES
        .iter()
        .copied()
        .find(|module| module.is_module(sig))
        .or_else(|| ModuleType::Unknown.is_module(sig).then_some(ModuleType::Unknown))
}

/// Every signature claimed by more than one known module, with the claimants in priority order.
///
/// The first claimant is the one [`match_module`] will return.
pub fn signature_overlaps() -> impl Iterator<Item = (Signature, heapless::Vec<ModuleType, 13>)> {
    Signature::all().filter_map(|sig| {
        let claimants: heapless::Vec<ModuleType, 13> = KNOWN_MODULES
            .iter()
            .copied()
            .filter(|module| module.is_module(&sig))
            .collect();
        (claimants.len() > 1).then_some((sig, claimants))
    })
}
