//! This module defines the six expansion slots and the pins that belong to each.

use core::fmt;

use strum_macros::{EnumCount, EnumIter};

use crate::error::{Error, Result};

/// Number of expansion slots on a Yukon board.
pub const NUM_SLOTS: usize = 6;

/// Identity of one of the six expansion slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, EnumCount)]
#[repr(u8)]
pub enum SlotId {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
}

impl SlotId {
    /// All slots, in ID order.
    pub const ALL: [SlotId; NUM_SLOTS] = [
        SlotId::One,
        SlotId::Two,
        SlotId::Three,
        SlotId::Four,
        SlotId::Five,
        SlotId::Six,
    ];

    /// The slot number as printed on the board (1 - 6).
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Zero based index of this slot.
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// The fixed description of this slot.
    pub const fn slot(self) -> Slot {
        match self {
            SlotId::One => SLOT1,
            SlotId::Two => SLOT2,
            SlotId::Three => SLOT3,
            SlotId::Four => SLOT4,
            SlotId::Five => SLOT5,
            SlotId::Six => SLOT6,
        }
    }
}

impl TryFrom<u8> for SlotId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(SlotId::One),
            2 => Ok(SlotId::Two),
            3 => Ok(SlotId::Three),
            4 => Ok(SlotId::Four),
            5 => Ok(SlotId::Five),
            6 => Ok(SlotId::Six),
            _ => Err(Error::InvalidSlot(value)),
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot{}", self.number())
    }
}

/// A slot's identity and the analog mux addresses wired to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub id: SlotId,
    /// Mux address of the slot's ADC1 line.
    pub adc1_addr: u8,
    /// Mux address of the slot's ADC2 line, which doubles as a thermistor input.
    pub adc2_therm_addr: u8,
}

pub const SLOT1: Slot = Slot {
    id: SlotId::One,
    adc1_addr: 0b0000,
    adc2_therm_addr: 0b0011,
};

pub const SLOT2: Slot = Slot {
    id: SlotId::Two,
    adc1_addr: 0b0001,
    adc2_therm_addr: 0b0110,
};

pub const SLOT3: Slot = Slot {
    id: SlotId::Three,
    adc1_addr: 0b0100,
    adc2_therm_addr: 0b0010,
};

pub const SLOT4: Slot = Slot {
    id: SlotId::Four,
    adc1_addr: 0b0101,
    adc2_therm_addr: 0b0111,
};

pub const SLOT5: Slot = Slot {
    id: SlotId::Five,
    adc1_addr: 0b1000,
    adc2_therm_addr: 0b1011,
};

pub const SLOT6: Slot = Slot {
    id: SlotId::Six,
    adc1_addr: 0b1001,
    adc2_therm_addr: 0b1010,
};

/// The seven signal pins routed to a slot.
///
/// The "fast" pins are capable of PWM and PIO, the "slow" pins are on the I/O expander
/// and are also used for module detection.
pub struct SlotPins<P> {
    pub fast1: P,
    pub fast2: P,
    pub fast3: P,
    pub fast4: P,
    pub slow1: P,
    pub slow2: P,
    pub slow3: P,
}
