//! DPE energy label classes and display constants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CO₂ emitted per kWh of final energy, used for the displayed estimate.
pub const CO2_KG_PER_KWH: f64 = 0.25;

/// Consumption shown to users never goes below this (kWh/year).
pub const DISPLAY_FLOOR_KWH: f64 = 50.0;

/// A DPE label. The model's class index runs from 0 (`G`, worst) to 6 (`A`, best).
///
/// # Examples
///
/// ```
/// use dpe_predict::DpeClass;
///
/// let class = DpeClass::from_index(5).expect("index in 0..=6");
/// assert_eq!(class.letter(), 'B');
/// assert_eq!(class.index(), 5);
/// assert!(DpeClass::from_index(7).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DpeClass {
    /// Worst
    G,
    /// Index 1
    F,
    /// Index 2
    E,
    /// Index 3
    D,
    /// Index 4
    C,
    /// Index 5
    B,
    /// Best
    A,
}

impl DpeClass {
    /// All classes in index order.
    pub const ALL: [DpeClass; 7] = [
        DpeClass::G,
        DpeClass::F,
        DpeClass::E,
        DpeClass::D,
        DpeClass::C,
        DpeClass::B,
        DpeClass::A,
    ];

    /// Class for a model index, `None` outside `0..=6`.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Model index of this class.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label letter.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            DpeClass::G => 'G',
            DpeClass::F => 'F',
            DpeClass::E => 'E',
            DpeClass::D => 'D',
            DpeClass::C => 'C',
            DpeClass::B => 'B',
            DpeClass::A => 'A',
        }
    }
}

impl fmt::Display for DpeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
