//! Service classes of trips.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a trip. Price rules depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceClass {
    /// High-speed long distance (ICE).
    Ice,
    /// Long distance (IC/EC).
    Ic,
    /// Long distance coach.
    Coach,
    /// Night train.
    Night,
    /// Regional express.
    Re,
    /// Regional train.
    Rb,
    /// Suburban rail.
    S,
    /// Underground.
    U,
    /// Tram.
    Str,
    /// Bus.
    Bus,
    /// Ship or ferry.
    Ship,
    /// Anything else.
    Other,
}

/// Fare bracket a service class is billed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FareBracket {
    Local,
    Regional,
    Ic,
    Ice,
    Other,
}

impl ServiceClass {
    /// Returns the fare bracket for this class.
    pub fn fare_bracket(self) -> FareBracket {
        match self {
            ServiceClass::Ice => FareBracket::Ice,
            ServiceClass::Ic => FareBracket::Ic,
            ServiceClass::Re | ServiceClass::Rb | ServiceClass::S => FareBracket::Regional,
            ServiceClass::Night | ServiceClass::U | ServiceClass::Str | ServiceClass::Bus => {
                FareBracket::Local
            }
            ServiceClass::Coach | ServiceClass::Ship | ServiceClass::Other => FareBracket::Other,
        }
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceClass::Ice => "ICE",
            ServiceClass::Ic => "IC",
            ServiceClass::Coach => "Coach",
            ServiceClass::Night => "N",
            ServiceClass::Re => "RE",
            ServiceClass::Rb => "RB",
            ServiceClass::S => "S",
            ServiceClass::U => "U",
            ServiceClass::Str => "STR",
            ServiceClass::Bus => "Bus",
            ServiceClass::Ship => "Ship",
            ServiceClass::Other => "Other",
        };
        f.write_str(s)
    }
}
