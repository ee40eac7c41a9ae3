// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operating mode enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Hardware-reported heat/cool operating mode.
///
/// Only `cool` (3) and `heat` (4) carry meaning for this thermostat; other
/// wire values are rejected during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemMode {
    /// Heating.
    #[default]
    Heat,
    /// Cooling.
    Cool,
}

impl SystemMode {
    /// Decodes the wire enumeration.
    #[must_use]
    pub const fn from_wire(raw: i64) -> Option<Self> {
        match raw {
            3 => Some(Self::Cool),
            4 => Some(Self::Heat),
            _ => None,
        }
    }

    /// Returns the wire enumeration.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Cool => 3,
            Self::Heat => 4,
        }
    }

    /// Returns the persisted label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heat => "heat",
            Self::Cool => "cool",
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heat" => Ok(Self::Heat),
            "cool" => Ok(Self::Cool),
            other => Err(ValueError::UnknownLabel(other.to_string())),
        }
    }
}

/// Sensing/regulation strategy configured in the thermostat firmware.
///
/// # Examples
///
/// ```
/// use thermolink::types::SensorMode;
///
/// assert_eq!(SensorMode::from_wire(6), SensorMode::Regulator);
/// assert_eq!(SensorMode::Regulator.label(), "p");
/// assert!(SensorMode::Regulator.is_regulator());
/// assert_eq!("a2f".parse::<SensorMode>().unwrap(), SensorMode::Auto2Frost);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SensorMode {
    /// Air sensor.
    #[default]
    Auto,
    /// Floor sensor.
    Frost,
    /// Air sensor with floor limit.
    AutoFrost,
    /// External air sensor.
    Auto2,
    /// External air sensor with floor limit.
    Auto2Frost,
    /// Floor probe.
    FloorProbe,
    /// Regulator (percentage) mode, no temperature sensing.
    Regulator,
    /// A value this model does not know.
    Unknown,
}

impl SensorMode {
    /// Decodes the wire enumeration.
    #[must_use]
    pub const fn from_wire(raw: i64) -> Self {
        match raw {
            0 => Self::Auto,
            1 => Self::Frost,
            2 => Self::AutoFrost,
            3 => Self::Auto2,
            4 => Self::Auto2Frost,
            5 => Self::FloorProbe,
            6 => Self::Regulator,
            _ => Self::Unknown,
        }
    }

    /// Returns the short label used in settings and the store.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auto => "a",
            Self::Frost => "f",
            Self::AutoFrost => "af",
            Self::Auto2 => "a2",
            Self::Auto2Frost => "a2f",
            Self::FloorProbe => "fp",
            Self::Regulator => "p",
            Self::Unknown => "unknown",
        }
    }

    /// Returns `true` for regulator mode.
    #[must_use]
    pub const fn is_regulator(self) -> bool {
        matches!(self, Self::Regulator)
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SensorMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Self::Auto),
            "f" => Ok(Self::Frost),
            "af" => Ok(Self::AutoFrost),
            "a2" => Ok(Self::Auto2),
            "a2f" => Ok(Self::Auto2Frost),
            "fp" => Ok(Self::FloorProbe),
            "p" => Ok(Self::Regulator),
            "unknown" => Ok(Self::Unknown),
            other => Err(ValueError::UnknownLabel(other.to_string())),
        }
    }
}

/// Temperature unit shown on the thermostat display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayUnit {
    /// Degrees Celsius (wire 0).
    #[default]
    Celsius,
    /// Degrees Fahrenheit (wire 1).
    Fahrenheit,
}

impl DisplayUnit {
    /// Decodes the wire enumeration.
    #[must_use]
    pub const fn from_wire(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Self::Celsius),
            1 => Some(Self::Fahrenheit),
            _ => None,
        }
    }

    /// Returns the wire enumeration.
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Celsius => 0,
            Self::Fahrenheit => 1,
        }
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Celsius => f.write_str("°C"),
            Self::Fahrenheit => f.write_str("°F"),
        }
    }
}
