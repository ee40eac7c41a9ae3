// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Regulator output percentage.
//!
//! The wire carries a whole percentage (0-100); the capability exposes it
//! as a fraction between 0.0 and 1.0.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Heating output used in regulator mode.
///
/// # Examples
///
/// ```
/// use thermolink::types::RegulatorPercentage;
///
/// let pct = RegulatorPercentage::new(35).unwrap();
/// assert!((pct.as_fraction() - 0.35).abs() < f64::EPSILON);
///
/// let from_ui = RegulatorPercentage::from_fraction(0.2).unwrap();
/// assert_eq!(from_ui.value(), 20);
///
/// assert!(RegulatorPercentage::new(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegulatorPercentage(u8);

impl RegulatorPercentage {
    /// 0%.
    pub const MIN: Self = Self(0);

    /// 100%.
    pub const MAX: Self = Self(100);

    /// Creates a percentage from its wire value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0.0,
                max: 100.0,
                actual: f64::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a percentage, clamping to 100.
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Returns the wire percentage.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns the value as a fraction between 0.0 and 1.0.
    #[must_use]
    pub fn as_fraction(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Creates a percentage from a fraction between 0.0 and 1.0.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the fraction is outside [0.0, 1.0].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_fraction(fraction: f64) -> Result<Self, ValueError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ValueError::OutOfRange {
                min: 0.0,
                max: 1.0,
                actual: fraction,
            });
        }
        // In 0..=100 after the range check.
        Ok(Self((fraction * 100.0).round() as u8))
    }
}

impl fmt::Display for RegulatorPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for RegulatorPercentage {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
