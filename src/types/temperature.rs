// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-point temperature handling.
//!
//! The thermostat exchanges temperatures as signed 16-bit integers holding
//! hundredths of a degree. [`Temperature`] is the semantic side of that
//! encoding, always rounded to one decimal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// A temperature in the device's display unit, rounded to 0.1 degree.
///
/// # Examples
///
/// ```
/// use thermolink::types::Temperature;
///
/// let t = Temperature::from_centi(2256);
/// assert!((t.degrees() - 22.6).abs() < f64::EPSILON);
///
/// let negative = Temperature::from_centi(-1234);
/// assert!((negative.degrees() + 12.3).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    /// Creates a temperature from the fixed-point wire value.
    #[must_use]
    pub fn from_centi(raw: i16) -> Self {
        // Tenths first: halves stay exact before rounding.
        Self((f64::from(raw) / 10.0).round() / 10.0)
    }

    /// Creates a temperature from a value already expressed in degrees.
    ///
    /// The value is rounded to one decimal, so re-normalizing an existing
    /// temperature leaves it unchanged.
    #[must_use]
    pub fn from_degrees(degrees: f64) -> Self {
        Self(round_tenth(degrees))
    }

    /// Returns the value in degrees.
    #[must_use]
    pub const fn degrees(self) -> f64 {
        self.0
    }

    /// Converts back to the fixed-point wire value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the scaled value does not fit in
    /// a signed 16-bit integer or is not finite.
    pub fn to_centi(self) -> Result<i16, ValueError> {
        to_centi(self.0)
    }
}

/// Scales a degree value ×100 into the fixed-point wire format.
///
/// # Errors
///
/// Returns `ValueError::OutOfRange` if the result does not fit in `i16`.
#[allow(clippy::cast_possible_truncation)]
pub fn to_centi(degrees: f64) -> Result<i16, ValueError> {
    let scaled = (degrees * 100.0).round();
    if !scaled.is_finite() || scaled < f64::from(i16::MIN) || scaled > f64::from(i16::MAX) {
        return Err(ValueError::OutOfRange {
            min: f64::from(i16::MIN) / 100.0,
            max: f64::from(i16::MAX) / 100.0,
            actual: degrees,
        });
    }
    // Range checked above.
    Ok(scaled as i16)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

impl From<Temperature> for f64 {
    fn from(t: Temperature) -> Self {
        t.0
    }
}
