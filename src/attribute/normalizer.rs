// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw-to-semantic attribute conversion.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::NormalizationError;
use crate::types::{
    DisplayUnit, FaultCode, ProgramMode, RegulatorPercentage, SensorMode, SystemMode, Temperature,
};

use super::{Attribute, RawValue};

const SECONDS_PER_DAY: i64 = 86_400;

/// A normalized attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SemanticValue {
    /// Temperature in the attribute's unit.
    Temperature(Temperature),
    /// Flag.
    Bool(bool),
    /// Heat/cool mode.
    SystemMode(SystemMode),
    /// Sensing strategy.
    SensorMode(SensorMode),
    /// Display unit.
    DisplayUnit(DisplayUnit),
    /// Fault bitmap.
    Fault(FaultCode),
    /// Program operating mode bitmap.
    ProgramMode(ProgramMode),
    /// Regulator output.
    Percentage(RegulatorPercentage),
    /// Instantaneous power in watts.
    Power(f64),
    /// Accumulated energy in kWh.
    Energy(f64),
    /// Calendar date.
    Date(NaiveDate),
    /// Duration in minutes.
    Minutes(u32),
    /// Plain integer (backlight timeout, scale components).
    Integer(i64),
}

/// Multiplier applied to power and energy counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors {
    /// Watts per raw `activePower` unit.
    pub power: f64,
    /// kWh per raw `currentSummationDelivered` unit.
    pub energy: f64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self {
            power: 1.0,
            energy: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ScalePair {
    multiplier: Option<i64>,
    divisor: Option<i64>,
}

impl ScalePair {
    #[allow(clippy::cast_precision_loss)]
    fn factor(self) -> Option<f64> {
        match (self.multiplier, self.divisor) {
            (Some(m), Some(d)) if m != 0 && d != 0 => Some(m as f64 / d as f64),
            _ => None,
        }
    }
}

/// Converts raw wire values into semantic values.
///
/// Normalization is a pure function of the attribute, the raw value and
/// the cached scale factors. Scale factors only change through
/// [`Normalizer::update_scale`].
///
/// # Examples
///
/// ```
/// use thermolink::attribute::{Attribute, Normalizer, RawValue, SemanticValue};
/// use thermolink::types::Temperature;
///
/// let normalizer = Normalizer::default();
/// let value = normalizer
///     .normalize(Attribute::LocalTemperature, RawValue::Int(2137))
///     .unwrap();
/// assert_eq!(value, SemanticValue::Temperature(Temperature::from_degrees(21.4)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    scales: ScaleFactors,
    power_pair: ScalePair,
    energy_pair: ScalePair,
}

impl Normalizer {
    /// Creates a normalizer with the given fallback scale factors.
    #[must_use]
    pub fn new(scales: ScaleFactors) -> Self {
        Self {
            scales,
            power_pair: ScalePair::default(),
            energy_pair: ScalePair::default(),
        }
    }

    /// Returns the scale factors currently in effect.
    #[must_use]
    pub fn scales(&self) -> ScaleFactors {
        self.scales
    }

    /// Records a multiplier or divisor component.
    ///
    /// Once both components of a pair are known and non-zero, the matching
    /// scale factor becomes `multiplier / divisor`. Returns `true` if a
    /// scale factor changed.
    pub fn update_scale(&mut self, attribute: Attribute, value: i64) -> bool {
        let (pair, slot) = match attribute {
            Attribute::AcPowerMultiplier | Attribute::AcPowerDivisor => {
                (&mut self.power_pair, &mut self.scales.power)
            }
            Attribute::MeteringMultiplier | Attribute::MeteringDivisor => {
                (&mut self.energy_pair, &mut self.scales.energy)
            }
            _ => return false,
        };

        if matches!(
            attribute,
            Attribute::AcPowerMultiplier | Attribute::MeteringMultiplier
        ) {
            pair.multiplier = Some(value);
        } else {
            pair.divisor = Some(value);
        }

        match pair.factor() {
            Some(factor) if (factor - *slot).abs() > f64::EPSILON => {
                tracing::debug!(attribute = %attribute, factor, "Scale factor updated");
                *slot = factor;
                true
            }
            _ => false,
        }
    }

    /// Normalizes one raw attribute value.
    ///
    /// # Errors
    ///
    /// Returns a [`NormalizationError`] when the raw value has the wrong
    /// shape, lies outside the attribute's wire domain, or has no semantic
    /// meaning (for example a system mode other than heat or cool).
    pub fn normalize(
        &self,
        attribute: Attribute,
        raw: RawValue,
    ) -> Result<SemanticValue, NormalizationError> {
        if attribute.is_temperature() {
            return decode_int16(attribute, raw)
                .map(|v| SemanticValue::Temperature(Temperature::from_centi(v)));
        }

        match attribute {
            Attribute::OnOff
            | Attribute::Frost
            | Attribute::WindowState
            | Attribute::WindowCheck
            | Attribute::SyncTimeReq
            | Attribute::VacationMode
            | Attribute::AutoTime => decode_bool(attribute, raw).map(SemanticValue::Bool),

            Attribute::KeypadLockout => {
                non_negative(attribute, raw).map(|level| SemanticValue::Bool(level >= 1))
            }

            Attribute::SystemMode | Attribute::ThermostatRunningMode => {
                let value = int(attribute, raw)?;
                SystemMode::from_wire(value)
                    .map(SemanticValue::SystemMode)
                    .ok_or(NormalizationError::UnsupportedValue {
                        attribute,
                        raw: value,
                    })
            }

            Attribute::SensorMode => {
                int(attribute, raw).map(|v| SemanticValue::SensorMode(SensorMode::from_wire(v)))
            }

            Attribute::TemperatureDisplayMode => {
                let value = int(attribute, raw)?;
                DisplayUnit::from_wire(value)
                    .map(SemanticValue::DisplayUnit)
                    .ok_or(NormalizationError::UnsupportedValue {
                        attribute,
                        raw: value,
                    })
            }

            Attribute::Fault => {
                bitmap(attribute, raw).map(|b| SemanticValue::Fault(FaultCode::new(b)))
            }
            Attribute::ProgramOperMode => {
                bitmap(attribute, raw).map(|b| SemanticValue::ProgramMode(ProgramMode::new(b)))
            }

            Attribute::RegulatorPercentage => {
                let value = int(attribute, raw)?;
                u8::try_from(value)
                    .ok()
                    .and_then(|v| RegulatorPercentage::new(v).ok())
                    .map(SemanticValue::Percentage)
                    .ok_or(NormalizationError::OutOfDomain {
                        attribute,
                        raw: value,
                    })
            }

            Attribute::ActivePower => {
                let value = decode_int16(attribute, raw)?;
                Ok(SemanticValue::Power(f64::from(value) * self.scales.power))
            }

            Attribute::CurrentSummationDelivered => {
                let value = non_negative(attribute, raw)?;
                #[allow(clippy::cast_precision_loss)]
                Ok(SemanticValue::Energy(value as f64 * self.scales.energy))
            }

            Attribute::VacationStartDate | Attribute::VacationEndDate => {
                let days = non_negative(attribute, raw)?;
                days.checked_mul(SECONDS_PER_DAY)
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .map(|dt| SemanticValue::Date(dt.date_naive()))
                    .ok_or(NormalizationError::OutOfDomain { attribute, raw: days })
            }

            Attribute::CountdownSet | Attribute::CountdownLeft => {
                let value = non_negative(attribute, raw)?;
                u32::try_from(value)
                    .map(SemanticValue::Minutes)
                    .map_err(|_| NormalizationError::OutOfDomain { attribute, raw: value })
            }

            Attribute::Backlight
            | Attribute::MeteringMultiplier
            | Attribute::MeteringDivisor
            | Attribute::AcPowerMultiplier
            | Attribute::AcPowerDivisor => non_negative(attribute, raw).map(SemanticValue::Integer),

            Attribute::SyncTime => Err(NormalizationError::WriteOnly(attribute)),

            // Temperatures are handled above.
            _ => decode_int16(attribute, raw)
                .map(|v| SemanticValue::Temperature(Temperature::from_centi(v))),
        }
    }
}

fn int(attribute: Attribute, raw: RawValue) -> Result<i64, NormalizationError> {
    match raw {
        RawValue::Int(v) => Ok(v),
        _ => Err(NormalizationError::TypeMismatch {
            attribute,
            expected: "integer",
        }),
    }
}

fn non_negative(attribute: Attribute, raw: RawValue) -> Result<i64, NormalizationError> {
    let value = int(attribute, raw)?;
    if value < 0 {
        return Err(NormalizationError::OutOfDomain { attribute, raw: value });
    }
    Ok(value)
}

/// Reads a signed 16-bit wire value.
///
/// Unsigned readings above `i16::MAX` are reinterpreted as two's complement,
/// as transports commonly hand int16 fields over as `u16`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn decode_int16(attribute: Attribute, raw: RawValue) -> Result<i16, NormalizationError> {
    let value = int(attribute, raw)?;
    match value {
        v if (i64::from(i16::MIN)..=i64::from(i16::MAX)).contains(&v) => Ok(v as i16),
        // Range checked, the truncation keeps the low 16 bits.
        v if (0..=i64::from(u16::MAX)).contains(&v) => Ok(v as u16 as i16),
        v => Err(NormalizationError::OutOfDomain { attribute, raw: v }),
    }
}

fn decode_bool(attribute: Attribute, raw: RawValue) -> Result<bool, NormalizationError> {
    match raw {
        RawValue::Bool(b) => Ok(b),
        RawValue::Int(0) => Ok(false),
        RawValue::Int(1) => Ok(true),
        RawValue::Int(v) => Err(NormalizationError::OutOfDomain { attribute, raw: v }),
        RawValue::Bitmap(_) => Err(NormalizationError::TypeMismatch {
            attribute,
            expected: "boolean",
        }),
    }
}

fn bitmap(attribute: Attribute, raw: RawValue) -> Result<u32, NormalizationError> {
    match raw {
        RawValue::Bitmap(bits) => Ok(bits),
        RawValue::Int(v) => {
            u32::try_from(v).map_err(|_| NormalizationError::OutOfDomain { attribute, raw: v })
        }
        RawValue::Bool(_) => Err(NormalizationError::TypeMismatch {
            attribute,
            expected: "bitmap",
        }),
    }
}
