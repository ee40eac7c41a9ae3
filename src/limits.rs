// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Setpoint limit engine.
//!
//! The thermostat reports four pairs of absolute setpoint limits, one per
//! (system mode × display unit). The pair matching the current mode and
//! unit becomes the [`SetpointLimits`] applied to the target temperature
//! capability.
//!
//! # Examples
//!
//! ```
//! use thermolink::limits::{HardwareLimits, recompute};
//! use thermolink::types::{DisplayUnit, SystemMode};
//!
//! let hw = HardwareLimits::default();
//! let limits = recompute(SystemMode::Cool, DisplayUnit::Celsius, &hw).unwrap();
//! assert_eq!((limits.min, limits.max), (10.0, 40.0));
//! assert_eq!(limits.decimals, 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::error::LimitViolation;
use crate::types::{DisplayUnit, SystemMode, Temperature};

/// Step of the target temperature capability.
pub const SETPOINT_STEP: f64 = 0.5;

/// A (min, max) temperature pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitPair {
    /// Lowest allowed setpoint.
    pub min: f64,
    /// Highest allowed setpoint.
    pub max: f64,
}

impl LimitPair {
    /// Creates a pair without validating it.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns `true` when `min < max`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min < self.max
    }
}

/// Which end of a limit pair an attribute reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Lower limit.
    Min,
    /// Upper limit.
    Max,
}

/// Hardware-reported absolute setpoint limits.
///
/// Each pair starts at a conservative built-in bound and is overridden by
/// the matching `absMin*`/`absMax*` report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareLimits {
    /// Heating, Celsius.
    pub heat_celsius: LimitPair,
    /// Heating, Fahrenheit.
    pub heat_fahrenheit: LimitPair,
    /// Cooling, Celsius.
    pub cool_celsius: LimitPair,
    /// Cooling, Fahrenheit.
    pub cool_fahrenheit: LimitPair,
}

impl Default for HardwareLimits {
    fn default() -> Self {
        Self {
            heat_celsius: LimitPair::new(5.0, 35.0),
            heat_fahrenheit: LimitPair::new(41.0, 95.0),
            cool_celsius: LimitPair::new(10.0, 40.0),
            cool_fahrenheit: LimitPair::new(50.0, 104.0),
        }
    }
}

impl HardwareLimits {
    /// Returns the pair for a mode and unit.
    #[must_use]
    pub fn select(&self, mode: SystemMode, unit: DisplayUnit) -> LimitPair {
        match (mode, unit) {
            (SystemMode::Heat, DisplayUnit::Celsius) => self.heat_celsius,
            (SystemMode::Heat, DisplayUnit::Fahrenheit) => self.heat_fahrenheit,
            (SystemMode::Cool, DisplayUnit::Celsius) => self.cool_celsius,
            (SystemMode::Cool, DisplayUnit::Fahrenheit) => self.cool_fahrenheit,
        }
    }

    fn select_mut(&mut self, mode: SystemMode, unit: DisplayUnit) -> &mut LimitPair {
        match (mode, unit) {
            (SystemMode::Heat, DisplayUnit::Celsius) => &mut self.heat_celsius,
            (SystemMode::Heat, DisplayUnit::Fahrenheit) => &mut self.heat_fahrenheit,
            (SystemMode::Cool, DisplayUnit::Celsius) => &mut self.cool_celsius,
            (SystemMode::Cool, DisplayUnit::Fahrenheit) => &mut self.cool_fahrenheit,
        }
    }

    /// Maps a limit attribute to the slot it reports.
    #[must_use]
    pub const fn slot(attribute: Attribute) -> Option<(SystemMode, DisplayUnit, Bound)> {
        use DisplayUnit::{Celsius, Fahrenheit};
        use SystemMode::{Cool, Heat};

        Some(match attribute {
            Attribute::AbsMinHeatSetpointLimit => (Heat, Celsius, Bound::Min),
            Attribute::AbsMaxHeatSetpointLimit => (Heat, Celsius, Bound::Max),
            Attribute::AbsMinCoolSetpointLimit => (Cool, Celsius, Bound::Min),
            Attribute::AbsMaxCoolSetpointLimit => (Cool, Celsius, Bound::Max),
            Attribute::AbsMinHeatSetpointLimitF => (Heat, Fahrenheit, Bound::Min),
            Attribute::AbsMaxHeatSetpointLimitF => (Heat, Fahrenheit, Bound::Max),
            Attribute::AbsMinCoolSetpointLimitF => (Cool, Fahrenheit, Bound::Min),
            Attribute::AbsMaxCoolSetpointLimitF => (Cool, Fahrenheit, Bound::Max),
            _ => return None,
        })
    }

    /// Stores a hardware-reported limit.
    ///
    /// Returns `true` if `attribute` is a limit attribute and its stored
    /// value changed. The pair is stored even if it is momentarily invalid;
    /// validation happens in [`recompute`].
    pub fn update(&mut self, attribute: Attribute, value: Temperature) -> bool {
        let Some((mode, unit, bound)) = Self::slot(attribute) else {
            return false;
        };
        let pair = self.select_mut(mode, unit);
        let field = match bound {
            Bound::Min => &mut pair.min,
            Bound::Max => &mut pair.max,
        };
        let degrees = value.degrees();
        if (*field - degrees).abs() < f64::EPSILON {
            return false;
        }
        *field = degrees;
        true
    }
}

/// Bounds applied to the target temperature capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetpointLimits {
    /// Lowest accepted target.
    pub min: f64,
    /// Highest accepted target.
    pub max: f64,
    /// Increment.
    pub step: f64,
    /// Decimals shown.
    pub decimals: u8,
}

impl SetpointLimits {
    /// Builds limits from a pair and a step.
    ///
    /// # Errors
    ///
    /// Returns [`LimitViolation`] when `min >= max`.
    pub fn new(pair: LimitPair, step: f64) -> Result<Self, LimitViolation> {
        if !pair.is_valid() {
            return Err(LimitViolation {
                min: pair.min,
                max: pair.max,
            });
        }
        Ok(Self {
            min: pair.min,
            max: pair.max,
            step,
            decimals: if step >= 0.5 { 1 } else { 2 },
        })
    }

    /// Returns `true` if `value` lies within `[min, max]`.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Lowers `value` to `max` if it exceeds it.
    ///
    /// Values below `min` are left alone: the target is never raised.
    #[must_use]
    pub fn clamp_down(&self, value: f64) -> Option<f64> {
        (value > self.max).then_some(self.max)
    }
}

impl Default for SetpointLimits {
    fn default() -> Self {
        Self {
            min: 5.0,
            max: 40.0,
            step: SETPOINT_STEP,
            decimals: 1,
        }
    }
}

/// Derives the target temperature limits for a mode and unit.
///
/// # Errors
///
/// Returns [`LimitViolation`] when the selected hardware pair has
/// `min >= max`. Callers keep their previous limits in that case.
pub fn recompute(
    mode: SystemMode,
    unit: DisplayUnit,
    hardware: &HardwareLimits,
) -> Result<SetpointLimits, LimitViolation> {
    SetpointLimits::new(hardware.select(mode, unit), SETPOINT_STEP)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [SystemMode; 2] = [SystemMode::Heat, SystemMode::Cool];
    const UNITS: [DisplayUnit; 2] = [DisplayUnit::Celsius, DisplayUnit::Fahrenheit];

    #[test]
    fn defaults_per_mode_and_unit() {
        let hw = HardwareLimits::default();
        let expect = [
            (SystemMode::Heat, DisplayUnit::Celsius, (5.0, 35.0)),
            (SystemMode::Heat, DisplayUnit::Fahrenheit, (41.0, 95.0)),
            (SystemMode::Cool, DisplayUnit::Celsius, (10.0, 40.0)),
            (SystemMode::Cool, DisplayUnit::Fahrenheit, (50.0, 104.0)),
        ];
        for (mode, unit, (min, max)) in expect {
            let limits = recompute(mode, unit, &hw).unwrap();
            assert_eq!((limits.min, limits.max), (min, max), "{mode} {unit}");
            assert!((limits.step - 0.5).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn invalid_pair_is_rejected_for_every_combination() {
        for mode in MODES {
            for unit in UNITS {
                let mut hw = HardwareLimits::default();
                let before = recompute(mode, unit, &hw).unwrap();
                let pair = hw.select_mut(mode, unit);
                pair.min = 30.0;
                pair.max = 30.0;
                assert_eq!(
                    recompute(mode, unit, &hw),
                    Err(LimitViolation { min: 30.0, max: 30.0 })
                );
                // The other combinations keep working.
                let other = if mode == SystemMode::Heat {
                    SystemMode::Cool
                } else {
                    SystemMode::Heat
                };
                assert!(recompute(other, unit, &hw).is_ok());
                assert!(before.min < before.max);
            }
        }
    }

    #[test]
    fn update_routes_to_slot() {
        let mut hw = HardwareLimits::default();
        assert!(hw.update(
            Attribute::AbsMinCoolSetpointLimit,
            Temperature::from_degrees(18.0)
        ));
        assert!(hw.update(
            Attribute::AbsMaxCoolSetpointLimit,
            Temperature::from_degrees(28.0)
        ));
        assert_eq!(hw.cool_celsius, LimitPair::new(18.0, 28.0));
        assert_eq!(hw.heat_celsius, LimitPair::new(5.0, 35.0));
    }

    #[test]
    fn update_ignores_unchanged_and_unrelated() {
        let mut hw = HardwareLimits::default();
        assert!(!hw.update(
            Attribute::AbsMinHeatSetpointLimit,
            Temperature::from_degrees(5.0)
        ));
        assert!(!hw.update(Attribute::LocalTemperature, Temperature::from_degrees(5.0)));
    }

    #[test]
    fn decimals_follow_step() {
        let pair = LimitPair::new(5.0, 30.0);
        assert_eq!(SetpointLimits::new(pair, 0.5).unwrap().decimals, 1);
        assert_eq!(SetpointLimits::new(pair, 0.1).unwrap().decimals, 2);
    }

    #[test]
    fn clamp_only_lowers() {
        let limits = SetpointLimits::new(LimitPair::new(18.0, 28.0), 0.5).unwrap();
        assert_eq!(limits.clamp_down(30.0), Some(28.0));
        assert_eq!(limits.clamp_down(10.0), None);
        assert_eq!(limits.clamp_down(28.0), None);
        assert!(limits.contains(18.0));
        assert!(!limits.contains(28.5));
    }
}
