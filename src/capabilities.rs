// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability model and lifecycle.
//!
//! Capabilities are the control and readout points the host exposes for a
//! device. Which of them exist depends on the sensor mode: regulator mode
//! replaces the temperature controls with a percentage output.
//!
//! The mode to capability-set mapping is a total function
//! ([`CapabilitySet::required_for`]). [`CapabilityLifecycle`] diffs that
//! target against the current membership and hands the host one batch of
//! additions and removals.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::SensorMode;

/// Identifier of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityId {
    /// Relay on/off.
    #[serde(rename = "onoff")]
    OnOff,
    /// Instantaneous power (W).
    MeasurePower,
    /// Accumulated energy (kWh).
    MeterPower,
    /// Window open/closed.
    WindowState,
    /// Keypad lock.
    ChildLock,
    /// Fault code label.
    Fault,
    /// Regulator output (fraction).
    RegulatorPercentage,
    /// Regulator mode indicator switch.
    Regulator,
    /// Target setpoint.
    TargetTemperature,
    /// Measured temperature.
    MeasureTemperature,
    /// Eco program active.
    EcoMode,
    /// Frost protection.
    Frost,
    /// Retired clock display, only ever removed.
    Datetime,
}

impl CapabilityId {
    /// Returns the registry identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnOff => "onoff",
            Self::MeasurePower => "measure_power",
            Self::MeterPower => "meter_power",
            Self::WindowState => "window_state",
            Self::ChildLock => "child_lock",
            Self::Fault => "fault",
            Self::RegulatorPercentage => "regulator_percentage",
            Self::Regulator => "regulator",
            Self::TargetTemperature => "target_temperature",
            Self::MeasureTemperature => "measure_temperature",
            Self::EcoMode => "eco_mode",
            Self::Frost => "frost",
            Self::Datetime => "datetime",
        }
    }

    /// Every known capability.
    pub const ALL: [Self; 13] = [
        Self::OnOff,
        Self::MeasurePower,
        Self::MeterPower,
        Self::WindowState,
        Self::ChildLock,
        Self::Fault,
        Self::RegulatorPercentage,
        Self::Regulator,
        Self::TargetTemperature,
        Self::MeasureTemperature,
        Self::EcoMode,
        Self::Frost,
        Self::Datetime,
    ];

    /// Capabilities that no mode requires and that are always removed.
    pub const RETIRED: [Self; 1] = [Self::Datetime];

    /// Returns `true` if writes from the host are accepted.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(
            self,
            Self::OnOff
                | Self::TargetTemperature
                | Self::Frost
                | Self::ChildLock
                | Self::RegulatorPercentage
        )
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ValueError::UnknownLabel(s.to_string()))
    }
}

/// Value held by a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    /// Switch or flag.
    Bool(bool),
    /// Numeric reading or setpoint.
    Number(f64),
    /// Label.
    Text(String),
}

impl CapabilityValue {
    /// Returns the boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the numeric payload.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for CapabilityValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for CapabilityValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CapabilityValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for CapabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A set of capability identifiers.
///
/// # Examples
///
/// ```
/// use thermolink::capabilities::{CapabilityId, CapabilitySet};
/// use thermolink::types::SensorMode;
///
/// let set = CapabilitySet::required_for(SensorMode::Regulator);
/// assert!(set.contains(CapabilityId::RegulatorPercentage));
/// assert!(set.contains(CapabilityId::OnOff));
/// assert!(!set.contains(CapabilityId::TargetTemperature));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<CapabilityId>);

impl CapabilitySet {
    /// Present in every mode.
    pub const ALWAYS_PRESENT: [CapabilityId; 6] = [
        CapabilityId::OnOff,
        CapabilityId::MeasurePower,
        CapabilityId::MeterPower,
        CapabilityId::WindowState,
        CapabilityId::ChildLock,
        CapabilityId::Fault,
    ];

    /// Present in regulator mode only.
    pub const REGULATOR: [CapabilityId; 2] =
        [CapabilityId::RegulatorPercentage, CapabilityId::Regulator];

    /// Present in every mode except regulator.
    pub const THERMOSTAT: [CapabilityId; 4] = [
        CapabilityId::TargetTemperature,
        CapabilityId::MeasureTemperature,
        CapabilityId::EcoMode,
        CapabilityId::Frost,
    ];

    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the exact set a sensor mode requires.
    #[must_use]
    pub fn required_for(mode: SensorMode) -> Self {
        let specific: &[CapabilityId] = if mode.is_regulator() {
            &Self::REGULATOR
        } else {
            &Self::THERMOSTAT
        };
        Self::ALWAYS_PRESENT
            .iter()
            .chain(specific)
            .copied()
            .collect()
    }

    /// Returns `true` if the set contains `id`.
    #[must_use]
    pub fn contains(&self, id: CapabilityId) -> bool {
        self.0.contains(&id)
    }

    /// Adds `id`, returning `true` if it was absent.
    pub fn insert(&mut self, id: CapabilityId) -> bool {
        self.0.insert(id)
    }

    /// Removes `id`, returning `true` if it was present.
    pub fn remove(&mut self, id: CapabilityId) -> bool {
        self.0.remove(&id)
    }

    /// Number of capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.0.iter().copied()
    }

    /// Members of `self` missing from `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.0.difference(&other.0).copied().collect()
    }
}

impl FromIterator<CapabilityId> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = CapabilityId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Additions and removals that move a capability set to its target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityDiff {
    /// Capabilities to ensure present.
    pub to_add: CapabilitySet,
    /// Capabilities to ensure absent.
    pub to_remove: CapabilitySet,
}

impl CapabilityDiff {
    /// Returns `true` when nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Tracks capability membership for one device.
///
/// # Examples
///
/// ```
/// use thermolink::capabilities::{CapabilityLifecycle, CapabilitySet};
/// use thermolink::types::SensorMode;
///
/// let mut lifecycle = CapabilityLifecycle::new(CapabilitySet::new());
/// let first = lifecycle.reconcile(SensorMode::Auto);
/// assert_eq!(first.to_add.len(), 10);
///
/// let second = lifecycle.reconcile(SensorMode::Auto);
/// assert!(second.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapabilityLifecycle {
    current: CapabilitySet,
}

impl CapabilityLifecycle {
    /// Starts from the membership currently seen in the registry.
    #[must_use]
    pub fn new(current: CapabilitySet) -> Self {
        Self { current }
    }

    /// Returns the membership after the last reconciliation.
    #[must_use]
    pub fn current(&self) -> &CapabilitySet {
        &self.current
    }

    /// Computes the diff to the set `mode` requires and adopts that set.
    ///
    /// Retired capabilities end up in `to_remove` whenever they are still
    /// present. Calling this twice with the same mode yields an empty diff
    /// the second time.
    pub fn reconcile(&mut self, mode: SensorMode) -> CapabilityDiff {
        let target = CapabilitySet::required_for(mode);
        let diff = CapabilityDiff {
            to_add: target.difference(&self.current),
            to_remove: self.current.difference(&target),
        };
        self.current = target;
        diff
    }
}
