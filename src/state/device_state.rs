// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state tracking.

use serde::{Deserialize, Serialize};

use crate::availability::Availability;
use crate::limits::{HardwareLimits, SetpointLimits};
use crate::types::{DisplayUnit, FaultCode, RegulatorPercentage, SensorMode, SystemMode};

use super::StateChange;

/// Tracked state of one thermostat.
///
/// Created at attach time with conservative defaults, refined by the
/// initial read and then kept current by reports. Readings are optional
/// because they are unknown until the device reports them.
///
/// # Examples
///
/// ```
/// use thermolink::state::{DeviceState, StateChange};
///
/// let mut state = DeviceState::new();
/// state.apply(&StateChange::TargetTemperature(21.5));
/// assert_eq!(state.target_temperature(), Some(21.5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    system_mode: Option<SystemMode>,
    sensor_mode: SensorMode,
    display_unit: DisplayUnit,
    hardware_limits: HardwareLimits,
    setpoint_limits: SetpointLimits,
    last_fault: Option<FaultCode>,
    target_temperature: Option<f64>,
    local_temperature: Option<f64>,
    on: Option<bool>,
    power: Option<f64>,
    energy: Option<f64>,
    frost: Option<bool>,
    eco_mode: Option<bool>,
    window_open: Option<bool>,
    child_lock: Option<bool>,
    regulator_percentage: Option<RegulatorPercentage>,
    availability: Availability,
}

impl DeviceState {
    /// Creates a state with built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state with the given starting limits.
    #[must_use]
    pub fn with_limits(hardware_limits: HardwareLimits, setpoint_limits: SetpointLimits) -> Self {
        Self {
            hardware_limits,
            setpoint_limits,
            ..Self::default()
        }
    }

    // ========== Modes ==========

    /// System mode, if reported.
    #[must_use]
    pub fn system_mode(&self) -> Option<SystemMode> {
        self.system_mode
    }

    /// Sensor mode.
    #[must_use]
    pub fn sensor_mode(&self) -> SensorMode {
        self.sensor_mode
    }

    /// Display unit.
    #[must_use]
    pub fn display_unit(&self) -> DisplayUnit {
        self.display_unit
    }

    // ========== Limits ==========

    /// Hardware-reported limits per mode and unit.
    #[must_use]
    pub fn hardware_limits(&self) -> &HardwareLimits {
        &self.hardware_limits
    }

    /// Limits applied to the target temperature.
    #[must_use]
    pub fn setpoint_limits(&self) -> SetpointLimits {
        self.setpoint_limits
    }

    // ========== Readings ==========

    /// Target temperature.
    #[must_use]
    pub fn target_temperature(&self) -> Option<f64> {
        self.target_temperature
    }

    /// Measured temperature.
    #[must_use]
    pub fn local_temperature(&self) -> Option<f64> {
        self.local_temperature
    }

    /// Relay state.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.on
    }

    /// Instantaneous power in watts.
    #[must_use]
    pub fn power(&self) -> Option<f64> {
        self.power
    }

    /// Accumulated energy in kWh.
    #[must_use]
    pub fn energy(&self) -> Option<f64> {
        self.energy
    }

    /// Frost protection flag.
    #[must_use]
    pub fn frost(&self) -> Option<bool> {
        self.frost
    }

    /// Eco program flag.
    #[must_use]
    pub fn eco_mode(&self) -> Option<bool> {
        self.eco_mode
    }

    /// Window open flag.
    #[must_use]
    pub fn window_open(&self) -> Option<bool> {
        self.window_open
    }

    /// Keypad lock flag.
    #[must_use]
    pub fn child_lock(&self) -> Option<bool> {
        self.child_lock
    }

    /// Last fault reported.
    #[must_use]
    pub fn last_fault(&self) -> Option<FaultCode> {
        self.last_fault
    }

    /// Regulator output.
    #[must_use]
    pub fn regulator_percentage(&self) -> Option<RegulatorPercentage> {
        self.regulator_percentage
    }

    /// Availability as last reported to the host.
    #[must_use]
    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    // ========== State Changes ==========

    /// Applies a change to the state.
    ///
    /// Returns `true` if the state actually changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match change {
            StateChange::SystemMode(mode) => replace(&mut self.system_mode, Some(*mode)),
            StateChange::SensorMode(mode) => replace(&mut self.sensor_mode, *mode),
            StateChange::DisplayUnit(unit) => replace(&mut self.display_unit, *unit),
            StateChange::HardwareLimits(limits) => replace(&mut self.hardware_limits, *limits),
            StateChange::SetpointLimits(limits) => replace(&mut self.setpoint_limits, *limits),
            StateChange::TargetTemperature(t) => replace(&mut self.target_temperature, Some(*t)),
            StateChange::LocalTemperature(t) => replace(&mut self.local_temperature, Some(*t)),
            StateChange::OnOff(on) => replace(&mut self.on, Some(*on)),
            StateChange::Power(watts) => replace(&mut self.power, Some(*watts)),
            StateChange::Energy(kwh) => replace(&mut self.energy, Some(*kwh)),
            StateChange::Frost(on) => replace(&mut self.frost, Some(*on)),
            StateChange::EcoMode(on) => replace(&mut self.eco_mode, Some(*on)),
            StateChange::WindowOpen(open) => replace(&mut self.window_open, Some(*open)),
            StateChange::ChildLock(locked) => replace(&mut self.child_lock, Some(*locked)),
            StateChange::Fault(code) => replace(&mut self.last_fault, Some(*code)),
            StateChange::RegulatorPercentage(pct) => {
                replace(&mut self.regulator_percentage, Some(*pct))
            }
            StateChange::Availability(availability) => {
                replace(&mut self.availability, availability.clone())
            }
            StateChange::Batch(changes) => {
                let mut changed = false;
                for c in changes {
                    changed |= self.apply(c);
                }
                changed
            }
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
