// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mode state machine.
//!
//! Both the sensor mode and the system mode are owned by the hardware. They
//! change only through reports; the local request path for the sensor mode
//! is disabled because switching it needs a physical reconfiguration.

use crate::types::{SensorMode, SystemMode};

/// Message shown when the regulator boundary is crossed.
pub const REGULATOR_CHANGED_WARNING: &str =
    "The regulator mode has changed. Please return and trigger the switch to reboot the device.";

/// Outcome of a sensor mode report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorModeTransition {
    /// Mode before the report, `None` if none was observed or restored.
    pub previous: Option<SensorMode>,
    /// Mode after the report.
    pub current: SensorMode,
}

impl SensorModeTransition {
    /// Returns `true` when the report moved into or out of regulator mode.
    ///
    /// The first mode ever seen crosses nothing.
    #[must_use]
    pub fn crosses_regulator_boundary(&self) -> bool {
        self.crossed_from().is_some()
    }

    /// Mode left behind when the report crossed the regulator boundary.
    #[must_use]
    pub fn crossed_from(&self) -> Option<SensorMode> {
        self.previous
            .filter(|previous| previous.is_regulator() != self.current.is_regulator())
    }

    /// Returns `true` if the mode actually changed.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.previous != Some(self.current)
    }
}

/// Outcome of a local sensor mode change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorModeRequest {
    /// The request was recorded and dropped.
    Ignored {
        /// Mode that was asked for.
        requested: SensorMode,
    },
}

/// Owns the sensor mode and the last observed system mode.
///
/// A machine built with [`Default`] has seen no sensor mode yet, so its
/// first report never counts as a boundary crossing.
///
/// # Examples
///
/// ```
/// use thermolink::mode::ModeStateMachine;
/// use thermolink::types::{SensorMode, SystemMode};
///
/// let mut modes = ModeStateMachine::new(SensorMode::Auto);
/// assert_eq!(modes.last_system_mode(), SystemMode::Heat);
///
/// let transition = modes.on_sensor_mode(SensorMode::Regulator);
/// assert!(transition.crosses_regulator_boundary());
///
/// let repeat = modes.on_sensor_mode(SensorMode::Regulator);
/// assert!(!repeat.crosses_regulator_boundary());
///
/// let mut fresh = ModeStateMachine::default();
/// assert!(!fresh.on_sensor_mode(SensorMode::Regulator).crosses_regulator_boundary());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModeStateMachine {
    sensor_mode: Option<SensorMode>,
    system_mode: Option<SystemMode>,
}

impl ModeStateMachine {
    /// Creates a machine seeded with the persisted sensor mode.
    #[must_use]
    pub fn new(sensor_mode: SensorMode) -> Self {
        Self {
            sensor_mode: Some(sensor_mode),
            system_mode: None,
        }
    }

    /// Current sensor mode, if one was restored or reported.
    #[must_use]
    pub fn sensor_mode(&self) -> Option<SensorMode> {
        self.sensor_mode
    }

    /// System mode, if one was ever observed.
    #[must_use]
    pub fn system_mode(&self) -> Option<SystemMode> {
        self.system_mode
    }

    /// Last observed system mode, heat if none was observed.
    #[must_use]
    pub fn last_system_mode(&self) -> SystemMode {
        self.system_mode.unwrap_or_default()
    }

    /// Restores a persisted system mode without treating it as a report.
    pub fn restore_system_mode(&mut self, mode: SystemMode) {
        self.system_mode.get_or_insert(mode);
    }

    /// Applies a sensor mode report.
    pub fn on_sensor_mode(&mut self, mode: SensorMode) -> SensorModeTransition {
        let previous = self.sensor_mode.replace(mode);
        SensorModeTransition {
            previous,
            current: mode,
        }
    }

    /// Applies a system mode report. Returns `true` if it changed.
    pub fn on_system_mode(&mut self, mode: SystemMode) -> bool {
        self.system_mode.replace(mode) != Some(mode)
    }

    /// Handles a local request to change the sensor mode.
    ///
    /// Always ignored: the sensor mode is firmware configuration.
    #[must_use]
    pub fn request_sensor_mode(&self, requested: SensorMode) -> SensorModeRequest {
        tracing::info!(
            current = ?self.sensor_mode,
            requested = %requested,
            "Sensor mode change requested, ignoring"
        );
        SensorModeRequest::Ignored { requested }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_heat() {
        let modes = ModeStateMachine::default();
        assert_eq!(modes.system_mode(), None);
        assert_eq!(modes.last_system_mode(), SystemMode::Heat);
    }

    #[test]
    fn system_mode_reports() {
        let mut modes = ModeStateMachine::default();
        assert!(modes.on_system_mode(SystemMode::Cool));
        assert!(!modes.on_system_mode(SystemMode::Cool));
        assert_eq!(modes.last_system_mode(), SystemMode::Cool);
    }

    #[test]
    fn restore_does_not_override_report() {
        let mut modes = ModeStateMachine::default();
        modes.on_system_mode(SystemMode::Cool);
        modes.restore_system_mode(SystemMode::Heat);
        assert_eq!(modes.last_system_mode(), SystemMode::Cool);
    }

    #[test]
    fn boundary_crossings() {
        let mut modes = ModeStateMachine::new(SensorMode::Auto);
        assert!(!modes.on_sensor_mode(SensorMode::FloorProbe).crosses_regulator_boundary());
        assert!(modes.on_sensor_mode(SensorMode::Regulator).crosses_regulator_boundary());
        let same = modes.on_sensor_mode(SensorMode::Regulator);
        assert!(!same.crosses_regulator_boundary());
        assert!(!same.is_change());
        let left = modes.on_sensor_mode(SensorMode::Unknown);
        assert_eq!(left.crossed_from(), Some(SensorMode::Regulator));
    }

    #[test]
    fn first_observed_mode_crosses_nothing() {
        let mut modes = ModeStateMachine::default();
        assert_eq!(modes.sensor_mode(), None);

        let first = modes.on_sensor_mode(SensorMode::Regulator);
        assert!(first.is_change());
        assert!(!first.crosses_regulator_boundary());
        assert_eq!(first.previous, None);

        let next = modes.on_sensor_mode(SensorMode::Auto);
        assert_eq!(next.crossed_from(), Some(SensorMode::Regulator));
    }

    #[test]
    fn requests_are_ignored() {
        let modes = ModeStateMachine::new(SensorMode::Auto);
        assert_eq!(
            modes.request_sensor_mode(SensorMode::Regulator),
            SensorModeRequest::Ignored {
                requested: SensorMode::Regulator
            }
        );
        assert_eq!(modes.sensor_mode(), Some(SensorMode::Auto));
    }
}
