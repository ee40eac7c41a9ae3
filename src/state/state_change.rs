// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! A [`StateChange`] is one semantic update to a
//! [`DeviceState`](super::DeviceState), produced from a normalized report
//! or an acknowledged write. Changes are published as events and applied
//! to the state snapshot.
//!
//! # Examples
//!
//! ```
//! use thermolink::state::{DeviceState, StateChange};
//! use thermolink::types::SystemMode;
//!
//! let mut state = DeviceState::new();
//!
//! // Apply returns true if state actually changed
//! assert!(state.apply(&StateChange::SystemMode(SystemMode::Cool)));
//! assert!(!state.apply(&StateChange::SystemMode(SystemMode::Cool)));
//! ```

use serde::{Deserialize, Serialize};

use crate::availability::Availability;
use crate::limits::{HardwareLimits, SetpointLimits};
use crate::types::{DisplayUnit, FaultCode, RegulatorPercentage, SensorMode, SystemMode};

/// A change in device state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateChange {
    /// Heat/cool mode reported.
    SystemMode(SystemMode),

    /// Sensor mode reported.
    SensorMode(SensorMode),

    /// Display unit reported.
    DisplayUnit(DisplayUnit),

    /// A hardware setpoint limit reported.
    HardwareLimits(HardwareLimits),

    /// New limits applied to the target temperature.
    SetpointLimits(SetpointLimits),

    /// Target temperature (display unit).
    TargetTemperature(f64),

    /// Measured temperature (display unit).
    LocalTemperature(f64),

    /// Relay on/off.
    OnOff(bool),

    /// Instantaneous power in watts.
    Power(f64),

    /// Accumulated energy in kWh.
    Energy(f64),

    /// Frost protection flag.
    Frost(bool),

    /// Eco program flag.
    EcoMode(bool),

    /// Window open flag.
    WindowOpen(bool),

    /// Keypad lock flag.
    ChildLock(bool),

    /// Fault bitmap.
    Fault(FaultCode),

    /// Regulator output.
    RegulatorPercentage(RegulatorPercentage),

    /// Availability reported to the host.
    Availability(Availability),

    /// Multiple changes at once.
    Batch(Vec<StateChange>),
}

impl StateChange {
    /// Returns `true` for changes to the mode state.
    #[must_use]
    pub fn is_mode_change(&self) -> bool {
        matches!(
            self,
            Self::SystemMode(_) | Self::SensorMode(_) | Self::DisplayUnit(_)
        )
    }

    /// Returns the number of leaf changes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Batch(changes) => changes.iter().map(Self::len).sum(),
            _ => 1,
        }
    }

    /// Returns `true` for an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
