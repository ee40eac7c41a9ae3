// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event types.

use serde::{Deserialize, Serialize};

use crate::availability::Availability;
use crate::capabilities::{CapabilityDiff, CapabilityId};
use crate::state::StateChange;
use crate::types::SensorMode;

use super::DeviceId;

/// Events emitted by a device task.
///
/// # Examples
///
/// ```
/// use thermolink::event::{DeviceEvent, DeviceId};
/// use thermolink::state::StateChange;
///
/// let device_id = DeviceId::new();
/// let event = DeviceEvent::state_changed(device_id, StateChange::Frost(true));
/// assert!(event.is_state_change());
/// assert_eq!(event.device_id(), device_id);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// The initial read sequence completed.
    Attached {
        /// The device.
        device_id: DeviceId,
    },

    /// The device task stopped.
    Detached {
        /// The device.
        device_id: DeviceId,
    },

    /// A semantic value changed.
    StateChanged {
        /// The device.
        device_id: DeviceId,
        /// The change that occurred.
        change: StateChange,
    },

    /// Capabilities were added or removed after a sensor mode report.
    CapabilitiesReconciled {
        /// The device.
        device_id: DeviceId,
        /// Mode that drove the reconciliation.
        sensor_mode: SensorMode,
        /// Capabilities ensured present.
        added: Vec<CapabilityId>,
        /// Capabilities ensured absent.
        removed: Vec<CapabilityId>,
    },

    /// Availability changed.
    AvailabilityChanged {
        /// The device.
        device_id: DeviceId,
        /// New availability.
        availability: Availability,
    },

    /// A warning was shown to the user.
    Warning {
        /// The device.
        device_id: DeviceId,
        /// Warning text.
        message: String,
    },
}

impl DeviceEvent {
    /// Returns the device ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        match self {
            Self::Attached { device_id }
            | Self::Detached { device_id }
            | Self::StateChanged { device_id, .. }
            | Self::CapabilitiesReconciled { device_id, .. }
            | Self::AvailabilityChanged { device_id, .. }
            | Self::Warning { device_id, .. } => *device_id,
        }
    }

    /// Returns `true` for attach/detach events.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::Attached { .. } | Self::Detached { .. })
    }

    /// Returns `true` for state change events.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Creates a state changed event.
    #[must_use]
    pub fn state_changed(device_id: DeviceId, change: StateChange) -> Self {
        Self::StateChanged { device_id, change }
    }

    /// Creates a reconciliation event from a diff.
    #[must_use]
    pub fn reconciled(device_id: DeviceId, sensor_mode: SensorMode, diff: &CapabilityDiff) -> Self {
        Self::CapabilitiesReconciled {
            device_id,
            sensor_mode,
            added: diff.to_add.iter().collect(),
            removed: diff.to_remove.iter().collect(),
        }
    }
}
