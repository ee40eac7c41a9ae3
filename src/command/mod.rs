// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability write-back.
//!
//! A write on a capability, or a change in device settings, becomes a wire
//! operation here. The mapping depends on the current mode: a target
//! temperature write lands on the heating or the cooling setpoint, in the
//! attribute variant matching the display unit.
//!
//! | Capability | Wire operation |
//! |------------|----------------|
//! | `onoff` | `setOn` / `setOff` command |
//! | `target_temperature` | `occupied{Heating,Cooling}Setpoint[F]` ×100 |
//! | `frost` | `frost` |
//! | `child_lock` | `keypadLockout` (0/1) |
//! | `regulator_percentage` | `regulator_percentage` ×100 |
//!
//! # Examples
//!
//! ```
//! use thermolink::attribute::{Attribute, RawValue};
//! use thermolink::capabilities::{CapabilityId, CapabilityValue};
//! use thermolink::command::{DispatchContext, WireWrite, dispatch};
//! use thermolink::types::{DisplayUnit, SystemMode};
//!
//! let ctx = DispatchContext::new(SystemMode::Cool, DisplayUnit::Celsius);
//! let write = dispatch(CapabilityId::TargetTemperature, &CapabilityValue::Number(22.5), &ctx).unwrap();
//!
//! let WireWrite::Attributes(values) = write else { panic!("expected attribute write") };
//! assert_eq!(values.get(&Attribute::OccupiedCoolingSetpoint), Some(&RawValue::Int(2250)));
//! ```

mod dispatcher;
mod settings;

use std::fmt;

use crate::attribute::AttributeValues;
use crate::types::{DisplayUnit, SystemMode};

pub use dispatcher::{dispatch, setpoint_attribute};
pub use settings::{SettingAction, dispatch_setting};

/// Relay switch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    /// Turn the relay on.
    On,
    /// Turn the relay off.
    Off,
}

impl SwitchCommand {
    /// Creates the command for a target state.
    #[must_use]
    pub const fn from_state(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    /// Returns the on/off cluster command name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::On => "setOn",
            Self::Off => "setOff",
        }
    }

    /// Returns `true` for [`SwitchCommand::On`].
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for SwitchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A wire operation produced by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireWrite {
    /// Write one or more attributes.
    Attributes(AttributeValues),
    /// Send an on/off cluster command.
    Switch(SwitchCommand),
}

impl WireWrite {
    /// Creates a single-attribute write.
    #[must_use]
    pub fn attribute(
        attribute: crate::attribute::Attribute,
        value: crate::attribute::RawValue,
    ) -> Self {
        Self::Attributes(AttributeValues::from([(attribute, value)]))
    }
}

/// Mode information the dispatcher needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchContext {
    /// Last observed system mode (heat when never observed).
    pub system_mode: SystemMode,
    /// Current display unit.
    pub unit: DisplayUnit,
}

impl DispatchContext {
    /// Creates a dispatch context.
    #[must_use]
    pub const fn new(system_mode: SystemMode, unit: DisplayUnit) -> Self {
        Self { system_mode, unit }
    }
}
