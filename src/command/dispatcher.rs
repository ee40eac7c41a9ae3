// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability to wire mapping.

use crate::attribute::{Attribute, RawValue};
use crate::capabilities::{CapabilityId, CapabilityValue};
use crate::error::DispatchError;
use crate::types::{DisplayUnit, RegulatorPercentage, SystemMode, to_centi};

use super::{DispatchContext, SwitchCommand, WireWrite};

/// Returns the setpoint attribute for a mode and unit.
#[must_use]
pub const fn setpoint_attribute(mode: SystemMode, unit: DisplayUnit) -> Attribute {
    match (mode, unit) {
        (SystemMode::Heat, DisplayUnit::Celsius) => Attribute::OccupiedHeatingSetpoint,
        (SystemMode::Heat, DisplayUnit::Fahrenheit) => Attribute::OccupiedHeatingSetpointF,
        (SystemMode::Cool, DisplayUnit::Celsius) => Attribute::OccupiedCoolingSetpoint,
        (SystemMode::Cool, DisplayUnit::Fahrenheit) => Attribute::OccupiedCoolingSetpointF,
    }
}

/// Maps a capability write to the wire operation that performs it.
///
/// The write is not gated on the sensor mode: a target temperature written
/// in regulator mode is still mapped to a setpoint.
///
/// # Errors
///
/// - `DispatchError::ReadOnly` for readout capabilities
/// - `DispatchError::InvalidValue` when the value has the wrong type or does
///   not fit the wire format
pub fn dispatch(
    capability: CapabilityId,
    value: &CapabilityValue,
    ctx: &DispatchContext,
) -> Result<WireWrite, DispatchError> {
    match capability {
        CapabilityId::OnOff => {
            let on = expect_bool(capability, value)?;
            Ok(WireWrite::Switch(SwitchCommand::from_state(on)))
        }

        CapabilityId::TargetTemperature => {
            let degrees = expect_number(capability, value)?;
            let raw = to_centi(degrees).map_err(|e| invalid(capability, e.to_string()))?;
            let attribute = setpoint_attribute(ctx.system_mode, ctx.unit);
            Ok(WireWrite::attribute(attribute, RawValue::from(raw)))
        }

        CapabilityId::Frost => {
            let on = expect_bool(capability, value)?;
            Ok(WireWrite::attribute(Attribute::Frost, RawValue::Bool(on)))
        }

        CapabilityId::ChildLock => {
            let locked = expect_bool(capability, value)?;
            Ok(WireWrite::attribute(
                Attribute::KeypadLockout,
                RawValue::Int(i64::from(locked)),
            ))
        }

        CapabilityId::RegulatorPercentage => {
            let fraction = expect_number(capability, value)?;
            let pct = RegulatorPercentage::from_fraction(fraction)
                .map_err(|e| invalid(capability, e.to_string()))?;
            Ok(WireWrite::attribute(
                Attribute::RegulatorPercentage,
                RawValue::from(pct.value()),
            ))
        }

        CapabilityId::MeasurePower
        | CapabilityId::MeterPower
        | CapabilityId::WindowState
        | CapabilityId::Fault
        | CapabilityId::Regulator
        | CapabilityId::MeasureTemperature
        | CapabilityId::EcoMode
        | CapabilityId::Datetime => Err(DispatchError::ReadOnly(capability)),
    }
}

fn invalid(capability: CapabilityId, reason: String) -> DispatchError {
    DispatchError::InvalidValue { capability, reason }
}

fn expect_bool(capability: CapabilityId, value: &CapabilityValue) -> Result<bool, DispatchError> {
    value
        .as_bool()
        .ok_or_else(|| invalid(capability, format!("expected a boolean, got {value}")))
}

fn expect_number(capability: CapabilityId, value: &CapabilityValue) -> Result<f64, DispatchError> {
    value
        .as_f64()
        .ok_or_else(|| invalid(capability, format!("expected a number, got {value}")))
}
