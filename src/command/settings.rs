// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settings write-back.

use crate::attribute::{Attribute, RawValue};
use crate::error::DispatchError;
use crate::types::{SensorMode, to_centi};

use super::WireWrite;

/// Settings that only mirror device state and are never written back.
const SHADOW_KEYS: [&str; 9] = [
    "temperature_display_mode",
    "system_mode",
    "thermostat_regulator_mode",
    "vacation_mode",
    "auto_time",
    "countdown_set",
    "countdown_left",
    "vacation_start_date",
    "vacation_end_date",
];

/// What a changed setting turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingAction {
    /// Write to the device.
    Write(WireWrite),
    /// Ask for a sensor mode change (always ignored downstream).
    RequestSensorMode(SensorMode),
    /// A mirrored value; nothing to send.
    Shadow,
}

/// Maps one changed setting to its action.
///
/// # Errors
///
/// - `DispatchError::UnknownSetting` for keys with no meaning
/// - `DispatchError::InvalidSetting` when the value does not parse
pub fn dispatch_setting(key: &str, value: &str) -> Result<SettingAction, DispatchError> {
    match key {
        "window_check" => write(Attribute::WindowCheck, RawValue::Bool(parse_bool(key, value)?)),
        "lcd_backlight_wait" => {
            let secs: u16 = value.trim().parse().map_err(|_| invalid(key, value))?;
            write(Attribute::Backlight, RawValue::Int(i64::from(secs)))
        }
        "holiday_temp_set" => write(Attribute::HolidayTempSet, parse_centi(key, value)?),
        "holiday_temp_set_f" => write(Attribute::HolidayTempSetF, parse_centi(key, value)?),
        "sensor_mode" => value
            .parse::<SensorMode>()
            .map(SettingAction::RequestSensorMode)
            .map_err(|_| invalid(key, value)),
        k if SHADOW_KEYS.contains(&k) => Ok(SettingAction::Shadow),
        other => Err(DispatchError::UnknownSetting(other.to_string())),
    }
}

#[allow(clippy::unnecessary_wraps)]
fn write(attribute: Attribute, raw: RawValue) -> Result<SettingAction, DispatchError> {
    Ok(SettingAction::Write(WireWrite::attribute(attribute, raw)))
}

fn invalid(key: &str, value: &str) -> DispatchError {
    DispatchError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DispatchError> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_centi(key: &str, value: &str) -> Result<RawValue, DispatchError> {
    let degrees: f64 = value.trim().parse().map_err(|_| invalid(key, value))?;
    to_centi(degrees)
        .map(RawValue::from)
        .map_err(|_| invalid(key, value))
}
