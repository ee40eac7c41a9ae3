// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire attribute catalogue.
//!
//! [`Attribute`] names every typed field the thermostat exposes, grouped by
//! [`Cluster`]. Raw values travel as [`RawValue`] and are turned into
//! semantic values by the [`Normalizer`].
//!
//! # Examples
//!
//! ```
//! use thermolink::attribute::{Attribute, Cluster};
//!
//! let attr: Attribute = "occupiedCoolingSetpoint".parse().unwrap();
//! assert_eq!(attr, Attribute::OccupiedCoolingSetpoint);
//! assert_eq!(attr.cluster(), Cluster::Thermostat);
//! assert!(attr.is_temperature());
//! ```

mod normalizer;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::ValueError;

pub use normalizer::{Normalizer, ScaleFactors, SemanticValue};

/// Group of related attributes on the device endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cluster {
    /// Relay on/off.
    OnOff,
    /// Thermostat control and vendor extensions.
    Thermostat,
    /// Display and keypad configuration.
    UserInterface,
    /// Energy metering.
    Metering,
    /// Instantaneous electrical measurement.
    ElectricalMeasurement,
}

/// Typed wire attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    // ========== On/Off ==========
    /// Relay state.
    OnOff,

    // ========== Thermostat: temperatures (int16 ×100) ==========
    /// Measured temperature in °C.
    LocalTemperature,
    /// Measured temperature in °F.
    LocalTemperatureF,
    /// Heating setpoint in °C.
    OccupiedHeatingSetpoint,
    /// Heating setpoint in °F.
    OccupiedHeatingSetpointF,
    /// Cooling setpoint in °C.
    OccupiedCoolingSetpoint,
    /// Cooling setpoint in °F.
    OccupiedCoolingSetpointF,
    /// Lowest heating setpoint in °C.
    AbsMinHeatSetpointLimit,
    /// Highest heating setpoint in °C.
    AbsMaxHeatSetpointLimit,
    /// Lowest cooling setpoint in °C.
    AbsMinCoolSetpointLimit,
    /// Highest cooling setpoint in °C.
    AbsMaxCoolSetpointLimit,
    /// Lowest heating setpoint in °F.
    AbsMinHeatSetpointLimitF,
    /// Highest heating setpoint in °F.
    AbsMaxHeatSetpointLimitF,
    /// Lowest cooling setpoint in °F.
    AbsMinCoolSetpointLimitF,
    /// Highest cooling setpoint in °F.
    AbsMaxCoolSetpointLimitF,
    /// Vacation temperature in °C.
    HolidayTempSet,
    /// Vacation temperature in °F.
    HolidayTempSetF,

    // ========== Thermostat: enumerations and bitmaps ==========
    /// Heat/cool mode.
    SystemMode,
    /// Heat/cool mode currently running.
    ThermostatRunningMode,
    /// Sensing strategy.
    SensorMode,
    /// Fault bitmap.
    Fault,
    /// Program operating mode bitmap.
    ProgramOperMode,

    // ========== Thermostat: flags ==========
    /// Frost protection.
    Frost,
    /// Open window detected.
    WindowState,
    /// Open window detection enabled.
    WindowCheck,
    /// Device asks for a clock sync.
    SyncTimeReq,
    /// Vacation mode enabled.
    VacationMode,
    /// Automatic time enabled.
    AutoTime,

    // ========== Thermostat: integers ==========
    /// Backlight timeout.
    Backlight,
    /// Countdown duration in minutes.
    CountdownSet,
    /// Countdown remaining in minutes.
    CountdownLeft,
    /// Vacation start, days since the Unix epoch.
    VacationStartDate,
    /// Vacation end, days since the Unix epoch.
    VacationEndDate,
    /// Regulator output, 0-100.
    RegulatorPercentage,
    /// Local time in seconds since the epoch. Write only.
    SyncTime,

    // ========== User interface ==========
    /// Display unit.
    TemperatureDisplayMode,
    /// Child lock.
    KeypadLockout,

    // ========== Metering ==========
    /// Accumulated energy counter.
    CurrentSummationDelivered,
    /// Energy multiplier.
    MeteringMultiplier,
    /// Energy divisor.
    MeteringDivisor,

    // ========== Electrical measurement ==========
    /// Instantaneous power.
    ActivePower,
    /// Power multiplier.
    AcPowerMultiplier,
    /// Power divisor.
    AcPowerDivisor,
}

impl Attribute {
    /// Every attribute, in declaration order.
    pub const ALL: [Self; 43] = [
        Self::OnOff,
        Self::LocalTemperature,
        Self::LocalTemperatureF,
        Self::OccupiedHeatingSetpoint,
        Self::OccupiedHeatingSetpointF,
        Self::OccupiedCoolingSetpoint,
        Self::OccupiedCoolingSetpointF,
        Self::AbsMinHeatSetpointLimit,
        Self::AbsMaxHeatSetpointLimit,
        Self::AbsMinCoolSetpointLimit,
        Self::AbsMaxCoolSetpointLimit,
        Self::AbsMinHeatSetpointLimitF,
        Self::AbsMaxHeatSetpointLimitF,
        Self::AbsMinCoolSetpointLimitF,
        Self::AbsMaxCoolSetpointLimitF,
        Self::HolidayTempSet,
        Self::HolidayTempSetF,
        Self::SystemMode,
        Self::ThermostatRunningMode,
        Self::SensorMode,
        Self::Fault,
        Self::ProgramOperMode,
        Self::Frost,
        Self::WindowState,
        Self::WindowCheck,
        Self::SyncTimeReq,
        Self::VacationMode,
        Self::AutoTime,
        Self::Backlight,
        Self::CountdownSet,
        Self::CountdownLeft,
        Self::VacationStartDate,
        Self::VacationEndDate,
        Self::RegulatorPercentage,
        Self::SyncTime,
        Self::TemperatureDisplayMode,
        Self::KeypadLockout,
        Self::CurrentSummationDelivered,
        Self::MeteringMultiplier,
        Self::MeteringDivisor,
        Self::ActivePower,
        Self::AcPowerMultiplier,
        Self::AcPowerDivisor,
    ];

    /// Returns the cluster this attribute belongs to.
    #[must_use]
    pub const fn cluster(self) -> Cluster {
        match self {
            Self::OnOff => Cluster::OnOff,
            Self::TemperatureDisplayMode | Self::KeypadLockout => Cluster::UserInterface,
            Self::CurrentSummationDelivered | Self::MeteringMultiplier | Self::MeteringDivisor => {
                Cluster::Metering
            }
            Self::ActivePower | Self::AcPowerMultiplier | Self::AcPowerDivisor => {
                Cluster::ElectricalMeasurement
            }
            _ => Cluster::Thermostat,
        }
    }

    /// Returns the wire name of the attribute.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OnOff => "onOff",
            Self::LocalTemperature => "localTemperature",
            Self::LocalTemperatureF => "localTemperatureF",
            Self::OccupiedHeatingSetpoint => "occupiedHeatingSetpoint",
            Self::OccupiedHeatingSetpointF => "occupiedHeatingSetpointF",
            Self::OccupiedCoolingSetpoint => "occupiedCoolingSetpoint",
            Self::OccupiedCoolingSetpointF => "occupiedCoolingSetpointF",
            Self::AbsMinHeatSetpointLimit => "absMinHeatSetpointLimit",
            Self::AbsMaxHeatSetpointLimit => "absMaxHeatSetpointLimit",
            Self::AbsMinCoolSetpointLimit => "absMinCoolSetpointLimit",
            Self::AbsMaxCoolSetpointLimit => "absMaxCoolSetpointLimit",
            Self::AbsMinHeatSetpointLimitF => "absMinHeatSetpointLimitF",
            Self::AbsMaxHeatSetpointLimitF => "absMaxHeatSetpointLimitF",
            Self::AbsMinCoolSetpointLimitF => "absMinCoolSetpointLimitF",
            Self::AbsMaxCoolSetpointLimitF => "absMaxCoolSetpointLimitF",
            Self::HolidayTempSet => "holiday_temp_set",
            Self::HolidayTempSetF => "holiday_temp_set_f",
            Self::SystemMode => "systemMode",
            Self::ThermostatRunningMode => "thermostatRunningMode",
            Self::SensorMode => "sensorMode",
            Self::Fault => "fault",
            Self::ProgramOperMode => "thermostatProgramOperModel",
            Self::Frost => "frost",
            Self::WindowState => "windowState",
            Self::WindowCheck => "windowCheck",
            Self::SyncTimeReq => "syncTimeReq",
            Self::VacationMode => "vacation_mode",
            Self::AutoTime => "auto_time",
            Self::Backlight => "backlight",
            Self::CountdownSet => "countdown_set",
            Self::CountdownLeft => "countdown_left",
            Self::VacationStartDate => "vacation_start_date",
            Self::VacationEndDate => "vacation_end_date",
            Self::RegulatorPercentage => "regulator_percentage",
            Self::SyncTime => "syncTime",
            Self::TemperatureDisplayMode => "temperatureDisplayMode",
            Self::KeypadLockout => "keypadLockout",
            Self::CurrentSummationDelivered => "currentSummationDelivered",
            Self::MeteringMultiplier => "multiplier",
            Self::MeteringDivisor => "divisor",
            Self::ActivePower => "activePower",
            Self::AcPowerMultiplier => "acPowerMultiplier",
            Self::AcPowerDivisor => "acPowerDivisor",
        }
    }

    /// Returns `true` for fixed-point temperature attributes.
    #[must_use]
    pub const fn is_temperature(self) -> bool {
        matches!(
            self,
            Self::LocalTemperature
                | Self::LocalTemperatureF
                | Self::OccupiedHeatingSetpoint
                | Self::OccupiedHeatingSetpointF
                | Self::OccupiedCoolingSetpoint
                | Self::OccupiedCoolingSetpointF
                | Self::AbsMinHeatSetpointLimit
                | Self::AbsMaxHeatSetpointLimit
                | Self::AbsMinCoolSetpointLimit
                | Self::AbsMaxCoolSetpointLimit
                | Self::AbsMinHeatSetpointLimitF
                | Self::AbsMaxHeatSetpointLimitF
                | Self::AbsMinCoolSetpointLimitF
                | Self::AbsMaxCoolSetpointLimitF
                | Self::HolidayTempSet
                | Self::HolidayTempSetF
        )
    }

    /// Returns `true` for the occupied heating/cooling setpoints.
    #[must_use]
    pub const fn is_setpoint(self) -> bool {
        matches!(
            self,
            Self::OccupiedHeatingSetpoint
                | Self::OccupiedHeatingSetpointF
                | Self::OccupiedCoolingSetpoint
                | Self::OccupiedCoolingSetpointF
        )
    }

    /// Returns `true` for attributes the device never reports.
    #[must_use]
    pub const fn is_write_only(self) -> bool {
        matches!(self, Self::SyncTime)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| ValueError::UnknownLabel(s.to_string()))
    }
}

/// A raw value as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue {
    /// Boolean attribute.
    Bool(bool),
    /// Signed or unsigned integer attribute, including enumerations.
    Int(i64),
    /// Bitmap attribute.
    Bitmap(u32),
}

impl RawValue {
    /// Returns the integer payload, accepting booleans as 0/1.
    #[must_use]
    pub fn as_int(self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(v),
            Self::Bool(b) => Some(i64::from(b)),
            Self::Bitmap(bits) => Some(i64::from(bits)),
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i16> for RawValue {
    fn from(value: i16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u8> for RawValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bitmap(bits) => write!(f, "{bits:#b}"),
        }
    }
}

/// A set of attribute values, as read from or written to the device.
pub type AttributeValues = BTreeMap<Attribute, RawValue>;

/// One change notification from the device.
///
/// Delivered once and consumed once. Reports for the same attribute arrive
/// in order; no ordering holds between different attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeReport {
    /// Attribute that changed.
    pub attribute: Attribute,
    /// New raw value.
    pub value: RawValue,
    /// When the report was received.
    pub received_at: DateTime<Utc>,
}

impl AttributeReport {
    /// Creates a report stamped with the current time.
    pub fn new(attribute: Attribute, value: impl Into<RawValue>) -> Self {
        Self {
            attribute,
            value: value.into(),
            received_at: Utc::now(),
        }
    }
}
