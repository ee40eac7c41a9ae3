// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attach sequence, initial bulk read and clock sync.

use std::sync::Arc;

use chrono::Utc;

use crate::attribute::{Attribute, AttributeValues, RawValue};
use crate::availability::Availability;
use crate::capabilities::{CapabilityId, CapabilityLifecycle, CapabilitySet};
use crate::command::WireWrite;
use crate::error::{Result, TransportError};
use crate::event::DeviceEvent;
use crate::host::Host;
use crate::mode::ModeStateMachine;
use crate::state::StateChange;
use crate::types::{SensorMode, SystemMode};

use super::{Origin, ThermostatDevice, keys};

const DISPLAY_GROUP: [Attribute; 1] = [Attribute::TemperatureDisplayMode];

// Limits come before the modes so they are stored before the first recompute.
// The running mode comes before the system mode, which wins when both are read.
const MODE_GROUP: [Attribute; 11] = [
    Attribute::AbsMinHeatSetpointLimit,
    Attribute::AbsMaxHeatSetpointLimit,
    Attribute::AbsMinCoolSetpointLimit,
    Attribute::AbsMaxCoolSetpointLimit,
    Attribute::AbsMinHeatSetpointLimitF,
    Attribute::AbsMaxHeatSetpointLimitF,
    Attribute::AbsMinCoolSetpointLimitF,
    Attribute::AbsMaxCoolSetpointLimitF,
    Attribute::ThermostatRunningMode,
    Attribute::SystemMode,
    Attribute::SensorMode,
];

const SETPOINT_GROUP: [Attribute; 6] = [
    Attribute::OccupiedHeatingSetpoint,
    Attribute::OccupiedHeatingSetpointF,
    Attribute::OccupiedCoolingSetpoint,
    Attribute::OccupiedCoolingSetpointF,
    Attribute::LocalTemperature,
    Attribute::LocalTemperatureF,
];

const STATUS_GROUP: [Attribute; 6] = [
    Attribute::Frost,
    Attribute::RegulatorPercentage,
    Attribute::Fault,
    Attribute::WindowState,
    Attribute::ProgramOperMode,
    Attribute::KeypadLockout,
];

const SETTINGS_GROUP: [Attribute; 10] = [
    Attribute::Backlight,
    Attribute::HolidayTempSet,
    Attribute::HolidayTempSetF,
    Attribute::VacationMode,
    Attribute::AutoTime,
    Attribute::CountdownSet,
    Attribute::CountdownLeft,
    Attribute::VacationStartDate,
    Attribute::VacationEndDate,
    Attribute::WindowCheck,
];

const SWITCH_GROUP: [Attribute; 1] = [Attribute::OnOff];

// Scale components come first so the counter is scaled with them.
const METERING_GROUP: [Attribute; 3] = [
    Attribute::MeteringMultiplier,
    Attribute::MeteringDivisor,
    Attribute::CurrentSummationDelivered,
];

const ELECTRICAL_GROUP: [Attribute; 3] = [
    Attribute::AcPowerMultiplier,
    Attribute::AcPowerDivisor,
    Attribute::ActivePower,
];

impl<H: Host> ThermostatDevice<H> {
    /// Attaches the device.
    ///
    /// Marks the device available, restores the persisted modes, brings the
    /// registry in line with the restored sensor mode, runs the initial
    /// read and syncs the device clock.
    ///
    /// # Errors
    ///
    /// Returns the first failed read. Attributes that were read are applied
    /// regardless, and the failure has already been classified.
    pub async fn attach(&mut self) -> Result<()> {
        tracing::info!(device_id = %self.id, "Attaching device");
        self.host.set_available();
        self.host.clear_warning();
        self.record(StateChange::Availability(Availability::Available));

        self.restore().await;

        let result = self.initial_sync().await;
        if result.is_ok() {
            self.sync_clock().await;
            self.events.publish(DeviceEvent::Attached {
                device_id: self.id,
            });
        }
        result
    }

    async fn restore(&mut self) {
        let stored = self
            .host
            .get_store_value(keys::STORE_SENSOR_MODE)
            .await
            .and_then(|v| v.as_str().and_then(|s| s.parse::<SensorMode>().ok()));
        // Without a stored mode the first read is the first observation.
        self.modes = match stored {
            Some(mode) => {
                tracing::debug!(device_id = %self.id, sensor_mode = %mode, "Restored sensor mode");
                self.record(StateChange::SensorMode(mode));
                ModeStateMachine::new(mode)
            }
            None => ModeStateMachine::default(),
        };
        let sensor_mode = stored.unwrap_or_default();

        if let Some(mode) = self
            .host
            .get_store_value(keys::STORE_LAST_SYSTEM_MODE)
            .await
            .and_then(|v| v.as_str().and_then(|s| s.parse::<SystemMode>().ok()))
        {
            tracing::debug!(device_id = %self.id, system_mode = %mode, "Restored system mode");
            self.modes.restore_system_mode(mode);
        }

        let mut present = CapabilitySet::new();
        for id in CapabilityId::ALL {
            if self.host.has(id).await {
                present.insert(id);
            }
        }
        self.lifecycle = CapabilityLifecycle::new(present);
        let diff = self.reconcile_capabilities(sensor_mode).await;
        if diff.to_add.contains(CapabilityId::RegulatorPercentage) {
            self.seed_regulator_percentage().await;
        }
    }

    /// Reads the device state from scratch.
    ///
    /// Display unit first, then modes and hardware limits, then everything
    /// else concurrently. Missing attributes are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the first read that failed as a whole.
    pub async fn initial_sync(&mut self) -> Result<()> {
        tracing::debug!(device_id = %self.id, "Reading device state");
        let host = Arc::clone(&self.host);

        let display = host.read_attributes(&DISPLAY_GROUP).await;
        let mut outcome = self.ingest_read(&DISPLAY_GROUP, display).await;

        let modes = host.read_attributes(&MODE_GROUP).await;
        let step = self.ingest_read(&MODE_GROUP, modes).await;
        outcome = outcome.and(step);

        let (setpoints, status, settings, switch, metering, electrical) = tokio::join!(
            host.read_attributes(&SETPOINT_GROUP),
            host.read_attributes(&STATUS_GROUP),
            host.read_attributes(&SETTINGS_GROUP),
            host.read_attributes(&SWITCH_GROUP),
            host.read_attributes(&METERING_GROUP),
            host.read_attributes(&ELECTRICAL_GROUP),
        );

        for (group, result) in [
            (&SETPOINT_GROUP[..], setpoints),
            (&STATUS_GROUP[..], status),
            (&SETTINGS_GROUP[..], settings),
            (&SWITCH_GROUP[..], switch),
            (&METERING_GROUP[..], metering),
            (&ELECTRICAL_GROUP[..], electrical),
        ] {
            let step = self.ingest_read(group, result).await;
            outcome = outcome.and(step);
        }

        outcome.map_err(Into::into)
    }

    async fn ingest_read(
        &mut self,
        requested: &[Attribute],
        result: std::result::Result<AttributeValues, TransportError>,
    ) -> std::result::Result<(), TransportError> {
        let values = match result {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(device_id = %self.id, attributes = ?requested, error = %e, "Read failed");
                self.classify_failure(&e);
                return Err(e);
            }
        };

        for &attribute in requested {
            match values.get(&attribute) {
                // Follow-ups only apply to live reports.
                Some(&raw) => {
                    let _ = self.ingest(attribute, raw, Origin::InitialRead).await;
                }
                None => {
                    tracing::warn!(device_id = %self.id, %attribute, "Attribute missing from read");
                }
            }
        }
        Ok(())
    }

    /// Writes the current local time to the device.
    pub async fn sync_clock(&mut self) {
        let offset = i64::from(self.config.utc_offset_minutes) * 60;
        let now = Utc::now().timestamp() + offset;
        let write = WireWrite::attribute(Attribute::SyncTime, RawValue::Int(now));

        match self.send(write).await {
            Ok(()) => tracing::debug!(device_id = %self.id, time = now, "Clock synced"),
            Err(e) => {
                tracing::warn!(device_id = %self.id, error = %e, "Clock sync failed");
                self.classify_failure(&e);
            }
        }
    }
}
