// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thermostat device core.
//!
//! [`ThermostatDevice`] owns the [`DeviceState`] of one attached thermostat
//! and is the only writer of it. It turns attribute reports into state
//! changes, capability values, settings shadows and registry mutations, and
//! turns capability writes into wire writes.
//!
//! A device can be driven directly (every entry point is an `async` method
//! taking `&mut self`) or moved into its own task with
//! [`ThermostatDevice::spawn`], which returns a [`DeviceHandle`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use thermolink::attribute::{Attribute, AttributeReport, RawValue};
//! use thermolink::config::DeviceConfig;
//! use thermolink::device::ThermostatDevice;
//! use thermolink::host::memory::MemoryHost;
//! use thermolink::types::SystemMode;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> thermolink::Result<()> {
//! let host = Arc::new(MemoryHost::new().with_attribute(Attribute::SystemMode, RawValue::Int(4)));
//! let mut device = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default());
//! device.attach().await?;
//!
//! device
//!     .report(AttributeReport::new(Attribute::SystemMode, RawValue::Int(3)))
//!     .await;
//! assert_eq!(device.state().system_mode(), Some(SystemMode::Cool));
//! # Ok(())
//! # }
//! ```

mod handle;
mod sync;

pub use handle::DeviceHandle;

use std::sync::Arc;

use serde_json::json;
use tokio::sync::{broadcast, watch};

use crate::attribute::{Attribute, AttributeReport, Normalizer, RawValue, SemanticValue};
use crate::availability::{self, Availability, AvailabilityAction};
use crate::capabilities::{CapabilityDiff, CapabilityId, CapabilityLifecycle, CapabilityValue};
use crate::command::{self, DispatchContext, SettingAction, WireWrite};
use crate::config::DeviceConfig;
use crate::error::{DispatchError, Error, Result, TransportError};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::host::{Host, Settings};
use crate::limits::{self, HardwareLimits};
use crate::mode::{ModeStateMachine, REGULATOR_CHANGED_WARNING, SensorModeRequest};
use crate::state::{DeviceState, StateChange};
use crate::types::{DisplayUnit, RegulatorPercentage, SensorMode, SystemMode, Temperature};

/// Keys written to the host's settings and store.
pub mod keys {
    /// Setting: sensor mode label.
    pub const SENSOR_MODE: &str = "sensor_mode";
    /// Setting: `"6"` in regulator mode, `"0"` otherwise.
    pub const THERMOSTAT_REGULATOR_MODE: &str = "thermostat_regulator_mode";
    /// Setting: `"heat"` or `"cool"`.
    pub const SYSTEM_MODE: &str = "system_mode";
    /// Setting: display unit on the wire (`"0"` °C, `"1"` °F).
    pub const TEMPERATURE_DISPLAY_MODE: &str = "temperature_display_mode";
    /// Setting: backlight timeout.
    pub const LCD_BACKLIGHT_WAIT: &str = "lcd_backlight_wait";
    /// Setting: vacation temperature in °C.
    pub const HOLIDAY_TEMP_SET: &str = "holiday_temp_set";
    /// Setting: vacation temperature in °F.
    pub const HOLIDAY_TEMP_SET_F: &str = "holiday_temp_set_f";
    /// Setting: vacation mode flag.
    pub const VACATION_MODE: &str = "vacation_mode";
    /// Setting: automatic time flag.
    pub const AUTO_TIME: &str = "auto_time";
    /// Setting: countdown duration.
    pub const COUNTDOWN_SET: &str = "countdown_set";
    /// Setting: countdown remaining, `"<n> min"`.
    pub const COUNTDOWN_LEFT: &str = "countdown_left";
    /// Setting: vacation start, `YYYY-MM-DD`.
    pub const VACATION_START_DATE: &str = "vacation_start_date";
    /// Setting: vacation end, `YYYY-MM-DD`.
    pub const VACATION_END_DATE: &str = "vacation_end_date";
    /// Setting: open window detection flag.
    pub const WINDOW_CHECK: &str = "window_check";

    /// Store: last sensor mode label.
    pub const STORE_SENSOR_MODE: &str = "sensor_mode";
    /// Store: last system mode, read by the dispatcher after a restart.
    pub const STORE_LAST_SYSTEM_MODE: &str = "last_system_mode";
    /// Store: set when the regulator boundary was crossed.
    pub const STORE_REGULATOR_MODE_CHANGED: &str = "regulator_mode_changed";
    /// Store: sensor mode label before the boundary was crossed.
    pub const STORE_PREVIOUS_SENSOR_MODE: &str = "previous_sensor_mode";
    /// Store: last regulator output (fraction).
    pub const STORE_REGULATOR_PERCENTAGE: &str = "regulator_percentage";
}

/// Local temperature at or below which an attach-time reading means "no sensor".
const SENSOR_ABSENT_CELSIUS: f64 = -20.0;
const SENSOR_ABSENT_FAHRENHEIT: f64 = -4.0;

/// Where an attribute value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Report,
    InitialRead,
}

/// Work a report leaves for after it has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Followup {
    None,
    Resync,
    ClockSync,
}

/// One attached thermostat.
pub struct ThermostatDevice<H> {
    id: DeviceId,
    host: Arc<H>,
    config: DeviceConfig,
    state: DeviceState,
    state_tx: watch::Sender<DeviceState>,
    modes: ModeStateMachine,
    normalizer: Normalizer,
    lifecycle: CapabilityLifecycle,
    events: EventBus,
}

impl<H: Host> ThermostatDevice<H> {
    /// Creates a device with a fresh identifier.
    ///
    /// Nothing is read or written until [`attach`](Self::attach).
    #[must_use]
    pub fn new(host: Arc<H>, config: DeviceConfig) -> Self {
        Self::with_id(DeviceId::new(), host, config)
    }

    /// Creates a device with a known identifier.
    #[must_use]
    pub fn with_id(id: DeviceId, host: Arc<H>, config: DeviceConfig) -> Self {
        let state = DeviceState::with_limits(config.hardware_limits, config.initial_limits);
        let (state_tx, _) = watch::channel(state.clone());
        Self {
            id,
            host,
            state,
            state_tx,
            modes: ModeStateMachine::default(),
            normalizer: Normalizer::new(config.fallback_scales),
            lifecycle: CapabilityLifecycle::default(),
            events: EventBus::with_capacity(config.event_capacity),
            config,
        }
    }

    /// Device identifier.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// The event bus events are published on.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribes to events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Watches state snapshots.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.state_tx.subscribe()
    }

    /// Capabilities the device currently exposes.
    #[must_use]
    pub fn capabilities(&self) -> &crate::capabilities::CapabilitySet {
        self.lifecycle.current()
    }

    // ========== Reports ==========

    /// Applies one attribute report.
    ///
    /// Reports that fail to normalize are logged and dropped. An `OnOff`
    /// report of `true` or a display unit report re-runs the initial read;
    /// a clock sync request writes the current time.
    pub async fn report(&mut self, report: AttributeReport) {
        match self.ingest(report.attribute, report.value, Origin::Report).await {
            Followup::None => {}
            Followup::Resync => {
                if let Err(e) = self.initial_sync().await {
                    tracing::warn!(device_id = %self.id, error = %e, "Re-sync incomplete");
                }
            }
            Followup::ClockSync => self.sync_clock().await,
        }
    }

    async fn ingest(&mut self, attribute: Attribute, raw: RawValue, origin: Origin) -> Followup {
        tracing::trace!(device_id = %self.id, %attribute, %raw, ?origin, "Attribute value");

        match self.normalizer.normalize(attribute, raw) {
            Ok(value) => self.apply_value(attribute, value, origin).await,
            Err(e) => {
                tracing::warn!(device_id = %self.id, %attribute, %raw, error = %e, "Dropping report");
                Followup::None
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn apply_value(
        &mut self,
        attribute: Attribute,
        value: SemanticValue,
        origin: Origin,
    ) -> Followup {
        use SemanticValue as V;

        match (attribute, value) {
            (Attribute::TemperatureDisplayMode, V::DisplayUnit(unit)) => {
                self.on_display_unit(unit).await;
                if origin == Origin::Report {
                    return Followup::Resync;
                }
            }
            (Attribute::SystemMode | Attribute::ThermostatRunningMode, V::SystemMode(mode)) => {
                self.on_system_mode(mode).await;
            }
            (Attribute::SensorMode, V::SensorMode(mode)) => self.on_sensor_mode(mode).await,

            (a, V::Temperature(t)) if HardwareLimits::slot(a).is_some() => {
                self.on_hardware_limit(a, t).await;
            }
            (a, V::Temperature(t)) if a.is_setpoint() => self.on_setpoint(a, t).await,
            (Attribute::LocalTemperature | Attribute::LocalTemperatureF, V::Temperature(t)) => {
                self.on_local_temperature(attribute, t, origin).await;
            }
            (Attribute::HolidayTempSet, V::Temperature(t)) => {
                self.put_setting(keys::HOLIDAY_TEMP_SET, format!("{:.1}", t.degrees()))
                    .await;
            }
            (Attribute::HolidayTempSetF, V::Temperature(t)) => {
                self.put_setting(keys::HOLIDAY_TEMP_SET_F, format!("{:.1}", t.degrees()))
                    .await;
            }

            (Attribute::OnOff, V::Bool(on)) => {
                self.set_capability(CapabilityId::OnOff, on.into()).await;
                self.record(StateChange::OnOff(on));
                if on && origin == Origin::Report {
                    return Followup::Resync;
                }
            }
            (Attribute::Frost, V::Bool(on)) => {
                self.set_capability(CapabilityId::Frost, on.into()).await;
                self.record(StateChange::Frost(on));
            }
            (Attribute::WindowState, V::Bool(open)) => {
                self.set_capability(CapabilityId::WindowState, open.into())
                    .await;
                self.record(StateChange::WindowOpen(open));
            }
            (Attribute::KeypadLockout, V::Bool(locked)) => {
                self.set_capability(CapabilityId::ChildLock, locked.into())
                    .await;
                self.record(StateChange::ChildLock(locked));
            }
            (Attribute::SyncTimeReq, V::Bool(requested)) => {
                if requested {
                    return Followup::ClockSync;
                }
            }
            (Attribute::WindowCheck, V::Bool(on)) => {
                self.put_setting(keys::WINDOW_CHECK, on.to_string()).await;
            }
            (Attribute::VacationMode, V::Bool(on)) => {
                self.put_setting(keys::VACATION_MODE, on.to_string()).await;
            }
            (Attribute::AutoTime, V::Bool(on)) => {
                self.put_setting(keys::AUTO_TIME, on.to_string()).await;
            }

            (Attribute::Fault, V::Fault(code)) => {
                if code.is_fault() {
                    tracing::warn!(device_id = %self.id, fault = %code, "Device reports a fault");
                }
                self.set_capability(CapabilityId::Fault, code.label().into())
                    .await;
                self.record(StateChange::Fault(code));
            }
            (Attribute::ProgramOperMode, V::ProgramMode(program)) => {
                self.set_capability(CapabilityId::EcoMode, program.is_eco().into())
                    .await;
                self.record(StateChange::EcoMode(program.is_eco()));
            }
            (Attribute::RegulatorPercentage, V::Percentage(pct)) => {
                self.set_capability(CapabilityId::RegulatorPercentage, pct.as_fraction().into())
                    .await;
                self.record(StateChange::RegulatorPercentage(pct));
                self.put_store(keys::STORE_REGULATOR_PERCENTAGE, json!(pct.as_fraction()))
                    .await;
            }

            (Attribute::Backlight, V::Integer(value)) => {
                self.put_setting(keys::LCD_BACKLIGHT_WAIT, value.to_string())
                    .await;
            }
            (Attribute::CountdownSet, V::Minutes(minutes)) => {
                self.put_setting(keys::COUNTDOWN_SET, minutes.to_string())
                    .await;
            }
            (Attribute::CountdownLeft, V::Minutes(minutes)) => {
                self.put_setting(keys::COUNTDOWN_LEFT, format!("{minutes} min"))
                    .await;
            }
            (Attribute::VacationStartDate, V::Date(date)) => {
                self.put_setting(keys::VACATION_START_DATE, date.format("%Y-%m-%d").to_string())
                    .await;
            }
            (Attribute::VacationEndDate, V::Date(date)) => {
                self.put_setting(keys::VACATION_END_DATE, date.format("%Y-%m-%d").to_string())
                    .await;
            }

            (Attribute::ActivePower, V::Power(watts)) => {
                self.set_capability(CapabilityId::MeasurePower, watts.into())
                    .await;
                self.record(StateChange::Power(watts));
            }
            (Attribute::CurrentSummationDelivered, V::Energy(kwh)) => {
                self.set_capability(CapabilityId::MeterPower, kwh.into())
                    .await;
                self.record(StateChange::Energy(kwh));
            }
            (
                Attribute::MeteringMultiplier
                | Attribute::MeteringDivisor
                | Attribute::AcPowerMultiplier
                | Attribute::AcPowerDivisor,
                V::Integer(value),
            ) => {
                if self.normalizer.update_scale(attribute, value) {
                    tracing::debug!(
                        device_id = %self.id,
                        scales = ?self.normalizer.scales(),
                        "Scale factors updated"
                    );
                }
            }

            (attribute, value) => {
                tracing::debug!(device_id = %self.id, %attribute, ?value, "Unhandled attribute value");
            }
        }
        Followup::None
    }

    // ========== Mode handling ==========

    async fn on_display_unit(&mut self, unit: DisplayUnit) {
        if self.record(StateChange::DisplayUnit(unit)) {
            tracing::debug!(device_id = %self.id, %unit, "Display unit changed");
        }
        self.put_setting(keys::TEMPERATURE_DISPLAY_MODE, unit.to_wire().to_string())
            .await;
        self.refresh_setpoint_limits().await;
    }

    async fn on_system_mode(&mut self, mode: SystemMode) {
        if self.modes.on_system_mode(mode) {
            tracing::debug!(device_id = %self.id, system_mode = %mode, "System mode changed");
        }
        self.record(StateChange::SystemMode(mode));
        self.put_setting(keys::SYSTEM_MODE, mode.as_str().to_string())
            .await;
        self.put_store(keys::STORE_LAST_SYSTEM_MODE, json!(mode.as_str()))
            .await;
        self.refresh_setpoint_limits().await;
    }

    async fn on_sensor_mode(&mut self, mode: SensorMode) {
        let transition = self.modes.on_sensor_mode(mode);
        self.record(StateChange::SensorMode(mode));

        let regulator_mode = if mode.is_regulator() { "6" } else { "0" };
        self.put_settings(Settings::from([
            (keys::SENSOR_MODE.to_string(), mode.label().to_string()),
            (
                keys::THERMOSTAT_REGULATOR_MODE.to_string(),
                regulator_mode.to_string(),
            ),
        ]))
        .await;
        self.put_store(keys::STORE_SENSOR_MODE, json!(mode.label()))
            .await;

        let diff = self.reconcile_capabilities(mode).await;
        if mode.is_regulator() {
            if diff.to_add.contains(CapabilityId::RegulatorPercentage) {
                self.seed_regulator_percentage().await;
            }
            self.set_capability(CapabilityId::Regulator, true.into())
                .await;
        }

        if let Some(previous) = transition.crossed_from() {
            tracing::info!(
                device_id = %self.id,
                %previous,
                current = %transition.current,
                "Sensor mode crossed the regulator boundary"
            );
            self.put_store(keys::STORE_REGULATOR_MODE_CHANGED, json!(true))
                .await;
            self.put_store(keys::STORE_PREVIOUS_SENSOR_MODE, json!(previous.label()))
                .await;
            self.host.clear_warning();
            self.host.show_warning(REGULATOR_CHANGED_WARNING);
            self.events.publish(DeviceEvent::Warning {
                device_id: self.id,
                message: REGULATOR_CHANGED_WARNING.to_string(),
            });
        }

        self.refresh_setpoint_limits().await;
    }

    async fn seed_regulator_percentage(&mut self) {
        let fraction = self
            .host
            .get_store_value(keys::STORE_REGULATOR_PERCENTAGE)
            .await
            .and_then(|v| v.as_f64())
            .unwrap_or(self.config.default_regulator_percentage);

        match RegulatorPercentage::from_fraction(fraction) {
            Ok(pct) => {
                self.set_capability(CapabilityId::RegulatorPercentage, pct.as_fraction().into())
                    .await;
                self.record(StateChange::RegulatorPercentage(pct));
            }
            Err(e) => {
                tracing::warn!(device_id = %self.id, error = %e, "Invalid regulator percentage");
            }
        }
    }

    async fn reconcile_capabilities(&mut self, mode: SensorMode) -> CapabilityDiff {
        let diff = self.lifecycle.reconcile(mode);
        if !diff.is_empty() {
            tracing::debug!(
                device_id = %self.id,
                sensor_mode = %mode,
                added = diff.to_add.len(),
                removed = diff.to_remove.len(),
                "Reconciling capabilities"
            );
            self.host.apply(&diff).await;
            self.events
                .publish(DeviceEvent::reconciled(self.id, mode, &diff));
        }
        diff
    }

    // ========== Temperatures and limits ==========

    async fn on_hardware_limit(&mut self, attribute: Attribute, value: Temperature) {
        let mut hardware = *self.state.hardware_limits();
        if hardware.update(attribute, value) {
            tracing::debug!(device_id = %self.id, %attribute, %value, "Hardware limit reported");
            self.record(StateChange::HardwareLimits(hardware));
            self.refresh_setpoint_limits().await;
        }
    }

    async fn on_setpoint(&mut self, attribute: Attribute, value: Temperature) {
        let active =
            command::setpoint_attribute(self.modes.last_system_mode(), self.state.display_unit());
        if attribute != active {
            tracing::trace!(device_id = %self.id, %attribute, "Setpoint of inactive mode or unit");
            return;
        }
        let degrees = value.degrees();
        if !self.state.setpoint_limits().contains(degrees) {
            tracing::debug!(device_id = %self.id, %attribute, %value, "Setpoint outside limits, ignoring");
            return;
        }
        self.set_capability(CapabilityId::TargetTemperature, degrees.into())
            .await;
        self.record(StateChange::TargetTemperature(degrees));
    }

    async fn on_local_temperature(&mut self, attribute: Attribute, value: Temperature, origin: Origin) {
        let (active, absent) = match self.state.display_unit() {
            DisplayUnit::Celsius => (Attribute::LocalTemperature, SENSOR_ABSENT_CELSIUS),
            DisplayUnit::Fahrenheit => (Attribute::LocalTemperatureF, SENSOR_ABSENT_FAHRENHEIT),
        };
        if attribute != active {
            return;
        }
        let degrees = value.degrees();
        if origin == Origin::InitialRead && degrees <= absent {
            tracing::debug!(device_id = %self.id, %value, "No local temperature at attach");
            return;
        }
        self.set_capability(CapabilityId::MeasureTemperature, degrees.into())
            .await;
        self.record(StateChange::LocalTemperature(degrees));
    }

    /// Recomputes the target limits from the current mode, unit and
    /// hardware limits, then pushes them to the registry.
    ///
    /// An invalid hardware pair leaves the applied limits untouched. A
    /// target above the new maximum is lowered to it.
    async fn refresh_setpoint_limits(&mut self) {
        let mode = self.modes.last_system_mode();
        let unit = self.state.display_unit();
        let applied = match limits::recompute(mode, unit, self.state.hardware_limits()) {
            Ok(applied) => applied,
            Err(violation) => {
                tracing::warn!(
                    device_id = %self.id,
                    system_mode = %mode,
                    %unit,
                    error = %violation,
                    "Keeping previous setpoint limits"
                );
                return;
            }
        };

        if self.record(StateChange::SetpointLimits(applied)) {
            tracing::debug!(device_id = %self.id, min = applied.min, max = applied.max, "Setpoint limits applied");
        }
        if !self.lifecycle.current().contains(CapabilityId::TargetTemperature) {
            return;
        }
        if let Err(e) = self
            .host
            .set_options(CapabilityId::TargetTemperature, applied)
            .await
        {
            tracing::warn!(device_id = %self.id, error = %e, "Failed to set target options");
        }

        if let Some(max) = self
            .state
            .target_temperature()
            .and_then(|t| applied.clamp_down(t))
        {
            tracing::debug!(device_id = %self.id, max, "Clamping target temperature");
            self.set_capability(CapabilityId::TargetTemperature, max.into())
                .await;
            self.record(StateChange::TargetTemperature(max));
        }
    }

    // ========== Writes ==========

    /// Writes a capability value to the device.
    ///
    /// On rejection the capability is rolled back to its previous value and
    /// the failure is classified, which may mark the device unavailable.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::ReadOnly`] or [`DispatchError::InvalidValue`] when
    ///   the write cannot be mapped (nothing is sent)
    /// - [`DispatchError::Rejected`] when the transport fails
    pub async fn write_capability(
        &mut self,
        capability: CapabilityId,
        value: CapabilityValue,
    ) -> Result<()> {
        let ctx = DispatchContext::new(self.modes.last_system_mode(), self.state.display_unit());
        let write = command::dispatch(capability, &value, &ctx)?;
        let previous = self.host.get(capability).await;

        // Switching off drops the power reading before the device answers.
        let switching_off = matches!(
            (capability, &value),
            (CapabilityId::OnOff, CapabilityValue::Bool(false))
        );
        let previous_power = if switching_off {
            let reading = (self.host.get(CapabilityId::MeasurePower).await, self.state.power());
            self.set_capability(CapabilityId::MeasurePower, CapabilityValue::Number(0.0))
                .await;
            self.record(StateChange::Power(0.0));
            Some(reading)
        } else {
            None
        };

        if let Err(e) = self.send(write).await {
            tracing::warn!(device_id = %self.id, %capability, error = %e, "Write rejected, rolling back");
            if let Some(previous) = previous {
                self.set_capability(capability, previous).await;
            }
            if let Some((shown, watts)) = previous_power {
                if let Some(shown) = shown {
                    self.set_capability(CapabilityId::MeasurePower, shown).await;
                }
                if let Some(watts) = watts {
                    self.record(StateChange::Power(watts));
                }
            }
            self.classify_failure(&e);
            return Err(DispatchError::Rejected(e).into());
        }

        tracing::debug!(device_id = %self.id, %capability, %value, "Write acknowledged");
        self.on_write_acknowledged(capability, &value).await;
        Ok(())
    }

    async fn on_write_acknowledged(&mut self, capability: CapabilityId, value: &CapabilityValue) {
        match (capability, value) {
            (CapabilityId::TargetTemperature, CapabilityValue::Number(degrees)) => {
                let degrees = Temperature::from_degrees(*degrees).degrees();
                self.record(StateChange::TargetTemperature(degrees));
                self.refresh_setpoint_limits().await;
            }
            (CapabilityId::OnOff, CapabilityValue::Bool(on)) => {
                self.record(StateChange::OnOff(*on));
            }
            (CapabilityId::Frost, CapabilityValue::Bool(on)) => {
                self.set_capability(CapabilityId::Frost, (*on).into())
                    .await;
                self.record(StateChange::Frost(*on));
            }
            (CapabilityId::ChildLock, CapabilityValue::Bool(locked)) => {
                self.record(StateChange::ChildLock(*locked));
            }
            (CapabilityId::RegulatorPercentage, CapabilityValue::Number(fraction)) => {
                if let Ok(pct) = RegulatorPercentage::from_fraction(*fraction) {
                    self.record(StateChange::RegulatorPercentage(pct));
                    self.put_store(keys::STORE_REGULATOR_PERCENTAGE, json!(pct.as_fraction()))
                        .await;
                }
            }
            _ => {}
        }
    }

    /// Applies changed settings.
    ///
    /// Every key is processed even if an earlier one fails; the first error
    /// is returned.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::UnknownSetting`] or
    ///   [`DispatchError::InvalidSetting`] for keys that cannot be mapped
    /// - [`DispatchError::Rejected`] when a resulting write fails
    pub async fn update_settings(&mut self, changes: Settings) -> Result<()> {
        let mut first_error: Option<Error> = None;

        for (key, value) in &changes {
            match command::dispatch_setting(key, value) {
                Ok(SettingAction::Write(write)) => {
                    if let Err(e) = self.send(write).await {
                        tracing::warn!(device_id = %self.id, setting = %key, error = %e, "Setting write rejected");
                        self.classify_failure(&e);
                        first_error.get_or_insert(DispatchError::Rejected(e).into());
                    } else {
                        tracing::debug!(device_id = %self.id, setting = %key, %value, "Setting written");
                    }
                }
                Ok(SettingAction::RequestSensorMode(mode)) => {
                    let SensorModeRequest::Ignored { requested } = self.request_sensor_mode(mode);
                    tracing::debug!(device_id = %self.id, setting = %key, %requested, "Sensor mode setting not written");
                }
                Ok(SettingAction::Shadow) => {
                    tracing::trace!(device_id = %self.id, setting = %key, "Mirrored setting, nothing to write");
                }
                Err(e) => {
                    tracing::warn!(device_id = %self.id, setting = %key, error = %e, "Ignoring setting");
                    first_error.get_or_insert(e.into());
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Handles a local request to change the sensor mode.
    ///
    /// The request is logged and ignored; the mode only changes when the
    /// device reports it.
    #[must_use]
    pub fn request_sensor_mode(&self, mode: SensorMode) -> SensorModeRequest {
        self.modes.request_sensor_mode(mode)
    }

    async fn send(&self, write: WireWrite) -> std::result::Result<(), TransportError> {
        match write {
            WireWrite::Attributes(values) => self.host.write_attributes(values).await,
            WireWrite::Switch(command) => self.host.send_command(command).await,
        }
    }

    // ========== Availability ==========

    fn classify_failure(&mut self, error: &TransportError) {
        match availability::classify(error.kind) {
            AvailabilityAction::MarkUnavailable(reason) => {
                tracing::error!(
                    device_id = %self.id,
                    kind = %error.kind,
                    error = %error.message,
                    reason,
                    "Marking device unavailable"
                );
                self.host.set_unavailable(reason);
                self.record(StateChange::Availability(Availability::Unavailable(
                    reason.to_string(),
                )));
            }
            AvailabilityAction::Unchanged => {
                tracing::warn!(device_id = %self.id, error = %error, "Unclassified transport failure");
            }
        }
    }

    // ========== Host helpers ==========

    /// Applies a change and, if it changed anything, publishes it.
    fn record(&mut self, change: StateChange) -> bool {
        if !self.state.apply(&change) {
            return false;
        }
        self.state_tx.send_replace(self.state.clone());
        let event = match change {
            StateChange::Availability(availability) => DeviceEvent::AvailabilityChanged {
                device_id: self.id,
                availability,
            },
            change => DeviceEvent::state_changed(self.id, change),
        };
        self.events.publish(event);
        true
    }

    async fn set_capability(&self, id: CapabilityId, value: CapabilityValue) {
        if !self.lifecycle.current().contains(id) {
            tracing::trace!(device_id = %self.id, capability = %id, "Capability not exposed");
            return;
        }
        if let Err(e) = self.host.set(id, value).await {
            tracing::warn!(device_id = %self.id, capability = %id, error = %e, "Failed to set capability");
        }
    }

    async fn put_setting(&self, key: &str, value: String) {
        self.put_settings(Settings::from([(key.to_string(), value)]))
            .await;
    }

    async fn put_settings(&self, partial: Settings) {
        if let Err(e) = self.host.set_settings(partial).await {
            tracing::warn!(device_id = %self.id, error = %e, "Failed to update settings");
        }
    }

    async fn put_store(&self, key: &str, value: serde_json::Value) {
        if let Err(e) = self.host.set_store_value(key, value).await {
            tracing::warn!(device_id = %self.id, key, error = %e, "Failed to write store value");
        }
    }
}

impl<H> std::fmt::Debug for ThermostatDevice<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThermostatDevice")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("capabilities", self.lifecycle.current())
            .finish_non_exhaustive()
    }
}
