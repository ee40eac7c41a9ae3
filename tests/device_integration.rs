// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests driving a thermostat against the in-memory host.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use thermolink::attribute::{Attribute, AttributeReport, RawValue};
use thermolink::availability::{Availability, REASON_NOT_RESPONDING, REASON_UNREACHABLE};
use thermolink::capabilities::{CapabilityId, CapabilitySet, CapabilityValue};
use thermolink::command::SwitchCommand;
use thermolink::config::DeviceConfig;
use thermolink::device::{ThermostatDevice, keys};
use thermolink::error::{DispatchError, Error, TransportError, TransportErrorKind};
use thermolink::event::DeviceEvent;
use thermolink::host::Settings;
use thermolink::host::memory::MemoryHost;
use thermolink::mode::REGULATOR_CHANGED_WARNING;
use thermolink::state::StateChange;
use thermolink::types::{DisplayUnit, SensorMode, SystemMode};

// ============================================================================
// Helpers
// ============================================================================

/// A heating thermostat in Celsius with an air sensor.
fn heating_host() -> MemoryHost {
    MemoryHost::new()
        .with_attribute(Attribute::TemperatureDisplayMode, RawValue::Int(0))
        .with_attribute(Attribute::SystemMode, RawValue::Int(4))
        .with_attribute(Attribute::SensorMode, RawValue::Int(0))
        .with_attribute(Attribute::OnOff, RawValue::Bool(true))
        .with_attribute(Attribute::LocalTemperature, RawValue::Int(2150))
        .with_attribute(Attribute::OccupiedHeatingSetpoint, RawValue::Int(2200))
        .with_attribute(Attribute::Fault, RawValue::Bitmap(0))
}

async fn attach(host: MemoryHost) -> (Arc<MemoryHost>, ThermostatDevice<MemoryHost>) {
    let host = Arc::new(host);
    let mut device = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default());
    device.attach().await.unwrap();
    (host, device)
}

fn required(mode: SensorMode) -> BTreeSet<CapabilityId> {
    CapabilitySet::required_for(mode).iter().collect()
}

fn number(value: Option<CapabilityValue>) -> f64 {
    value.and_then(|v| v.as_f64()).unwrap()
}

// ============================================================================
// Attach
// ============================================================================

mod attach {
    use super::*;

    #[tokio::test]
    async fn exposes_thermostat_capabilities_and_reads_state() {
        let (host, device) = attach(heating_host()).await;

        assert_eq!(host.capabilities(), required(SensorMode::Auto));
        assert_eq!(device.state().system_mode(), Some(SystemMode::Heat));
        assert_eq!(device.state().target_temperature(), Some(22.0));
        assert_eq!(device.state().local_temperature(), Some(21.5));
        assert_eq!(device.state().is_on(), Some(true));
        assert!(device.state().availability().is_available());
        assert!(host.availability().is_available());

        assert_eq!(
            host.capability_value(CapabilityId::Fault),
            Some(CapabilityValue::from("0"))
        );
        assert_eq!(number(host.capability_value(CapabilityId::MeasureTemperature)), 21.5);
    }

    #[tokio::test]
    async fn mirrors_modes_into_settings_and_store() {
        let (host, _device) = attach(heating_host()).await;

        let settings = host.settings();
        assert_eq!(settings[keys::SENSOR_MODE], "a");
        assert_eq!(settings[keys::THERMOSTAT_REGULATOR_MODE], "0");
        assert_eq!(settings[keys::SYSTEM_MODE], "heat");
        assert_eq!(settings[keys::TEMPERATURE_DISPLAY_MODE], "0");
        assert_eq!(host.store_value(keys::STORE_SENSOR_MODE), Some(json!("a")));
        assert_eq!(host.store_value(keys::STORE_LAST_SYSTEM_MODE), Some(json!("heat")));
    }

    #[tokio::test]
    async fn syncs_the_clock_once() {
        let (host, _device) = attach(heating_host()).await;

        let writes = host.writes_to(Attribute::SyncTime);
        assert_eq!(writes.len(), 1);
        assert!(matches!(writes[0], RawValue::Int(t) if t > 0));
    }

    #[tokio::test]
    async fn reads_display_unit_before_anything_else() {
        let (host, _device) = attach(heating_host()).await;

        let reads = host.reads();
        assert_eq!(reads.len(), 8);
        assert_eq!(reads[0], vec![Attribute::TemperatureDisplayMode]);
        assert!(reads[1].contains(&Attribute::SystemMode));
        assert!(reads[1].contains(&Attribute::SensorMode));
    }

    #[tokio::test]
    async fn drops_sensor_absent_reading() {
        let host = heating_host().with_attribute(Attribute::LocalTemperature, RawValue::Int(-2500));
        let (host, mut device) = attach(host).await;

        assert_eq!(device.state().local_temperature(), None);
        assert_eq!(host.capability_value(CapabilityId::MeasureTemperature), None);

        // The same value in a live report is a real reading.
        device
            .report(AttributeReport::new(Attribute::LocalTemperature, RawValue::Int(-2500)))
            .await;
        assert_eq!(device.state().local_temperature(), Some(-25.0));
    }

    #[tokio::test]
    async fn removes_retired_capability() {
        let host = heating_host().with_capability(CapabilityId::Datetime);
        let (host, _device) = attach(host).await;

        assert!(!host.capabilities().contains(&CapabilityId::Datetime));
    }

    #[tokio::test]
    async fn tolerates_missing_attributes() {
        let host = Arc::new(MemoryHost::new());
        let mut device = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default());

        device.attach().await.unwrap();

        assert_eq!(device.state().system_mode(), None);
        assert_eq!(device.state().target_temperature(), None);
        assert_eq!(host.capabilities(), required(SensorMode::Auto));
    }

    #[tokio::test]
    async fn whole_read_failure_marks_unavailable() {
        let host = Arc::new(heating_host());
        host.fail_reads(Some(TransportError::from_message(
            "Error: Could not reach device",
        )));
        let mut device = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default());
        let mut events = device.subscribe();

        let err = device.attach().await.unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportErrorKind::Unreachable));
        assert_eq!(
            host.availability(),
            Availability::Unavailable(REASON_UNREACHABLE.to_string())
        );
        assert_eq!(host.unavailable_reasons().len(), host.reads().len());
        assert!(host.writes_to(Attribute::SyncTime).is_empty());

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, DeviceEvent::Attached { .. }));
        }
    }

    #[tokio::test]
    async fn restored_regulator_mode_does_not_warn_again() {
        let host = heating_host()
            .with_attribute(Attribute::SensorMode, RawValue::Int(6))
            .with_store_value(keys::STORE_SENSOR_MODE, json!("p"));
        let (host, device) = attach(host).await;

        assert_eq!(device.state().sensor_mode(), SensorMode::Regulator);
        assert_eq!(host.capabilities(), required(SensorMode::Regulator));
        assert!(host.warnings().is_empty());
        assert_eq!(host.store_writes_of(keys::STORE_REGULATOR_MODE_CHANGED), 0);
        assert!((number(host.capability_value(CapabilityId::RegulatorPercentage)) - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn first_attach_in_regulator_mode_does_not_warn() {
        let host = heating_host().with_attribute(Attribute::SensorMode, RawValue::Int(6));
        let (host, mut device) = attach(host).await;

        assert_eq!(device.state().sensor_mode(), SensorMode::Regulator);
        assert_eq!(host.capabilities(), required(SensorMode::Regulator));
        assert!(host.warnings().is_empty());
        assert_eq!(host.store_writes_of(keys::STORE_REGULATOR_MODE_CHANGED), 0);
        assert_eq!(host.store_value(keys::STORE_PREVIOUS_SENSOR_MODE), None);
        assert_eq!(host.store_value(keys::STORE_SENSOR_MODE), Some(json!("p")));
        assert!((number(host.capability_value(CapabilityId::RegulatorPercentage)) - 0.2).abs() < 1e-9);

        // Leaving the first observed mode is a real crossing.
        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(0)))
            .await;
        assert_eq!(host.warnings(), vec![REGULATOR_CHANGED_WARNING.to_string()]);
        assert_eq!(host.store_value(keys::STORE_PREVIOUS_SENSOR_MODE), Some(json!("p")));
    }

    #[tokio::test]
    async fn running_mode_selects_the_setpoint() {
        let host = MemoryHost::new().with_attribute(Attribute::ThermostatRunningMode, RawValue::Int(3));
        let (host, mut device) = attach(host).await;

        assert_eq!(device.state().system_mode(), Some(SystemMode::Cool));
        assert_eq!(host.store_value(keys::STORE_LAST_SYSTEM_MODE), Some(json!("cool")));

        device
            .write_capability(CapabilityId::TargetTemperature, CapabilityValue::Number(21.0))
            .await
            .unwrap();

        assert_eq!(
            host.writes_to(Attribute::OccupiedCoolingSetpoint),
            vec![RawValue::Int(2100)]
        );
        assert!(host.writes_to(Attribute::OccupiedHeatingSetpoint).is_empty());
    }

    #[tokio::test]
    async fn system_mode_wins_over_running_mode() {
        let host = heating_host().with_attribute(Attribute::ThermostatRunningMode, RawValue::Int(3));
        let (_host, device) = attach(host).await;

        assert_eq!(device.state().system_mode(), Some(SystemMode::Heat));
    }

    #[tokio::test]
    async fn restored_system_mode_selects_the_setpoint() {
        let host = MemoryHost::new().with_store_value(keys::STORE_LAST_SYSTEM_MODE, json!("cool"));
        let (host, mut device) = attach(host).await;

        device
            .write_capability(CapabilityId::TargetTemperature, CapabilityValue::Number(20.0))
            .await
            .unwrap();

        assert_eq!(
            host.writes_to(Attribute::OccupiedCoolingSetpoint),
            vec![RawValue::Int(2000)]
        );
        assert!(host.writes_to(Attribute::OccupiedHeatingSetpoint).is_empty());
    }
}

// ============================================================================
// Modes and capabilities
// ============================================================================

mod modes {
    use super::*;

    #[tokio::test]
    async fn entering_regulator_mode_swaps_capabilities_and_warns_once() {
        let (host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(6)))
            .await;

        assert_eq!(host.capabilities(), required(SensorMode::Regulator));
        assert_eq!(host.store_writes_of(keys::STORE_REGULATOR_MODE_CHANGED), 1);
        assert_eq!(host.store_value(keys::STORE_PREVIOUS_SENSOR_MODE), Some(json!("a")));
        assert_eq!(host.warnings(), vec![REGULATOR_CHANGED_WARNING.to_string()]);
        assert_eq!(host.active_warning().as_deref(), Some(REGULATOR_CHANGED_WARNING));

        let settings = host.settings();
        assert_eq!(settings[keys::SENSOR_MODE], "p");
        assert_eq!(settings[keys::THERMOSTAT_REGULATOR_MODE], "6");

        // A repeated report is not a transition.
        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(6)))
            .await;
        assert_eq!(host.store_writes_of(keys::STORE_REGULATOR_MODE_CHANGED), 1);
        assert_eq!(host.warnings().len(), 1);
    }

    #[tokio::test]
    async fn regulator_capabilities_are_seeded() {
        let (host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(6)))
            .await;

        assert!((number(host.capability_value(CapabilityId::RegulatorPercentage)) - 0.2).abs() < 1e-9);
        assert_eq!(
            host.capability_value(CapabilityId::Regulator),
            Some(CapabilityValue::Bool(true))
        );
        assert_eq!(device.state().regulator_percentage().map(|p| p.value()), Some(20));
    }

    #[tokio::test]
    async fn stored_regulator_output_wins_over_default() {
        let host = heating_host().with_store_value(keys::STORE_REGULATOR_PERCENTAGE, json!(0.65));
        let (host, mut device) = attach(host).await;

        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(6)))
            .await;

        assert!((number(host.capability_value(CapabilityId::RegulatorPercentage)) - 0.65).abs() < 1e-9);
    }

    #[tokio::test]
    async fn leaving_regulator_mode_restores_thermostat_capabilities() {
        let (host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(6)))
            .await;
        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(2)))
            .await;

        assert_eq!(device.state().sensor_mode(), SensorMode::AutoFrost);
        assert_eq!(host.capabilities(), required(SensorMode::AutoFrost));
        assert_eq!(host.store_writes_of(keys::STORE_REGULATOR_MODE_CHANGED), 2);
        assert_eq!(host.warnings().len(), 2);
    }

    #[tokio::test]
    async fn switching_between_thermostat_modes_keeps_capabilities() {
        let (host, mut device) = attach(heating_host()).await;
        let ops_before = host.registry_ops().len();

        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(1)))
            .await;

        assert_eq!(host.registry_ops().len(), ops_before);
        assert!(host.warnings().is_empty());
        assert_eq!(host.settings()[keys::SENSOR_MODE], "f");
    }

    #[tokio::test]
    async fn reconciliation_is_published() {
        let (_host, mut device) = attach(heating_host()).await;
        let mut events = device.subscribe();

        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(6)))
            .await;

        let mut reconciled = None;
        let mut warned = false;
        while let Ok(event) = events.try_recv() {
            match event {
                DeviceEvent::CapabilitiesReconciled { added, removed, .. } => {
                    reconciled = Some((added, removed));
                }
                DeviceEvent::Warning { message, .. } => {
                    warned = message == REGULATOR_CHANGED_WARNING;
                }
                _ => {}
            }
        }

        let (added, removed) = reconciled.unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(removed.len(), 4);
        assert!(warned);
    }

    #[tokio::test]
    async fn unsupported_system_mode_is_dropped() {
        let (host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(Attribute::SystemMode, RawValue::Int(1)))
            .await;

        assert_eq!(device.state().system_mode(), Some(SystemMode::Heat));
        assert_eq!(host.settings()[keys::SYSTEM_MODE], "heat");
    }

    #[tokio::test]
    async fn sensor_mode_requests_are_ignored() {
        let (host, mut device) = attach(heating_host()).await;
        let writes_before = host.writes().len();

        let changes = Settings::from([(keys::SENSOR_MODE.to_string(), "p".to_string())]);
        device.update_settings(changes).await.unwrap();

        assert_eq!(device.state().sensor_mode(), SensorMode::Auto);
        assert_eq!(host.writes().len(), writes_before);
        assert_eq!(host.capabilities(), required(SensorMode::Auto));
        assert_eq!(host.store_value(keys::STORE_SENSOR_MODE), Some(json!("a")));
    }
}

// ============================================================================
// Setpoints and limits
// ============================================================================

mod setpoints {
    use super::*;

    #[tokio::test]
    async fn target_write_follows_the_last_system_mode() {
        let host = MemoryHost::new();
        let (host, mut device) = attach(host).await;

        device
            .write_capability(CapabilityId::TargetTemperature, CapabilityValue::Number(21.0))
            .await
            .unwrap();
        assert_eq!(
            host.writes_to(Attribute::OccupiedHeatingSetpoint),
            vec![RawValue::Int(2100)]
        );

        device
            .report(AttributeReport::new(Attribute::SystemMode, RawValue::Int(3)))
            .await;
        device
            .write_capability(CapabilityId::TargetTemperature, CapabilityValue::Number(21.0))
            .await
            .unwrap();
        assert_eq!(
            host.writes_to(Attribute::OccupiedCoolingSetpoint),
            vec![RawValue::Int(2100)]
        );
    }

    #[tokio::test]
    async fn cooling_in_celsius_end_to_end() {
        let host = MemoryHost::new()
            .with_attribute(Attribute::TemperatureDisplayMode, RawValue::Int(0))
            .with_attribute(Attribute::SystemMode, RawValue::Int(3))
            .with_attribute(Attribute::AbsMinCoolSetpointLimit, RawValue::Int(1800))
            .with_attribute(Attribute::AbsMaxCoolSetpointLimit, RawValue::Int(2800));
        let (host, mut device) = attach(host).await;

        let limits = device.state().setpoint_limits();
        assert_eq!((limits.min, limits.max), (18.0, 28.0));
        assert_eq!(host.options(CapabilityId::TargetTemperature), Some(limits));

        device
            .write_capability(CapabilityId::TargetTemperature, CapabilityValue::Number(22.5))
            .await
            .unwrap();

        assert_eq!(
            host.writes_to(Attribute::OccupiedCoolingSetpoint),
            vec![RawValue::Int(2250)]
        );
        assert!(host.writes_to(Attribute::OccupiedHeatingSetpoint).is_empty());
        assert_eq!(device.state().target_temperature(), Some(22.5));
    }

    #[tokio::test]
    async fn inverted_hardware_limits_keep_previous_limits() {
        let (_host, mut device) = attach(heating_host()).await;
        let before = device.state().setpoint_limits();

        device
            .report(AttributeReport::new(
                Attribute::AbsMinHeatSetpointLimit,
                RawValue::Int(4000),
            ))
            .await;

        assert_eq!(device.state().setpoint_limits(), before);
        assert_eq!(device.state().hardware_limits().heat_celsius.min, 40.0);
    }

    #[tokio::test]
    async fn lowered_maximum_clamps_the_target() {
        let (host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(
                Attribute::OccupiedHeatingSetpoint,
                RawValue::Int(3000),
            ))
            .await;
        assert_eq!(device.state().target_temperature(), Some(30.0));

        device
            .report(AttributeReport::new(
                Attribute::AbsMaxHeatSetpointLimit,
                RawValue::Int(2500),
            ))
            .await;

        assert_eq!(device.state().setpoint_limits().max, 25.0);
        assert_eq!(device.state().target_temperature(), Some(25.0));
        assert_eq!(number(host.capability_value(CapabilityId::TargetTemperature)), 25.0);
    }

    #[tokio::test]
    async fn raised_minimum_never_raises_the_target() {
        let (_host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(
                Attribute::AbsMinHeatSetpointLimit,
                RawValue::Int(2500),
            ))
            .await;

        assert_eq!(device.state().setpoint_limits().min, 25.0);
        assert_eq!(device.state().target_temperature(), Some(22.0));
    }

    #[tokio::test]
    async fn setpoint_echo_of_inactive_mode_is_ignored() {
        let (_host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(
                Attribute::OccupiedCoolingSetpoint,
                RawValue::Int(2000),
            ))
            .await;
        assert_eq!(device.state().target_temperature(), Some(22.0));

        device
            .report(AttributeReport::new(
                Attribute::OccupiedHeatingSetpointF,
                RawValue::Int(7000),
            ))
            .await;
        assert_eq!(device.state().target_temperature(), Some(22.0));
    }

    #[tokio::test]
    async fn setpoint_outside_limits_is_ignored() {
        let (_host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(
                Attribute::OccupiedHeatingSetpoint,
                RawValue::Int(5000),
            ))
            .await;

        assert_eq!(device.state().target_temperature(), Some(22.0));
    }

    #[tokio::test]
    async fn fahrenheit_display_uses_fahrenheit_attributes() {
        let host = heating_host()
            .with_attribute(Attribute::TemperatureDisplayMode, RawValue::Int(1))
            .with_attribute(Attribute::LocalTemperatureF, RawValue::Int(7000))
            .with_attribute(Attribute::OccupiedHeatingSetpointF, RawValue::Int(6800));
        let (host, mut device) = attach(host).await;

        assert_eq!(device.state().display_unit(), DisplayUnit::Fahrenheit);
        assert_eq!(device.state().local_temperature(), Some(70.0));
        assert_eq!(device.state().target_temperature(), Some(68.0));
        let limits = device.state().setpoint_limits();
        assert_eq!((limits.min, limits.max), (41.0, 95.0));
        assert_eq!(host.settings()[keys::TEMPERATURE_DISPLAY_MODE], "1");

        device
            .write_capability(CapabilityId::TargetTemperature, CapabilityValue::Number(72.0))
            .await
            .unwrap();
        assert_eq!(
            host.writes_to(Attribute::OccupiedHeatingSetpointF),
            vec![RawValue::Int(7200)]
        );
    }

    #[tokio::test]
    async fn display_unit_report_triggers_a_resync() {
        let (host, mut device) = attach(heating_host()).await;
        let reads_before = host.reads().len();

        host.set_attribute(Attribute::TemperatureDisplayMode, RawValue::Int(1));
        device
            .report(AttributeReport::new(
                Attribute::TemperatureDisplayMode,
                RawValue::Int(1),
            ))
            .await;

        assert_eq!(host.reads().len(), reads_before * 2);
        assert_eq!(device.state().display_unit(), DisplayUnit::Fahrenheit);
        assert_eq!(device.state().setpoint_limits().max, 95.0);
    }
}

// ============================================================================
// Writes and availability
// ============================================================================

mod writes {
    use super::*;

    #[tokio::test]
    async fn rejected_write_rolls_back_and_marks_unavailable() {
        let (host, mut device) = attach(heating_host()).await;
        host.fail_next_write(TransportError::new(
            TransportErrorKind::NotResponding,
            "Device is not responding",
        ));

        let err = device
            .write_capability(CapabilityId::TargetTemperature, CapabilityValue::Number(24.0))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Dispatch(DispatchError::Rejected(_))));
        assert_eq!(
            host.capability_sets().last(),
            Some(&(CapabilityId::TargetTemperature, CapabilityValue::Number(22.0)))
        );
        assert_eq!(device.state().target_temperature(), Some(22.0));
        assert_eq!(
            host.availability(),
            Availability::Unavailable(REASON_NOT_RESPONDING.to_string())
        );
        assert_eq!(
            device.state().availability(),
            &Availability::Unavailable(REASON_NOT_RESPONDING.to_string())
        );
    }

    #[tokio::test]
    async fn unclassified_failure_leaves_availability_alone() {
        let (host, mut device) = attach(heating_host()).await;
        host.fail_next_write(TransportError::from_message("checksum mismatch"));

        let result = device
            .write_capability(CapabilityId::Frost, true.into())
            .await;

        assert!(result.is_err());
        assert!(host.availability().is_available());
        assert!(host.unavailable_reasons().is_empty());
    }

    #[tokio::test]
    async fn read_only_capability_is_refused_without_a_write() {
        let (host, mut device) = attach(heating_host()).await;
        let writes_before = host.writes().len();

        let err = device
            .write_capability(CapabilityId::MeasurePower, CapabilityValue::Number(10.0))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Dispatch(DispatchError::ReadOnly(CapabilityId::MeasurePower))
        ));
        assert_eq!(host.writes().len(), writes_before);
    }

    #[tokio::test]
    async fn switching_off_zeroes_power_but_not_energy() {
        let host = heating_host()
            .with_attribute(Attribute::MeteringMultiplier, RawValue::Int(1))
            .with_attribute(Attribute::MeteringDivisor, RawValue::Int(1000))
            .with_attribute(Attribute::CurrentSummationDelivered, RawValue::Int(12345))
            .with_attribute(Attribute::ActivePower, RawValue::Int(1500));
        let (host, mut device) = attach(host).await;

        assert_eq!(device.state().power(), Some(1500.0));
        assert!((device.state().energy().unwrap() - 12.345).abs() < 1e-9);

        device
            .write_capability(CapabilityId::OnOff, false.into())
            .await
            .unwrap();

        assert_eq!(host.commands(), vec![SwitchCommand::Off]);
        assert_eq!(device.state().is_on(), Some(false));
        assert_eq!(device.state().power(), Some(0.0));
        assert_eq!(number(host.capability_value(CapabilityId::MeasurePower)), 0.0);
        assert!((device.state().energy().unwrap() - 12.345).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rejected_switch_off_restores_power() {
        let host = heating_host().with_attribute(Attribute::ActivePower, RawValue::Int(1500));
        let (host, mut device) = attach(host).await;
        host.fail_next_write(TransportError::new(
            TransportErrorKind::NotResponding,
            "Device is not responding",
        ));

        let result = device
            .write_capability(CapabilityId::OnOff, false.into())
            .await;

        assert!(result.is_err());
        // Zeroed before the command went out, then put back.
        assert!(
            host.capability_sets()
                .contains(&(CapabilityId::MeasurePower, CapabilityValue::Number(0.0)))
        );
        assert_eq!(number(host.capability_value(CapabilityId::MeasurePower)), 1500.0);
        assert_eq!(device.state().power(), Some(1500.0));
        assert_eq!(
            host.capability_value(CapabilityId::OnOff),
            Some(CapabilityValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn child_lock_is_written_as_keypad_level() {
        let (host, mut device) = attach(heating_host()).await;

        device
            .write_capability(CapabilityId::ChildLock, true.into())
            .await
            .unwrap();

        assert_eq!(host.writes_to(Attribute::KeypadLockout), vec![RawValue::Int(1)]);
        assert_eq!(device.state().child_lock(), Some(true));
    }

    #[tokio::test]
    async fn regulator_output_write_is_persisted() {
        let (host, mut device) = attach(heating_host()).await;
        device
            .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(6)))
            .await;

        device
            .write_capability(CapabilityId::RegulatorPercentage, CapabilityValue::Number(0.45))
            .await
            .unwrap();

        assert_eq!(
            host.writes_to(Attribute::RegulatorPercentage),
            vec![RawValue::Int(45)]
        );
        assert_eq!(host.store_value(keys::STORE_REGULATOR_PERCENTAGE), Some(json!(0.45)));
    }
}

// ============================================================================
// Reports
// ============================================================================

mod reports {
    use super::*;

    #[tokio::test]
    async fn switching_on_triggers_a_resync() {
        let (host, mut device) = attach(heating_host()).await;
        let reads_before = host.reads().len();

        device
            .report(AttributeReport::new(Attribute::OnOff, RawValue::Bool(true)))
            .await;
        assert_eq!(host.reads().len(), reads_before * 2);

        device
            .report(AttributeReport::new(Attribute::OnOff, RawValue::Bool(false)))
            .await;
        assert_eq!(host.reads().len(), reads_before * 2);
        assert_eq!(
            host.capability_value(CapabilityId::OnOff),
            Some(CapabilityValue::Bool(false))
        );
    }

    #[tokio::test]
    async fn clock_sync_request_writes_the_time() {
        let (host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(Attribute::SyncTimeReq, RawValue::Bool(true)))
            .await;

        assert_eq!(host.writes_to(Attribute::SyncTime).len(), 2);
    }

    #[tokio::test]
    async fn fault_label_is_the_highest_fault_bit() {
        let (host, mut device) = attach(heating_host()).await;

        device
            .report(AttributeReport::new(Attribute::Fault, RawValue::Bitmap(0b0010_0100)))
            .await;
        assert_eq!(
            host.capability_value(CapabilityId::Fault),
            Some(CapabilityValue::from("5"))
        );

        device
            .report(AttributeReport::new(Attribute::Fault, RawValue::Bitmap(0)))
            .await;
        assert_eq!(
            host.capability_value(CapabilityId::Fault),
            Some(CapabilityValue::from("0"))
        );
    }

    #[tokio::test]
    async fn settings_are_mirrored_from_reports() {
        let host = heating_host()
            .with_attribute(Attribute::CountdownSet, RawValue::Int(60))
            .with_attribute(Attribute::CountdownLeft, RawValue::Int(30))
            .with_attribute(Attribute::VacationStartDate, RawValue::Int(19000))
            .with_attribute(Attribute::Backlight, RawValue::Int(15))
            .with_attribute(Attribute::WindowCheck, RawValue::Bool(true))
            .with_attribute(Attribute::HolidayTempSet, RawValue::Int(1250));
        let (host, _device) = attach(host).await;

        let settings = host.settings();
        assert_eq!(settings[keys::COUNTDOWN_SET], "60");
        assert_eq!(settings[keys::COUNTDOWN_LEFT], "30 min");
        assert_eq!(settings[keys::VACATION_START_DATE], "2022-01-08");
        assert_eq!(settings[keys::LCD_BACKLIGHT_WAIT], "15");
        assert_eq!(settings[keys::WINDOW_CHECK], "true");
        assert_eq!(settings[keys::HOLIDAY_TEMP_SET], "12.5");
    }

    #[tokio::test]
    async fn malformed_report_is_dropped() {
        let (_host, mut device) = attach(heating_host()).await;
        let before = device.state().clone();

        device
            .report(AttributeReport::new(Attribute::RegulatorPercentage, RawValue::Int(250)))
            .await;
        device
            .report(AttributeReport::new(Attribute::Frost, RawValue::Bitmap(1)))
            .await;

        assert_eq!(device.state(), &before);
    }

    #[tokio::test]
    async fn state_changes_are_published() {
        let (_host, mut device) = attach(heating_host()).await;
        let mut events = device.subscribe();
        let mut watch = device.watch_state();

        device
            .report(AttributeReport::new(Attribute::Frost, RawValue::Bool(true)))
            .await;

        assert_eq!(
            events.try_recv().unwrap(),
            DeviceEvent::StateChanged {
                device_id: device.id(),
                change: StateChange::Frost(true),
            }
        );
        assert!(watch.has_changed().unwrap());
        assert_eq!(watch.borrow_and_update().frost(), Some(true));

        // Unchanged value, no event.
        device
            .report(AttributeReport::new(Attribute::Frost, RawValue::Bool(true)))
            .await;
        assert!(events.try_recv().is_err());
    }
}

// ============================================================================
// Settings
// ============================================================================

mod settings {
    use super::*;

    #[tokio::test]
    async fn changed_settings_are_written() {
        let (host, mut device) = attach(heating_host()).await;

        let changes = Settings::from([
            (keys::WINDOW_CHECK.to_string(), "true".to_string()),
            (keys::HOLIDAY_TEMP_SET.to_string(), "18.5".to_string()),
            (keys::COUNTDOWN_LEFT.to_string(), "12 min".to_string()),
        ]);
        device.update_settings(changes).await.unwrap();

        assert_eq!(host.writes_to(Attribute::WindowCheck), vec![RawValue::Bool(true)]);
        assert_eq!(host.writes_to(Attribute::HolidayTempSet), vec![RawValue::Int(1850)]);
        assert!(host.writes_to(Attribute::CountdownLeft).is_empty());
    }

    #[tokio::test]
    async fn unknown_key_is_reported_after_processing_the_rest() {
        let (host, mut device) = attach(heating_host()).await;

        let changes = Settings::from([
            ("bogus".to_string(), "1".to_string()),
            (keys::WINDOW_CHECK.to_string(), "false".to_string()),
        ]);
        let err = device.update_settings(changes).await.unwrap_err();

        assert!(matches!(err, Error::Dispatch(DispatchError::UnknownSetting(ref k)) if k == "bogus"));
        assert_eq!(host.writes_to(Attribute::WindowCheck), vec![RawValue::Bool(false)]);
    }

    #[tokio::test]
    async fn rejected_setting_write_is_classified() {
        let (host, mut device) = attach(heating_host()).await;
        host.fail_next_write(TransportError::from_message("Missing Zigbee Node"));

        let changes = Settings::from([(keys::LCD_BACKLIGHT_WAIT.to_string(), "30".to_string())]);
        let err = device.update_settings(changes).await.unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportErrorKind::NodeMissing));
        assert!(!host.availability().is_available());
    }
}

// ============================================================================
// Device task
// ============================================================================

mod handle {
    use super::*;

    #[tokio::test]
    async fn messages_are_applied_in_order() {
        let host = Arc::new(heating_host());
        let handle = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default()).spawn();

        handle
            .report(AttributeReport::new(Attribute::SystemMode, RawValue::Int(3)))
            .await
            .unwrap();
        handle
            .write_capability(CapabilityId::TargetTemperature, 24.0)
            .await
            .unwrap();

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.system_mode(), Some(SystemMode::Cool));
        assert_eq!(state.target_temperature(), Some(24.0));
        assert_eq!(handle.state(), state);
        assert_eq!(
            host.writes_to(Attribute::OccupiedCoolingSetpoint),
            vec![RawValue::Int(2400)]
        );
        assert!(handle.is_running());

        handle.detach();
    }

    #[tokio::test]
    async fn resync_reads_again() {
        let host = Arc::new(heating_host());
        let handle = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default()).spawn();
        handle.snapshot().await.unwrap();
        let reads_before = host.reads().len();

        handle.resync().await.unwrap();

        assert_eq!(host.reads().len(), reads_before * 2);
        handle.detach();
    }

    #[tokio::test]
    async fn detach_publishes_an_event() {
        let host = Arc::new(heating_host());
        let handle = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default()).spawn();
        let id = handle.id();
        let mut events = handle.subscribe();
        handle.snapshot().await.unwrap();

        handle.detach();

        let mut detached = false;
        while let Ok(event) = events.recv().await {
            if event == (DeviceEvent::Detached { device_id: id }) {
                detached = true;
                break;
            }
        }
        assert!(detached);
    }
}
