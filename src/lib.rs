// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `thermolink` - capability translation core for Zigbee floor-heating
//! thermostats.
//!
//! The crate keeps a host's abstract capability model (on/off, target
//! temperature, regulator percentage, ...) in sync with a thermostat that
//! speaks typed wire attributes: fixed-point temperatures, bitmaps, scaled
//! counters and enumerated modes.
//!
//! # Pieces
//!
//! - [`attribute`]: wire attribute catalogue and the normalizer turning raw
//!   values into semantic ones
//! - [`limits`]: target temperature limits derived from mode and unit
//! - [`capabilities`]: the mode to capability-set mapping and its diff
//! - [`mode`]: sensor mode and system mode tracking
//! - [`command`]: capability and setting writes mapped to wire writes
//! - [`availability`]: transport failure classification
//! - [`host`]: the traits a device-management host implements
//! - [`device`]: the per-device core tying it all together
//!
//! The library installs no `tracing` subscriber; hosts pick one.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use thermolink::attribute::{Attribute, AttributeReport, RawValue};
//! use thermolink::capabilities::CapabilityId;
//! use thermolink::host::memory::MemoryHost;
//! use thermolink::{DeviceConfig, ThermostatDevice};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> thermolink::Result<()> {
//! let host = Arc::new(
//!     MemoryHost::new()
//!         .with_attribute(Attribute::SystemMode, RawValue::Int(3))
//!         .with_attribute(Attribute::SensorMode, RawValue::Int(0)),
//! );
//! let device = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default()).spawn();
//!
//! // Cooling mode: the target maps to the cooling setpoint.
//! device.write_capability(CapabilityId::TargetTemperature, 22.5).await?;
//! assert_eq!(
//!     host.writes_to(Attribute::OccupiedCoolingSetpoint),
//!     vec![RawValue::Int(2250)]
//! );
//!
//! // Reports from the transport are forwarded to the device.
//! device
//!     .report(AttributeReport::new(Attribute::SensorMode, RawValue::Int(6)))
//!     .await?;
//! let state = device.snapshot().await?;
//! assert!(state.sensor_mode().is_regulator());
//! assert!(host.capabilities().contains(&CapabilityId::RegulatorPercentage));
//!
//! device.detach();
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod availability;
pub mod capabilities;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod host;
pub mod limits;
pub mod mode;
pub mod state;
pub mod types;

pub use attribute::{Attribute, AttributeReport, RawValue};
pub use capabilities::{CapabilityId, CapabilityValue};
pub use config::DeviceConfig;
pub use device::{DeviceHandle, ThermostatDevice};
pub use error::{Error, Result};
pub use event::{DeviceEvent, DeviceId, EventBus};
pub use host::Host;
pub use state::{DeviceState, StateChange};
