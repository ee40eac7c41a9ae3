// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration.
//!
//! # Examples
//!
//! ```
//! use thermolink::DeviceConfig;
//!
//! let config = DeviceConfig::from_json(r#"{ "utc_offset_minutes": 60 }"#).unwrap();
//! assert_eq!(config.utc_offset_minutes, 60);
//! assert!((config.default_regulator_percentage - 0.2).abs() < f64::EPSILON);
//!
//! let config = DeviceConfig::default().with_event_capacity(16);
//! assert_eq!(config.event_capacity, 16);
//! ```

use serde::{Deserialize, Serialize};

use crate::attribute::ScaleFactors;
use crate::error::Result;
use crate::limits::{HardwareLimits, SetpointLimits};

/// Configuration of one thermostat instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Built-in hardware limits used until the device reports its own.
    pub hardware_limits: HardwareLimits,
    /// Target temperature limits applied at attach time.
    pub initial_limits: SetpointLimits,
    /// Power/energy scale factors used until the device reports its own.
    pub fallback_scales: ScaleFactors,
    /// Regulator output seeded on entering regulator mode (fraction).
    pub default_regulator_percentage: f64,
    /// Offset added to UTC for the clock-sync write.
    pub utc_offset_minutes: i32,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Capacity of the device task mailbox.
    pub mailbox_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hardware_limits: HardwareLimits::default(),
            initial_limits: SetpointLimits::default(),
            fallback_scales: ScaleFactors::default(),
            default_regulator_percentage: 0.2,
            utc_offset_minutes: 0,
            event_capacity: 256,
            mailbox_capacity: 64,
        }
    }
}

impl DeviceConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is not valid JSON or a field
    /// has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the built-in hardware limits.
    #[must_use]
    pub fn with_hardware_limits(mut self, limits: HardwareLimits) -> Self {
        self.hardware_limits = limits;
        self
    }

    /// Sets the fallback scale factors.
    #[must_use]
    pub fn with_fallback_scales(mut self, scales: ScaleFactors) -> Self {
        self.fallback_scales = scales;
        self
    }

    /// Sets the default regulator percentage.
    #[must_use]
    pub fn with_default_regulator_percentage(mut self, fraction: f64) -> Self {
        self.default_regulator_percentage = fraction;
        self
    }

    /// Sets the UTC offset used for clock sync.
    #[must_use]
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the mailbox capacity.
    #[must_use]
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }
}
