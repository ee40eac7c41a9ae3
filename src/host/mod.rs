// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces to the device-management host.
//!
//! The core never talks to a platform directly. It is handed one value
//! implementing four narrow traits:
//!
//! - [`CapabilityRegistry`]: the capabilities exposed for the device
//! - [`SettingsStore`]: user-visible settings plus a private key/value store
//! - [`AttributeTransport`]: wire reads, writes and on/off commands
//! - [`Notifier`]: warnings and availability shown to the user
//!
//! [`Host`] is implemented for every type that implements all four. Async
//! methods return `Send` futures so a device can run on a multi-threaded
//! runtime. Incoming reports are not part of these traits: the host adapter
//! forwards them to [`DeviceHandle::report`](crate::device::DeviceHandle::report).

#[cfg(feature = "memory")]
pub mod memory;

use std::collections::BTreeMap;
use std::future::Future;

use crate::attribute::{Attribute, AttributeValues};
use crate::capabilities::{CapabilityDiff, CapabilityId, CapabilityValue};
use crate::command::SwitchCommand;
use crate::error::{HostError, TransportError};
use crate::limits::SetpointLimits;

/// User-visible settings, keyed by setting name.
pub type Settings = BTreeMap<String, String>;

/// The capability registry of the host.
///
/// Every operation is idempotent: adding a present capability or removing
/// an absent one succeeds without effect.
pub trait CapabilityRegistry: Send + Sync {
    /// Returns `true` if the capability is exposed.
    fn has(&self, id: CapabilityId) -> impl Future<Output = bool> + Send;

    /// Ensures the capability is exposed.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Registry`] when the registry rejects the change.
    fn add(&self, id: CapabilityId) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Ensures the capability is not exposed.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Registry`] when the registry rejects the change.
    fn remove(&self, id: CapabilityId) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Current value of the capability, if any.
    fn get(&self, id: CapabilityId) -> impl Future<Output = Option<CapabilityValue>> + Send;

    /// Sets the value of the capability.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Registry`] when the capability is not exposed or
    /// the value is rejected.
    fn set(
        &self,
        id: CapabilityId,
        value: CapabilityValue,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Sets the numeric range shown for the capability.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Registry`] when the options are rejected.
    fn set_options(
        &self,
        id: CapabilityId,
        limits: SetpointLimits,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Applies a reconciliation diff as one batch.
    ///
    /// The provided implementation removes first and then adds, logging
    /// and skipping individual failures. Registries that can swap the whole
    /// set atomically should override it.
    fn apply(&self, diff: &CapabilityDiff) -> impl Future<Output = ()> + Send {
        async move {
            for id in diff.to_remove.iter() {
                if let Err(e) = self.remove(id).await {
                    tracing::warn!(capability = %id, error = %e, "Failed to remove capability");
                }
            }
            for id in diff.to_add.iter() {
                if let Err(e) = self.add(id).await {
                    tracing::warn!(capability = %id, error = %e, "Failed to add capability");
                }
            }
        }
    }
}

/// Settings and persistent store of the host.
pub trait SettingsStore: Send + Sync {
    /// Returns all settings.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Store`] when the settings cannot be read.
    fn get_settings(&self) -> impl Future<Output = Result<Settings, HostError>> + Send;

    /// Merges `partial` into the settings. Keys not present are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Store`] when the settings cannot be written.
    fn set_settings(&self, partial: Settings) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Reads a stored value.
    fn get_store_value(&self, key: &str)
    -> impl Future<Output = Option<serde_json::Value>> + Send;

    /// Writes a stored value.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Store`] when the value cannot be written.
    fn set_store_value(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}

/// Wire access to the device.
pub trait AttributeTransport: Send + Sync {
    /// Reads attributes.
    ///
    /// Attributes missing from the returned map failed individually; the
    /// rest of the map is valid.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the whole read failed.
    fn read_attributes(
        &self,
        attributes: &[Attribute],
    ) -> impl Future<Output = Result<AttributeValues, TransportError>> + Send;

    /// Writes attributes and waits for the acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the write was not acknowledged.
    fn write_attributes(
        &self,
        values: AttributeValues,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Sends an on/off cluster command.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the command was not acknowledged.
    fn send_command(
        &self,
        command: SwitchCommand,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    /// Shows a warning on the device.
    fn show_warning(&self, text: &str);

    /// Clears the current warning.
    fn clear_warning(&self);

    /// Marks the device available.
    fn set_available(&self);

    /// Marks the device unavailable with a reason shown to the user.
    fn set_unavailable(&self, reason: &str);
}

/// Everything a device needs from its host.
pub trait Host:
    CapabilityRegistry + SettingsStore + AttributeTransport + Notifier + 'static
{
}

impl<T> Host for T where
    T: CapabilityRegistry + SettingsStore + AttributeTransport + Notifier + 'static
{
}
