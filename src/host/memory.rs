// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory host.
//!
//! [`MemoryHost`] keeps every collaborator in a single mutex-guarded record
//! and logs each call, so tests can assert on exactly what a device did.
//! Wire reads are answered from a table of attribute values that writes
//! also update. Failures can be scripted per call.
//!
//! # Examples
//!
//! ```
//! use thermolink::attribute::{Attribute, RawValue};
//! use thermolink::host::memory::MemoryHost;
//!
//! let host = MemoryHost::new()
//!     .with_attribute(Attribute::SystemMode, RawValue::Int(3))
//!     .with_attribute(Attribute::SensorMode, RawValue::Int(0));
//! assert_eq!(host.attribute(Attribute::SystemMode), Some(RawValue::Int(3)));
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use parking_lot::Mutex;

use crate::attribute::{Attribute, AttributeValues, RawValue};
use crate::availability::Availability;
use crate::capabilities::{CapabilityDiff, CapabilityId, CapabilityValue};
use crate::command::SwitchCommand;
use crate::error::{HostError, TransportError};
use crate::limits::SetpointLimits;

use super::{AttributeTransport, CapabilityRegistry, Notifier, Settings, SettingsStore};

/// A registry mutation, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOp {
    /// `add` was called.
    Add(CapabilityId),
    /// `remove` was called.
    Remove(CapabilityId),
}

#[derive(Debug, Default)]
struct Inner {
    capabilities: BTreeMap<CapabilityId, Option<CapabilityValue>>,
    options: BTreeMap<CapabilityId, SetpointLimits>,
    registry_ops: Vec<RegistryOp>,
    capability_sets: Vec<(CapabilityId, CapabilityValue)>,

    settings: Settings,
    store: BTreeMap<String, serde_json::Value>,
    store_writes: Vec<(String, serde_json::Value)>,

    attributes: AttributeValues,
    unreadable: BTreeSet<Attribute>,
    read_failure: Option<TransportError>,
    write_failures: VecDeque<TransportError>,
    reads: Vec<Vec<Attribute>>,
    writes: Vec<AttributeValues>,
    commands: Vec<SwitchCommand>,

    warnings: Vec<String>,
    active_warning: Option<String>,
    warning_clears: usize,
    availability: Availability,
    unavailable_reasons: Vec<String>,
}

/// A host that lives entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    inner: Mutex<Inner>,
}

impl MemoryHost {
    /// Creates an empty host: no capabilities, settings or attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Setup ==========

    /// Serves `value` for reads of `attribute`.
    #[must_use]
    pub fn with_attribute(self, attribute: Attribute, value: RawValue) -> Self {
        self.inner.lock().attributes.insert(attribute, value);
        self
    }

    /// Starts with `id` already exposed.
    #[must_use]
    pub fn with_capability(self, id: CapabilityId) -> Self {
        self.inner.lock().capabilities.insert(id, None);
        self
    }

    /// Starts with a stored value.
    #[must_use]
    pub fn with_store_value(self, key: &str, value: serde_json::Value) -> Self {
        self.inner.lock().store.insert(key.to_string(), value);
        self
    }

    /// Changes the value served for `attribute`.
    pub fn set_attribute(&self, attribute: Attribute, value: RawValue) {
        self.inner.lock().attributes.insert(attribute, value);
    }

    /// Leaves `attribute` out of every read result.
    pub fn make_unreadable(&self, attribute: Attribute) {
        self.inner.lock().unreadable.insert(attribute);
    }

    /// Fails every read with `error` until cleared with `None`.
    pub fn fail_reads(&self, error: Option<TransportError>) {
        self.inner.lock().read_failure = error;
    }

    /// Fails the next write or command with `error`.
    pub fn fail_next_write(&self, error: TransportError) {
        self.inner.lock().write_failures.push_back(error);
    }

    // ========== Inspection ==========

    /// Value currently served for `attribute`.
    #[must_use]
    pub fn attribute(&self, attribute: Attribute) -> Option<RawValue> {
        self.inner.lock().attributes.get(&attribute).copied()
    }

    /// Exposed capabilities.
    #[must_use]
    pub fn capabilities(&self) -> BTreeSet<CapabilityId> {
        self.inner.lock().capabilities.keys().copied().collect()
    }

    /// Value of an exposed capability.
    #[must_use]
    pub fn capability_value(&self, id: CapabilityId) -> Option<CapabilityValue> {
        self.inner.lock().capabilities.get(&id).cloned().flatten()
    }

    /// Options last set for a capability.
    #[must_use]
    pub fn options(&self, id: CapabilityId) -> Option<SetpointLimits> {
        self.inner.lock().options.get(&id).copied()
    }

    /// Registry mutations, in call order.
    #[must_use]
    pub fn registry_ops(&self) -> Vec<RegistryOp> {
        self.inner.lock().registry_ops.clone()
    }

    /// Capability value sets, in call order.
    #[must_use]
    pub fn capability_sets(&self) -> Vec<(CapabilityId, CapabilityValue)> {
        self.inner.lock().capability_sets.clone()
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.inner.lock().settings.clone()
    }

    /// A stored value.
    #[must_use]
    pub fn store_value(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.lock().store.get(key).cloned()
    }

    /// Number of writes of `key` to the store.
    #[must_use]
    pub fn store_writes_of(&self, key: &str) -> usize {
        self.inner
            .lock()
            .store_writes
            .iter()
            .filter(|(k, _)| k == key)
            .count()
    }

    /// Attribute lists requested by reads, in call order.
    #[must_use]
    pub fn reads(&self) -> Vec<Vec<Attribute>> {
        self.inner.lock().reads.clone()
    }

    /// Acknowledged attribute writes, in call order.
    #[must_use]
    pub fn writes(&self) -> Vec<AttributeValues> {
        self.inner.lock().writes.clone()
    }

    /// Acknowledged writes that touched `attribute`.
    #[must_use]
    pub fn writes_to(&self, attribute: Attribute) -> Vec<RawValue> {
        self.inner
            .lock()
            .writes
            .iter()
            .filter_map(|w| w.get(&attribute).copied())
            .collect()
    }

    /// Acknowledged on/off commands, in call order.
    #[must_use]
    pub fn commands(&self) -> Vec<SwitchCommand> {
        self.inner.lock().commands.clone()
    }

    /// Every warning shown.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.inner.lock().warnings.clone()
    }

    /// Warning currently shown.
    #[must_use]
    pub fn active_warning(&self) -> Option<String> {
        self.inner.lock().active_warning.clone()
    }

    /// Number of `clear_warning` calls.
    #[must_use]
    pub fn warning_clears(&self) -> usize {
        self.inner.lock().warning_clears
    }

    /// Current availability.
    #[must_use]
    pub fn availability(&self) -> Availability {
        self.inner.lock().availability.clone()
    }

    /// Every reason passed to `set_unavailable`.
    #[must_use]
    pub fn unavailable_reasons(&self) -> Vec<String> {
        self.inner.lock().unavailable_reasons.clone()
    }
}

impl CapabilityRegistry for MemoryHost {
    async fn has(&self, id: CapabilityId) -> bool {
        self.inner.lock().capabilities.contains_key(&id)
    }

    async fn add(&self, id: CapabilityId) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.registry_ops.push(RegistryOp::Add(id));
        inner.capabilities.entry(id).or_insert(None);
        Ok(())
    }

    async fn remove(&self, id: CapabilityId) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.registry_ops.push(RegistryOp::Remove(id));
        inner.capabilities.remove(&id);
        inner.options.remove(&id);
        Ok(())
    }

    async fn apply(&self, diff: &CapabilityDiff) {
        let mut inner = self.inner.lock();
        for id in diff.to_remove.iter() {
            inner.registry_ops.push(RegistryOp::Remove(id));
            inner.capabilities.remove(&id);
            inner.options.remove(&id);
        }
        for id in diff.to_add.iter() {
            inner.registry_ops.push(RegistryOp::Add(id));
            inner.capabilities.entry(id).or_insert(None);
        }
    }

    async fn get(&self, id: CapabilityId) -> Option<CapabilityValue> {
        self.capability_value(id)
    }

    async fn set(&self, id: CapabilityId, value: CapabilityValue) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        let Some(slot) = inner.capabilities.get_mut(&id) else {
            return Err(HostError::Registry {
                capability: id.to_string(),
                message: "capability not exposed".to_string(),
            });
        };
        *slot = Some(value.clone());
        inner.capability_sets.push((id, value));
        Ok(())
    }

    async fn set_options(&self, id: CapabilityId, limits: SetpointLimits) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        if !inner.capabilities.contains_key(&id) {
            return Err(HostError::Registry {
                capability: id.to_string(),
                message: "capability not exposed".to_string(),
            });
        }
        inner.options.insert(id, limits);
        Ok(())
    }
}

impl SettingsStore for MemoryHost {
    async fn get_settings(&self) -> Result<Settings, HostError> {
        Ok(self.settings())
    }

    async fn set_settings(&self, partial: Settings) -> Result<(), HostError> {
        self.inner.lock().settings.extend(partial);
        Ok(())
    }

    async fn get_store_value(&self, key: &str) -> Option<serde_json::Value> {
        self.store_value(key)
    }

    async fn set_store_value(&self, key: &str, value: serde_json::Value) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        inner.store_writes.push((key.to_string(), value.clone()));
        inner.store.insert(key.to_string(), value);
        Ok(())
    }
}

impl AttributeTransport for MemoryHost {
    async fn read_attributes(
        &self,
        attributes: &[Attribute],
    ) -> Result<AttributeValues, TransportError> {
        let mut inner = self.inner.lock();
        inner.reads.push(attributes.to_vec());
        if let Some(err) = &inner.read_failure {
            return Err(err.clone());
        }
        Ok(attributes
            .iter()
            .filter(|a| !inner.unreadable.contains(*a))
            .filter_map(|a| inner.attributes.get(a).map(|v| (*a, *v)))
            .collect())
    }

    async fn write_attributes(&self, values: AttributeValues) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.write_failures.pop_front() {
            return Err(err);
        }
        inner
            .attributes
            .extend(values.iter().map(|(a, v)| (*a, *v)));
        inner.writes.push(values);
        Ok(())
    }

    async fn send_command(&self, command: SwitchCommand) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.write_failures.pop_front() {
            return Err(err);
        }
        inner
            .attributes
            .insert(Attribute::OnOff, RawValue::Bool(command.is_on()));
        inner.commands.push(command);
        Ok(())
    }
}

impl Notifier for MemoryHost {
    fn show_warning(&self, text: &str) {
        let mut inner = self.inner.lock();
        inner.warnings.push(text.to_string());
        inner.active_warning = Some(text.to_string());
    }

    fn clear_warning(&self) {
        let mut inner = self.inner.lock();
        inner.warning_clears += 1;
        inner.active_warning = None;
    }

    fn set_available(&self) {
        self.inner.lock().availability = Availability::Available;
    }

    fn set_unavailable(&self, reason: &str) {
        let mut inner = self.inner.lock();
        inner.unavailable_reasons.push(reason.to_string());
        inner.availability = Availability::Unavailable(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;

    #[tokio::test]
    async fn reads_skip_missing_and_unreadable() {
        let host = MemoryHost::new()
            .with_attribute(Attribute::SystemMode, RawValue::Int(4))
            .with_attribute(Attribute::Fault, RawValue::Bitmap(0));
        host.make_unreadable(Attribute::Fault);

        let values = host
            .read_attributes(&[Attribute::SystemMode, Attribute::Fault, Attribute::OnOff])
            .await
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[&Attribute::SystemMode], RawValue::Int(4));
    }

    #[tokio::test]
    async fn scripted_write_failure_is_used_once() {
        let host = MemoryHost::new();
        host.fail_next_write(TransportError::new(TransportErrorKind::Unreachable, "timeout"));

        let values = AttributeValues::from([(Attribute::Frost, RawValue::Bool(true))]);
        assert!(host.write_attributes(values.clone()).await.is_err());
        assert!(host.write_attributes(values).await.is_ok());
        assert_eq!(host.writes_to(Attribute::Frost), vec![RawValue::Bool(true)]);
    }

    #[tokio::test]
    async fn set_requires_exposed_capability() {
        let host = MemoryHost::new().with_capability(CapabilityId::OnOff);
        assert!(host.set(CapabilityId::OnOff, true.into()).await.is_ok());
        assert!(host.set(CapabilityId::Frost, true.into()).await.is_err());
        assert_eq!(
            host.capability_value(CapabilityId::OnOff),
            Some(CapabilityValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn apply_removes_before_adding() {
        let host = MemoryHost::new().with_capability(CapabilityId::Datetime);
        let diff = CapabilityDiff {
            to_add: [CapabilityId::Frost].into_iter().collect(),
            to_remove: [CapabilityId::Datetime].into_iter().collect(),
        };
        host.apply(&diff).await;
        assert_eq!(
            host.registry_ops(),
            vec![
                RegistryOp::Remove(CapabilityId::Datetime),
                RegistryOp::Add(CapabilityId::Frost)
            ]
        );
        assert_eq!(host.capabilities(), BTreeSet::from([CapabilityId::Frost]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn apply_is_never_observed_half_done() {
        let first = BTreeSet::from([CapabilityId::TargetTemperature, CapabilityId::MeasureTemperature]);
        let second = BTreeSet::from([CapabilityId::Regulator, CapabilityId::RegulatorPercentage]);
        let host = std::sync::Arc::new(MemoryHost::new());
        for &id in &first {
            host.add(id).await.unwrap();
        }
        let forward = CapabilityDiff {
            to_add: second.iter().copied().collect(),
            to_remove: first.iter().copied().collect(),
        };
        let back = CapabilityDiff {
            to_add: first.iter().copied().collect(),
            to_remove: second.iter().copied().collect(),
        };

        let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let observer = {
            let host = std::sync::Arc::clone(&host);
            let stop = std::sync::Arc::clone(&stop);
            let (first, second) = (first.clone(), second.clone());
            std::thread::spawn(move || {
                while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                    let seen = host.capabilities();
                    assert!(seen == first || seen == second, "partial registry: {seen:?}");
                }
            })
        };

        for _ in 0..500 {
            host.apply(&forward).await;
            host.apply(&back).await;
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        observer.join().unwrap();
        assert_eq!(host.capabilities(), first);
    }

    #[tokio::test]
    async fn settings_merge() {
        let host = MemoryHost::new();
        host.set_settings(Settings::from([("a".into(), "1".into())]))
            .await
            .unwrap();
        host.set_settings(Settings::from([("b".into(), "2".into())]))
            .await
            .unwrap();
        assert_eq!(host.settings().len(), 2);
    }

    #[test]
    fn notifier_tracks_warning_and_availability() {
        let host = MemoryHost::new();
        host.show_warning("careful");
        assert_eq!(host.active_warning().as_deref(), Some("careful"));
        host.clear_warning();
        assert!(host.active_warning().is_none());

        host.set_unavailable("gone");
        assert_eq!(host.availability(), Availability::Unavailable("gone".into()));
        host.set_available();
        assert!(host.availability().is_available());
    }
}
