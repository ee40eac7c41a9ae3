// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task wrapper around a device.
//!
//! [`ThermostatDevice::spawn`] moves a device into its own tokio task. The
//! task owns the state exclusively; the returned [`DeviceHandle`] talks to
//! it through a bounded mailbox, so messages are applied one at a time in
//! the order they were sent.

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::attribute::AttributeReport;
use crate::capabilities::{CapabilityId, CapabilityValue};
use crate::error::{Error, Result};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::host::{Host, Settings};
use crate::mode::SensorModeRequest;
use crate::state::DeviceState;
use crate::types::SensorMode;

use super::ThermostatDevice;

enum DeviceMessage {
    Report(AttributeReport),
    WriteCapability {
        capability: CapabilityId,
        value: CapabilityValue,
        reply: oneshot::Sender<Result<()>>,
    },
    UpdateSettings {
        changes: Settings,
        reply: oneshot::Sender<Result<()>>,
    },
    RequestSensorMode {
        mode: SensorMode,
        reply: oneshot::Sender<SensorModeRequest>,
    },
    Resync {
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<DeviceState>,
    },
}

/// Handle to a device running in its own task.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use thermolink::attribute::{Attribute, AttributeReport};
/// use thermolink::capabilities::CapabilityId;
/// use thermolink::config::DeviceConfig;
/// use thermolink::device::ThermostatDevice;
/// use thermolink::host::memory::MemoryHost;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> thermolink::Result<()> {
/// let host = Arc::new(MemoryHost::new());
/// let handle = ThermostatDevice::new(Arc::clone(&host), DeviceConfig::default()).spawn();
///
/// handle.report(AttributeReport::new(Attribute::Frost, true)).await?;
/// handle.write_capability(CapabilityId::TargetTemperature, 21.5).await?;
///
/// let state = handle.snapshot().await?;
/// assert_eq!(state.frost(), Some(true));
/// assert_eq!(state.target_temperature(), Some(21.5));
///
/// handle.detach();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DeviceHandle {
    id: DeviceId,
    sender: mpsc::Sender<DeviceMessage>,
    state: watch::Receiver<DeviceState>,
    events: EventBus,
    task: JoinHandle<()>,
}

impl<H: Host> ThermostatDevice<H> {
    /// Moves the device into its own task and attaches it there.
    ///
    /// Messages sent before the attach sequence completes are queued and
    /// handled after it.
    #[must_use]
    pub fn spawn(self) -> DeviceHandle {
        let (sender, mailbox) = mpsc::channel(self.config.mailbox_capacity.max(1));
        let id = self.id;
        let state = self.watch_state();
        let events = self.events.clone();
        let task = tokio::spawn(self.run(mailbox));

        DeviceHandle {
            id,
            sender,
            state,
            events,
            task,
        }
    }

    async fn run(mut self, mut mailbox: mpsc::Receiver<DeviceMessage>) {
        if let Err(e) = self.attach().await {
            tracing::warn!(device_id = %self.id, error = %e, "Initial read incomplete");
        }

        while let Some(message) = mailbox.recv().await {
            match message {
                DeviceMessage::Report(report) => self.report(report).await,
                DeviceMessage::WriteCapability {
                    capability,
                    value,
                    reply,
                } => {
                    let _ = reply.send(self.write_capability(capability, value).await);
                }
                DeviceMessage::UpdateSettings { changes, reply } => {
                    let _ = reply.send(self.update_settings(changes).await);
                }
                DeviceMessage::RequestSensorMode { mode, reply } => {
                    let _ = reply.send(self.request_sensor_mode(mode));
                }
                DeviceMessage::Resync { reply } => {
                    let _ = reply.send(self.initial_sync().await);
                }
                DeviceMessage::Snapshot { reply } => {
                    let _ = reply.send(self.state.clone());
                }
            }
        }

        tracing::debug!(device_id = %self.id, "Mailbox closed, device task stopped");
    }
}

impl DeviceHandle {
    /// Device identifier.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Forwards an attribute report to the device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detached`] if the task has stopped.
    pub async fn report(&self, report: AttributeReport) -> Result<()> {
        self.send(DeviceMessage::Report(report)).await
    }

    /// Writes a capability value and waits for the acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns the write's error, or [`Error::Detached`] if the task has
    /// stopped.
    pub async fn write_capability(
        &self,
        capability: CapabilityId,
        value: impl Into<CapabilityValue>,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(DeviceMessage::WriteCapability {
            capability,
            value: value.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::Detached)?
    }

    /// Applies changed settings.
    ///
    /// # Errors
    ///
    /// Returns the first setting error, or [`Error::Detached`] if the task
    /// has stopped.
    pub async fn update_settings(&self, changes: Settings) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(DeviceMessage::UpdateSettings { changes, reply })
            .await?;
        rx.await.map_err(|_| Error::Detached)?
    }

    /// Asks for a sensor mode change. The request is always ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detached`] if the task has stopped.
    pub async fn request_sensor_mode(&self, mode: SensorMode) -> Result<SensorModeRequest> {
        let (reply, rx) = oneshot::channel();
        self.send(DeviceMessage::RequestSensorMode { mode, reply })
            .await?;
        rx.await.map_err(|_| Error::Detached)
    }

    /// Re-runs the initial read.
    ///
    /// # Errors
    ///
    /// Returns the first failed read, or [`Error::Detached`] if the task has
    /// stopped.
    pub async fn resync(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(DeviceMessage::Resync { reply }).await?;
        rx.await.map_err(|_| Error::Detached)?
    }

    /// Returns the state once every message sent before this call has been
    /// handled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Detached`] if the task has stopped.
    pub async fn snapshot(&self) -> Result<DeviceState> {
        let (reply, rx) = oneshot::channel();
        self.send(DeviceMessage::Snapshot { reply }).await?;
        rx.await.map_err(|_| Error::Detached)
    }

    /// Latest published state, without waiting for queued messages.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    /// Watches state snapshots.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.state.clone()
    }

    /// Subscribes to device events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Returns `true` while the task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the device task.
    ///
    /// Pending operations are dropped at their next suspension point and the
    /// state is discarded.
    pub fn detach(self) {
        self.task.abort();
        tracing::info!(device_id = %self.id, "Device detached");
        self.events.publish(DeviceEvent::Detached {
            device_id: self.id,
        });
    }

    async fn send(&self, message: DeviceMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| Error::Detached)
    }
}
