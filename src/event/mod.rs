// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device events.
//!
//! Every device task publishes what it observes on an [`EventBus`]: state
//! changes, capability reconciliations, availability changes and warnings.
//! The bus is a tokio broadcast channel, so any number of observers can
//! subscribe and a slow one only loses its own backlog.
//!
//! # Examples
//!
//! ```
//! use thermolink::event::{DeviceEvent, DeviceId, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! let device_id = DeviceId::new();
//! bus.publish(DeviceEvent::Attached { device_id });
//! assert_eq!(rx.try_recv().unwrap().device_id(), device_id);
//! ```

mod device_event;
mod device_id;
mod event_bus;

pub use device_event::DeviceEvent;
pub use device_id::DeviceId;
pub use event_bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
