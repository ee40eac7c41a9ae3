// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management types.
//!
//! [`DeviceState`] is the per-device record owned by the device task, and
//! [`StateChange`] describes one update applied to it. Observers receive
//! snapshots of the state through the device handle.
//!
//! # Examples
//!
//! ```
//! use thermolink::state::{DeviceState, StateChange};
//!
//! let mut state = DeviceState::new();
//! state.apply(&StateChange::OnOff(true));
//! assert_eq!(state.is_on(), Some(true));
//! ```

mod device_state;
mod state_change;

pub use device_state::DeviceState;
pub use state_change::StateChange;
