// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Availability classification.
//!
//! Transport failures map one-to-one from [`TransportErrorKind`] to an
//! [`AvailabilityAction`]. Four kinds mark the device unavailable with a
//! fixed reason; anything else leaves availability alone and is only
//! logged. Each failure is classified exactly once; repeated failures are
//! not deduplicated.
//!
//! # Examples
//!
//! ```
//! use thermolink::availability::{AvailabilityAction, classify};
//! use thermolink::error::TransportErrorKind;
//!
//! assert_eq!(
//!     classify(TransportErrorKind::Unreachable),
//!     AvailabilityAction::MarkUnavailable("Could not reach device. Is it powered on?"),
//! );
//! assert_eq!(classify(TransportErrorKind::Other), AvailabilityAction::Unchanged);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TransportErrorKind;

/// Reason shown when the node object is gone.
pub const REASON_NODE_NOT_FOUND: &str = "Perhaps device is left network";
/// Reason shown when the device stops answering.
pub const REASON_NOT_RESPONDING: &str = "Device is not responding, make sure the device has power.";
/// Reason shown when the node is missing from the network.
pub const REASON_NODE_MISSING: &str = "Zigbee node is missing. Perhaps device has left the network.";
/// Reason shown when the device cannot be reached.
pub const REASON_UNREACHABLE: &str = "Could not reach device. Is it powered on?";

/// Availability of a device as last reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Availability {
    /// Reachable.
    #[default]
    Available,
    /// Unreachable, with the reason shown to the user.
    Unavailable(String),
}

impl Availability {
    /// Returns `true` when available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// What to do with availability after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityAction {
    /// Mark the device unavailable with this reason.
    MarkUnavailable(&'static str),
    /// Leave availability as it is.
    Unchanged,
}

/// Classifies a transport failure kind.
#[must_use]
pub const fn classify(kind: TransportErrorKind) -> AvailabilityAction {
    match kind {
        TransportErrorKind::NodeNotFound => AvailabilityAction::MarkUnavailable(REASON_NODE_NOT_FOUND),
        TransportErrorKind::NotResponding => {
            AvailabilityAction::MarkUnavailable(REASON_NOT_RESPONDING)
        }
        TransportErrorKind::NodeMissing => AvailabilityAction::MarkUnavailable(REASON_NODE_MISSING),
        TransportErrorKind::Unreachable => AvailabilityAction::MarkUnavailable(REASON_UNREACHABLE),
        TransportErrorKind::Other => AvailabilityAction::Unchanged,
    }
}

/// Classifies a free-form error message.
#[must_use]
pub fn classify_text(message: &str) -> AvailabilityAction {
    classify(TransportErrorKind::from_message(message))
}
