// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `thermolink` library.
//!
//! Every failure in this crate is per-attribute or per-operation: a bad
//! report is dropped, a rejected write is rolled back and classified, and
//! an invalid limit pair is ignored. None of these errors ends the device
//! task.

use std::fmt;

use thiserror::Error;

use crate::attribute::Attribute;
use crate::capabilities::CapabilityId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A constrained value could not be constructed.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A raw attribute value could not be normalized.
    #[error("normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    /// Derived setpoint limits were rejected.
    #[error("limit violation: {0}")]
    Limit(#[from] LimitViolation),

    /// A capability write could not be mapped or was rejected.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A wire operation failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A host collaborator (registry, store, notifier) failed.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// A configuration document could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// The device task is no longer running.
    #[error("device is detached")]
    Detached,
}

impl Error {
    /// Returns the transport failure category carried by this error, if any.
    ///
    /// Host errors carry only text, so they go through the message table in
    /// [`TransportErrorKind::from_message`].
    #[must_use]
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport(err) | Self::Dispatch(DispatchError::Rejected(err)) => Some(err.kind),
            Self::Host(err) => Some(TransportErrorKind::from_message(&err.to_string())),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The actual value that was provided.
        actual: f64,
    },

    /// A label did not match any known variant.
    #[error("unknown label: {0}")]
    UnknownLabel(String),
}

/// A raw wire value that could not be turned into a semantic value.
///
/// The report carrying it is dropped and no state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// The raw value has the wrong shape for the attribute.
    #[error("{attribute}: expected {expected}")]
    TypeMismatch {
        /// Attribute being normalized.
        attribute: Attribute,
        /// Expected raw shape.
        expected: &'static str,
    },

    /// The raw value does not fit the attribute's wire type.
    #[error("{attribute}: raw value {raw} is outside the wire domain")]
    OutOfDomain {
        /// Attribute being normalized.
        attribute: Attribute,
        /// Offending raw value.
        raw: i64,
    },

    /// The raw value is well-formed but has no meaning in this model.
    #[error("{attribute}: unsupported value {raw}")]
    UnsupportedValue {
        /// Attribute being normalized.
        attribute: Attribute,
        /// Offending raw value.
        raw: i64,
    },

    /// The attribute is never reported by the device.
    #[error("{0} is write-only")]
    WriteOnly(Attribute),
}

/// Derived setpoint limits with `min >= max`.
///
/// The previous limits stay authoritative when this is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("setpoint minimum {min} is not below maximum {max}")]
pub struct LimitViolation {
    /// Selected minimum.
    pub min: f64,
    /// Selected maximum.
    pub max: f64,
}

/// Errors raised while turning a capability write into a wire write.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The capability is a readout and cannot be written.
    #[error("capability {0} is read-only")]
    ReadOnly(CapabilityId),

    /// The written value has the wrong type or domain.
    #[error("invalid value for {capability}: {reason}")]
    InvalidValue {
        /// Target capability.
        capability: CapabilityId,
        /// Why the value was refused.
        reason: String,
    },

    /// The settings key has no wire counterpart.
    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    /// The settings value does not parse for its key.
    #[error("invalid value {value:?} for setting {key}")]
    InvalidSetting {
        /// Settings key.
        key: String,
        /// Rejected value.
        value: String,
    },

    /// The transport rejected the write.
    #[error("write rejected: {0}")]
    Rejected(#[from] TransportError),
}

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The node object is unknown to the network stack.
    NodeNotFound,
    /// The device did not answer in time.
    NotResponding,
    /// The node is missing from the network.
    NodeMissing,
    /// The device could not be reached at all.
    Unreachable,
    /// Anything else; availability is left untouched.
    Other,
}

impl TransportErrorKind {
    /// Classifies a free-form error message.
    ///
    /// Compatibility table for transports that only report text. Matching
    /// is case-sensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use thermolink::error::TransportErrorKind;
    ///
    /// assert_eq!(
    ///     TransportErrorKind::from_message("Error: Device is not responding"),
    ///     TransportErrorKind::NotResponding,
    /// );
    /// assert_eq!(TransportErrorKind::from_message("timeout"), TransportErrorKind::Other);
    /// ```
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        const TABLE: [(&str, TransportErrorKind); 4] = [
            ("node_object_not_found", TransportErrorKind::NodeNotFound),
            ("Device is not responding", TransportErrorKind::NotResponding),
            ("Missing Zigbee Node", TransportErrorKind::NodeMissing),
            ("Could not reach device", TransportErrorKind::Unreachable),
        ];

        TABLE
            .iter()
            .find(|(needle, _)| message.contains(needle))
            .map_or(Self::Other, |(_, kind)| *kind)
    }

    /// Returns a stable name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NodeNotFound => "node_not_found",
            Self::NotResponding => "not_responding",
            Self::NodeMissing => "node_missing",
            Self::Unreachable => "unreachable",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed wire operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// Structured category.
    pub kind: TransportErrorKind,
    /// Message reported by the transport.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error with an explicit category.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a transport error whose category is derived from its text.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: TransportErrorKind::from_message(&message),
            message,
        }
    }
}

/// Failures of the host-side collaborators.
///
/// These are logged and never abort device processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// A capability registry operation failed.
    #[error("capability {capability}: {message}")]
    Registry {
        /// Capability involved.
        capability: String,
        /// Failure description.
        message: String,
    },

    /// The settings or key/value store failed.
    #[error("store: {0}")]
    Store(String),

    /// The user notification channel failed.
    #[error("notification: {0}")]
    Notification(String),
}
