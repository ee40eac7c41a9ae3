// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bitmask attribute decoding.
//!
//! Bitmask fields are reduced to a single label: the label of the highest
//! set bit. An empty mask, or a top bit without a label, yields the
//! field's default label. That default is a policy, not an error.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of the highest set bit, if any.
#[must_use]
pub const fn highest_bit(bits: u32) -> Option<u32> {
    if bits == 0 {
        None
    } else {
        Some(31 - bits.leading_zeros())
    }
}

/// Thermostat fault bitmap.
///
/// Bits 1 to 7 carry fault numbers. The label is the highest fault number
/// present, or `"0"` when no defined fault bit is set.
///
/// # Examples
///
/// ```
/// use thermolink::types::FaultCode;
///
/// assert_eq!(FaultCode::NONE.label(), "0");
/// assert_eq!(FaultCode::new(0b0010_0100).label(), "5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FaultCode(u32);

impl FaultCode {
    /// No fault bits set.
    pub const NONE: Self = Self(0);

    /// Highest bit with a fault label.
    const HIGHEST_DEFINED: u32 = 7;

    /// Wraps a raw fault bitmap.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bitmap.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns the fault number of the highest defined bit, or 0.
    #[must_use]
    pub const fn code(self) -> u32 {
        match highest_bit(self.0) {
            Some(bit) if bit <= Self::HIGHEST_DEFINED => bit,
            _ => 0,
        }
    }

    /// Returns the label exposed on the fault capability.
    #[must_use]
    pub fn label(self) -> String {
        self.code().to_string()
    }

    /// Returns `true` if any defined fault is active.
    #[must_use]
    pub const fn is_fault(self) -> bool {
        self.code() != 0
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Program operating mode bitmap.
///
/// Bit 0 is `schedule`, bit 1 `auto_recovery` and bit 2 `eco`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProgramMode(u32);

impl ProgramMode {
    const LABELS: [&'static str; 3] = ["schedule", "auto_recovery", "eco"];
    const ECO_BIT: u32 = 1 << 2;

    /// Wraps a raw program mode bitmap.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bitmap.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Label of the highest set bit, or `"none"`.
    #[must_use]
    pub fn label(self) -> &'static str {
        highest_bit(self.0)
            .and_then(|bit| Self::LABELS.get(bit as usize).copied())
            .unwrap_or("none")
    }

    /// Returns `true` when the eco bit is set.
    #[must_use]
    pub const fn is_eco(self) -> bool {
        self.0 & Self::ECO_BIT != 0
    }
}

impl fmt::Display for ProgramMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
