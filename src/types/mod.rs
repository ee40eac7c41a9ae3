// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Semantic value types.
//!
//! Each type holds a value already decoded from its wire representation
//! and guarantees its own domain at construction time.
//!
//! # Types
//!
//! - [`Temperature`] - Degrees rounded to one decimal (wire: int16 ×100)
//! - [`SystemMode`] - Heat/cool operating mode
//! - [`SensorMode`] - Firmware sensing strategy, including regulator mode
//! - [`DisplayUnit`] - Celsius or Fahrenheit display
//! - [`FaultCode`] - Fault bitmap reduced to its highest fault number
//! - [`ProgramMode`] - Program operating mode bitmap
//! - [`RegulatorPercentage`] - Regulator output (0-100%)

mod bitmap;
mod mode;
mod percentage;
mod temperature;

pub use bitmap::{FaultCode, ProgramMode, highest_bit};
pub use mode::{DisplayUnit, SensorMode, SystemMode};
pub use percentage::RegulatorPercentage;
pub use temperature::{Temperature, to_centi};
