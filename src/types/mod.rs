// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Domain types for growbox control.
//!
//! # Types
//!
//! - [`ActuatorCode`] / [`SensorCode`] - wire addresses of outputs and inputs
//! - [`AutoMode`] - the four fixed automation strategies
//! - [`HardPeriod`] / [`SoftPeriod`] - phases within the cycle automations
//! - [`ClockTime`] / [`TimeSource`] - the device clock
//! - [`MinuteGrid`] - the timer automation's packed quarter-hour schedule

mod auto_mode;
mod clock_time;
mod codes;
mod minute_grid;

pub use auto_mode::{AutoMode, HardPeriod, SoftPeriod};
pub use clock_time::ClockTime;
pub use codes::{ActuatorCode, SensorCode, TimeSource};
pub use minute_grid::{MINUTE_GRID_BYTES, MinuteGrid, QUARTERS_PER_HOUR};
