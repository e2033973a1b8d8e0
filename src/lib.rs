// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Growbox Lib - a Rust library to control growbox plant chambers.
//!
//! The growbox firmware speaks a G-code-like line protocol: one command per
//! line (`E0 A2 V255`), answers as `"<tag>:<value>"` lines closed by a
//! literal `ok`. This library provides the codec for that protocol, a typed
//! async facade over it, and a settings-buffer engine that mirrors, replays
//! and flushes whole device configurations.
//!
//! # Supported Features
//!
//! - **Direct control**: set actuator values, read sensors, set the clock
//! - **Automations**: hard and soft day/night cycles, climate control,
//!   quarter-hour timer schedules, per actuator
//! - **Settings buffer**: record configurations offline, persist them as
//!   JSON, replay transcripts, flush onto a device in a safe order
//! - **Transports**: an HTTP serial relay (feature `http`) and an
//!   in-process emulator; any byte channel can implement
//!   [`protocol::Transport`]
//!
//! # Quick Start
//!
//! ## Driving a device through an HTTP serial relay
//!
//! ```no_run
//! use growbox_lib::protocol::{CommandWriter, RelayConfig};
//! use growbox_lib::types::{ActuatorCode, SensorCode};
//! use growbox_lib::Growbox;
//!
//! #[tokio::main]
//! async fn main() -> growbox_lib::Result<()> {
//!     let relay = RelayConfig::new("192.168.1.100").into_relay()?;
//!     let writer = CommandWriter::new(relay).with_wait_for_answer(true);
//!     let mut growbox = Growbox::new(writer);
//!
//!     growbox.set_actuator(ActuatorCode::WHITE_LIGHT, 255).await?;
//!     let temperature = growbox.sensor_value(SensorCode::TEMPERATURE).await?;
//!     println!("temperature: {temperature:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Working offline against the emulator
//!
//! ```
//! use growbox_lib::protocol::{BufferEmulator, CommandWriter};
//! use growbox_lib::types::{ActuatorCode, AutoMode};
//! use growbox_lib::Growbox;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> growbox_lib::Result<()> {
//!     let writer = CommandWriter::new(BufferEmulator::new()).with_wait_for_answer(true);
//!     let mut growbox = Growbox::new(writer);
//!
//!     growbox.set_actuator(ActuatorCode::WHITE_LIGHT, 200).await?;
//!     growbox.turn_auto(AutoMode::Timer, ActuatorCode::WHITE_LIGHT, true).await?;
//!
//!     assert_eq!(growbox.actuator_value(ActuatorCode::WHITE_LIGHT).await?, Some(200));
//!     Ok(())
//! }
//! ```
//!
//! ## Recording a configuration and flushing it later
//!
//! ```
//! use growbox_lib::protocol::{BufferEmulator, CommandWriter};
//! use growbox_lib::types::ActuatorCode;
//! use growbox_lib::{Capabilities, Growbox, SettingsBuffer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> growbox_lib::Result<()> {
//!     // Build a configuration with no device attached.
//!     let mut buffer = SettingsBuffer::new();
//!     buffer.set_actuator_value(ActuatorCode::WHITE_LIGHT, 255);
//!     let json = buffer.to_json()?;
//!
//!     // Later: load it and flush onto a (here: emulated) device.
//!     let buffer = SettingsBuffer::from_json(&json)?;
//!     let writer = CommandWriter::new(BufferEmulator::new()).with_wait_for_answer(true);
//!     let mut growbox = Growbox::new(writer);
//!     buffer.flush(&mut growbox).await?;
//!
//!     assert_eq!(growbox.actuator_value(ActuatorCode::WHITE_LIGHT).await?, Some(255));
//!     Ok(())
//! }
//! ```

mod buffer;
mod capabilities;
pub mod command;
mod device;
pub mod error;
pub mod protocol;
pub mod types;

pub use buffer::SettingsBuffer;
pub use capabilities::Capabilities;
pub use device::Growbox;
pub use error::{Error, ParseError, Result, TransportError, ValueError};
