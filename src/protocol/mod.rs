// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transports and the answer-framing command writer.
//!
//! The protocol is strictly request-then-response and half-duplex: the
//! device never pushes unsolicited data, and answers carry no request id.
//! Exactly one request may be in flight on a channel at a time - callers
//! wanting background I/O must serialize facade calls onto the channel
//! themselves.
//!
//! # Transports
//!
//! - [`HttpRelay`]: tunnels lines through an HTTP serial relay
//!   (feature `http`)
//! - [`BufferEmulator`]: an in-process device backed by the settings
//!   buffer engine, for running without hardware
//! - a real serial port lives with the caller; anything that can write
//!   bytes and read a bounded number of bytes back fits the [`Transport`]
//!   trait

mod emulator;
#[cfg(feature = "http")]
mod http;
mod writer;

pub use emulator::BufferEmulator;
#[cfg(feature = "http")]
pub use http::{HttpRelay, RelayConfig};
pub use writer::{CommandWriter, SendOptions};

use std::time::Duration;

use crate::error::TransportError;

/// Byte-oriented duplex channel to a device.
///
/// Implementations must make `read` return within a bounded time: fewer
/// bytes than requested, or none at all, signal a timeout - they are not
/// errors. `TransportError` is reserved for genuine channel failures
/// (disconnects, I/O errors), after which the channel should be assumed
/// dead.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Writes raw bytes to the device.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on disconnect or write timeout.
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Reads up to `max_len` bytes.
    ///
    /// May return fewer bytes than requested, or an empty buffer on
    /// timeout. Must never block indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on channel failure.
    async fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Closes the channel. Idempotent.
    fn close(&mut self) {}

    /// Returns the channel's current read timeout, if it has one.
    ///
    /// Transports without a native timeout (the emulator answers
    /// immediately) return `None`; the command writer then falls back to
    /// its own idle bound.
    fn read_timeout(&self) -> Option<Duration> {
        None
    }

    /// Sets the channel's read timeout, when supported. Default: no-op.
    fn set_read_timeout(&mut self, _timeout: Option<Duration>) {}
}
