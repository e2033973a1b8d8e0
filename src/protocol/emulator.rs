// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An in-process device emulator.
//!
//! [`BufferEmulator`] implements [`Transport`](super::Transport) without any
//! I/O: configuration commands written to it mutate a shared
//! [`SettingsBuffer`], and get commands are answered from the same buffer in
//! the device's wire format (two-decimal `"<tag>:<value>"` CRLF lines plus
//! an `ok` terminator, one `ok` per write).
//!
//! The buffer is behind an `Arc<Mutex<_>>` so a test or a disconnected GUI
//! session can hand the same state to several emulators, or inspect it
//! after a run.
//!
//! Fidelity quirks kept from the hardware: an actuator that was never set
//! reads back as 255, an unassigned climate sensor as -1, sensors always
//! read `NAN`, and the cycle state queries (`E102`/`E152`) report period
//! and elapsed time as zero since nothing is actually running.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::SettingsBuffer;
use crate::capabilities::Capabilities;
use crate::command::CommandLine;
use crate::error::TransportError;
use crate::protocol::Transport;
use crate::types::{ActuatorCode, AutoMode, MINUTE_GRID_BYTES};

/// Value reported for an actuator that was never set.
const UNSET_ACTUATOR: i32 = 255;
/// Sensor code reported when climate control has no sensor assigned.
const NO_SENSOR: i32 = -1;

/// Transport that emulates a growbox from a settings buffer.
///
/// # Examples
///
/// ```
/// use growbox_lib::protocol::{BufferEmulator, CommandWriter, SendOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> growbox_lib::Result<()> {
/// let mut writer = CommandWriter::new(BufferEmulator::new()).with_wait_for_answer(true);
/// writer.send("E0 A2 V255", SendOptions::default()).await?;
/// let answer = writer.send_and_parse("E1 A2", SendOptions::lines(2)).await?;
/// assert_eq!(answer.unwrap().int(0)?, 255);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BufferEmulator {
    buffer: Arc<Mutex<SettingsBuffer>>,
    capabilities: Capabilities,
    pending: VecDeque<u8>,
}

impl BufferEmulator {
    /// Creates an emulator over a fresh empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer(Arc::new(Mutex::new(SettingsBuffer::new())))
    }

    /// Creates an emulator over an existing shared buffer.
    #[must_use]
    pub fn with_buffer(buffer: Arc<Mutex<SettingsBuffer>>) -> Self {
        Self {
            buffer,
            capabilities: Capabilities::default(),
            pending: VecDeque::new(),
        }
    }

    /// Sets the emulated unit's capabilities (bounds the bare-`E3` wipe).
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Returns a handle to the backing buffer.
    #[must_use]
    pub fn buffer(&self) -> Arc<Mutex<SettingsBuffer>> {
        Arc::clone(&self.buffer)
    }

    fn respond(&self, cmd: &CommandLine, buffer: &SettingsBuffer, out: &mut Vec<String>) {
        match cmd.name() {
            "E1" => {
                if let Some(a) = actuator(cmd) {
                    let value = buffer.stored_actuator_value(a).unwrap_or(UNSET_ACTUATOR);
                    out.push(data_line('V', f64::from(value)));
                }
            }
            // No physical sensors behind the emulator.
            "E2" => out.push("S:NAN".to_string()),
            "E4" => {
                let mode = cmd
                    .param('R')
                    .and_then(|r| u8::try_from(r).ok())
                    .and_then(|r| AutoMode::from_code(r).ok());
                if let (Some(mode), Some(a)) = (mode, actuator(cmd)) {
                    let on = buffer.is_auto_on(mode, a);
                    out.push(data_line('B', f64::from(u8::from(on))));
                }
            }
            "E81" => {
                let (hours, minutes) = buffer
                    .time()
                    .map_or((0, 0), |t| (t.hours(), t.minutes()));
                out.push(data_line('H', f64::from(hours)));
                out.push(data_line('M', f64::from(minutes)));
            }
            "E91" => {
                let source = buffer.time_source().map_or(0, |s| s.code());
                out.push(data_line('T', f64::from(source)));
            }
            // Nothing is running, so the current period and its elapsed
            // time are always zero.
            "E102" | "E152" => {
                out.push(data_line('B', 0.0));
                out.push(data_line('D', 0.0));
            }
            "E1011" | "E1031" => {
                let period = cmd
                    .param('B')
                    .and_then(|b| u8::try_from(b).ok())
                    .and_then(|b| crate::types::HardPeriod::from_code(b).ok());
                if let (Some(a), Some(p)) = (actuator(cmd), period) {
                    if cmd.name() == "E1011" {
                        out.push(data_line('D', f64::from(buffer.hard_duration(a, p))));
                    } else {
                        out.push(data_line('V', f64::from(buffer.hard_value(a, p))));
                    }
                }
            }
            "E1511" | "E1531" => {
                let period = cmd
                    .param('P')
                    .and_then(|p| u8::try_from(p).ok())
                    .and_then(|p| crate::types::SoftPeriod::from_code(p).ok());
                if let (Some(a), Some(p)) = (actuator(cmd), period) {
                    if cmd.name() == "E1511" {
                        out.push(data_line('D', f64::from(buffer.soft_duration(a, p))));
                    } else {
                        out.push(data_line('V', f64::from(buffer.soft_value(a, p))));
                    }
                }
            }
            "E2011" => {
                if let Some(a) = actuator(cmd) {
                    let sensor = buffer.climate_sensor(a).unwrap_or(NO_SENSOR);
                    out.push(data_line('S', f64::from(sensor)));
                }
            }
            "E2021" => {
                if let Some(a) = actuator(cmd) {
                    out.push(data_line('V', f64::from(buffer.climate_min(a))));
                }
            }
            "E2031" => {
                if let Some(a) = actuator(cmd) {
                    out.push(data_line('V', f64::from(buffer.climate_max(a))));
                }
            }
            "E2511" => {
                if let Some(a) = actuator(cmd) {
                    for index in 0..MINUTE_GRID_BYTES {
                        out.push(data_line('V', f64::from(buffer.timer_byte(a, index))));
                    }
                }
            }
            "E2521" => {
                let hour = cmd.param('H').and_then(|h| u8::try_from(h).ok());
                let quarter = cmd.param('M').and_then(|m| u8::try_from(m).ok());
                if let (Some(a), Some(hour), Some(quarter)) = (actuator(cmd), hour, quarter) {
                    let on = buffer.minute_grid(a).get(hour, quarter).unwrap_or(false);
                    out.push(data_line('B', f64::from(u8::from(on))));
                }
            }
            // Set commands and anything unknown answer with a bare `ok`.
            _ => {}
        }
    }
}

impl Default for BufferEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for BufferEmulator {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(data);
        let mut lines = Vec::new();

        match CommandLine::parse(text.trim()) {
            Ok(cmd) if !cmd.is_empty() => {
                let mut buffer = self.buffer.lock();
                buffer.apply_command(&cmd, &self.capabilities);
                self.respond(&cmd, &buffer, &mut lines);
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "emulator received a malformed line"),
        }

        for line in lines {
            self.pending.extend(line.as_bytes());
            self.pending.extend(b"\r\n");
        }
        self.pending.extend(b"ok\r\n");
        Ok(())
    }

    async fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let take = self.pending.len().min(max_len);
        Ok(self.pending.drain(..take).collect())
    }
}

fn actuator(cmd: &CommandLine) -> Option<ActuatorCode> {
    cmd.param('A')
        .and_then(|a| u8::try_from(a).ok())
        .map(ActuatorCode::new)
}

fn data_line(tag: char, value: f64) -> String {
    format!("{tag}:{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exchange(emulator: &mut BufferEmulator, line: &str) -> String {
        emulator.write(format!("{line}\n").as_bytes()).await.unwrap();
        let raw = emulator.read(usize::MAX).await.unwrap();
        String::from_utf8(raw).unwrap()
    }

    #[tokio::test]
    async fn set_answers_bare_ok() {
        let mut emulator = BufferEmulator::new();
        assert_eq!(exchange(&mut emulator, "E0 A2 V255").await, "ok\r\n");
    }

    #[tokio::test]
    async fn get_reflects_earlier_set() {
        let mut emulator = BufferEmulator::new();
        exchange(&mut emulator, "E0 A2 V255").await;
        assert_eq!(exchange(&mut emulator, "E1 A2").await, "V:255.00\r\nok\r\n");
    }

    #[tokio::test]
    async fn unset_actuator_reads_255() {
        let mut emulator = BufferEmulator::new();
        assert_eq!(exchange(&mut emulator, "E1 A0").await, "V:255.00\r\nok\r\n");
    }

    #[tokio::test]
    async fn sensors_read_nan() {
        let mut emulator = BufferEmulator::new();
        assert_eq!(exchange(&mut emulator, "E2 S0").await, "S:NAN\r\nok\r\n");
    }

    #[tokio::test]
    async fn clock_defaults_to_midnight() {
        let mut emulator = BufferEmulator::new();
        assert_eq!(
            exchange(&mut emulator, "E81").await,
            "H:0.00\r\nM:0.00\r\nok\r\n"
        );
        exchange(&mut emulator, "E8 H7 M30").await;
        assert_eq!(
            exchange(&mut emulator, "E81").await,
            "H:7.00\r\nM:30.00\r\nok\r\n"
        );
    }

    #[tokio::test]
    async fn unassigned_climate_sensor_reads_minus_one() {
        let mut emulator = BufferEmulator::new();
        assert_eq!(exchange(&mut emulator, "E2011 A0").await, "S:-1.00\r\nok\r\n");
        exchange(&mut emulator, "E201 A0 S1").await;
        assert_eq!(exchange(&mut emulator, "E2011 A0").await, "S:1.00\r\nok\r\n");
    }

    #[tokio::test]
    async fn cycle_state_is_always_zero() {
        let mut emulator = BufferEmulator::new();
        assert_eq!(
            exchange(&mut emulator, "E102 A0").await,
            "B:0.00\r\nD:0.00\r\nok\r\n"
        );
        assert_eq!(
            exchange(&mut emulator, "E152 A0").await,
            "B:0.00\r\nD:0.00\r\nok\r\n"
        );
    }

    #[tokio::test]
    async fn timer_dump_has_twelve_lines() {
        let mut emulator = BufferEmulator::new();
        exchange(&mut emulator, "E251 A1 B3 V7").await;
        let answer = exchange(&mut emulator, "E2511 A1").await;
        let lines: Vec<&str> = answer.trim().split("\r\n").collect();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[3], "V:7.00");
        assert_eq!(lines[12], "ok");
    }

    #[tokio::test]
    async fn minute_flag_round_trip() {
        let mut emulator = BufferEmulator::new();
        exchange(&mut emulator, "E252 A1 H6 M2 B1").await;
        assert_eq!(
            exchange(&mut emulator, "E2521 A1 H6 M2").await,
            "B:1.00\r\nok\r\n"
        );
        assert_eq!(
            exchange(&mut emulator, "E2521 A1 H6 M3").await,
            "B:0.00\r\nok\r\n"
        );
    }

    #[tokio::test]
    async fn turn_flag_round_trip() {
        let mut emulator = BufferEmulator::new();
        exchange(&mut emulator, "E3 R2 A0 B1").await;
        assert_eq!(
            exchange(&mut emulator, "E4 R2 A0").await,
            "B:1.00\r\nok\r\n"
        );
        exchange(&mut emulator, "E3").await;
        assert_eq!(
            exchange(&mut emulator, "E4 R2 A0").await,
            "B:0.00\r\nok\r\n"
        );
    }

    #[tokio::test]
    async fn malformed_line_still_answers_ok() {
        let mut emulator = BufferEmulator::new();
        assert_eq!(exchange(&mut emulator, "garbage").await, "ok\r\n");
    }

    #[tokio::test]
    async fn shared_buffer_is_visible_outside() {
        let emulator = BufferEmulator::new();
        let buffer = emulator.buffer();
        let mut emulator = emulator;
        exchange(&mut emulator, "E0 A0 V42").await;
        assert_eq!(
            buffer.lock().actuator_value(ActuatorCode::HUMIDIFIER),
            42
        );
    }
}
