// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The typed device facade.
//!
//! [`Growbox`] wraps a [`CommandWriter`] and exposes one method per wire
//! command, handling encoding, answer-line counts and value decoding.
//! Getters return `Ok(None)` when the writer runs write-only (generating a
//! command file with no device attached); setters succeed silently in that
//! mode.
//!
//! With mirroring enabled, every successful setter is also applied to an
//! internal [`SettingsBuffer`], so a configuration session leaves behind a
//! flushable, persistable snapshot of what was sent.

use std::time::Duration;

use crate::capabilities::Capabilities;
use crate::command::{Answer, CommandLine};
use crate::error::Result;
use crate::protocol::{CommandWriter, SendOptions, Transport};
use crate::types::{
    ActuatorCode, AutoMode, ClockTime, HardPeriod, MINUTE_GRID_BYTES, MinuteGrid, SensorCode,
    SoftPeriod, TimeSource,
};

use crate::buffer::SettingsBuffer;

/// Answer shape of a set command: just the `ok` line.
const SET: usize = 1;
/// Answer shape of a single-value get: one data line plus `ok`.
const GET: usize = 2;
/// Answer shape of a two-value get (clock, cycle state).
const GET2: usize = 3;
/// Answer shape of the 12-byte timer dump.
const TIMER_DUMP: usize = MINUTE_GRID_BYTES + 1;
/// Byte budget for the timer dump; the default would truncate it.
const TIMER_DUMP_BYTES: usize = 123;
/// Scoped read timeout for sensor queries; the measurement takes longer
/// than a settings-register read.
const SENSOR_READ_TIMEOUT: Duration = Duration::from_millis(2200);

/// A growbox unit behind some transport.
///
/// # Examples
///
/// Driving the in-process emulator:
///
/// ```
/// use growbox_lib::protocol::{BufferEmulator, CommandWriter};
/// use growbox_lib::types::ActuatorCode;
/// use growbox_lib::Growbox;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> growbox_lib::Result<()> {
/// let writer = CommandWriter::new(BufferEmulator::new()).with_wait_for_answer(true);
/// let mut growbox = Growbox::new(writer);
///
/// growbox.set_actuator(ActuatorCode::WHITE_LIGHT, 255).await?;
/// let value = growbox.actuator_value(ActuatorCode::WHITE_LIGHT).await?;
/// assert_eq!(value, Some(255));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Growbox<T: Transport> {
    writer: CommandWriter<T>,
    capabilities: Capabilities,
    mirror: Option<SettingsBuffer>,
}

impl<T: Transport> Growbox<T> {
    /// Creates a facade over the given writer with the default
    /// capabilities.
    #[must_use]
    pub fn new(writer: CommandWriter<T>) -> Self {
        Self {
            writer,
            capabilities: Capabilities::default(),
            mirror: None,
        }
    }

    /// Sets the capability description of this unit.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Enables mirroring: every successful setter is also recorded in an
    /// internal settings buffer.
    #[must_use]
    pub fn with_mirroring(mut self) -> Self {
        self.mirror = Some(SettingsBuffer::new());
        self
    }

    /// Returns the capability description of this unit.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns the mirror buffer, when mirroring is enabled.
    #[must_use]
    pub fn mirror(&self) -> Option<&SettingsBuffer> {
        self.mirror.as_ref()
    }

    /// Detaches and returns the mirror buffer, disabling mirroring.
    pub fn take_mirror(&mut self) -> Option<SettingsBuffer> {
        self.mirror.take()
    }

    /// Returns the underlying command writer.
    pub fn writer(&self) -> &CommandWriter<T> {
        &self.writer
    }

    /// Returns the underlying command writer mutably.
    pub fn writer_mut(&mut self) -> &mut CommandWriter<T> {
        &mut self.writer
    }

    /// Closes the underlying transport.
    pub fn close(&mut self) {
        self.writer.close();
    }

    /// Sends one raw line through the writer, keeping the mirror in sync
    /// when the line parses as a configuration command.
    ///
    /// This is the escape hatch for replaying recorded transcripts onto a
    /// device.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn send_line(&mut self, line: &str, opts: SendOptions) -> Result<Option<Answer>> {
        let answer = self.writer.send_and_parse(line, opts).await?;
        if self.mirror.is_some() {
            if let Ok(cmd) = CommandLine::parse(line) {
                let caps = self.capabilities.clone();
                if let Some(mirror) = &mut self.mirror {
                    mirror.apply_command(&cmd, &caps);
                }
            }
        }
        Ok(answer)
    }

    // ------------------------------------------------------------------
    // Actuators and sensors
    // ------------------------------------------------------------------

    /// Sets an actuator to a value (`E0`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_actuator(&mut self, actuator: ActuatorCode, value: i32) -> Result<()> {
        let cmd = CommandLine::new("E0")
            .with_param('A', i32::from(actuator.code()))
            .with_param('V', value);
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_actuator_value(actuator, value));
        Ok(())
    }

    /// Reads an actuator's current value (`E1`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse`
    /// when the answer came back short.
    pub async fn actuator_value(&mut self, actuator: ActuatorCode) -> Result<Option<i32>> {
        let cmd = CommandLine::new("E1").with_param('A', i32::from(actuator.code()));
        self.get_int(&cmd).await
    }

    /// Reads a sensor (`E2`). Returns `Ok(None)` both in write-only mode
    /// and when the firmware reports the reading as undefined (`NAN`).
    ///
    /// Sensors answer slower than the settings registers, so the read runs
    /// under a longer scoped timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse`
    /// when the answer came back short.
    pub async fn sensor_value(&mut self, sensor: SensorCode) -> Result<Option<f64>> {
        let cmd = CommandLine::new("E2").with_param('S', i32::from(sensor.code()));
        let opts = SendOptions::lines(GET).with_timeout(SENSOR_READ_TIMEOUT);
        match self.command(&cmd, opts).await? {
            Some(answer) => Ok(answer.float(0)?),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Automation turn flags
    // ------------------------------------------------------------------

    /// Turns an automation mode on or off for one actuator (`E3`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn turn_auto(&mut self, mode: AutoMode, actuator: ActuatorCode, on: bool) -> Result<()> {
        let cmd = CommandLine::new("E3")
            .with_param('R', i32::from(mode.code()))
            .with_param('A', i32::from(actuator.code()))
            .with_param('B', i32::from(on));
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_auto_on(mode, actuator, on));
        Ok(())
    }

    /// Turns every automation off device-wide (bare `E3`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn turn_off_all_autos(&mut self) -> Result<()> {
        self.set(&CommandLine::new("E3")).await?;
        let caps = self.capabilities.clone();
        if let Some(mirror) = &mut self.mirror {
            mirror.wipe_turn_flags(&caps);
        }
        Ok(())
    }

    /// Reads an automation mode's turn flag (`E4`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse`
    /// when the answer came back short.
    pub async fn auto_turned_on(
        &mut self,
        mode: AutoMode,
        actuator: ActuatorCode,
    ) -> Result<Option<bool>> {
        let cmd = CommandLine::new("E4")
            .with_param('R', i32::from(mode.code()))
            .with_param('A', i32::from(actuator.code()));
        match self.command(&cmd, SendOptions::lines(GET)).await? {
            Some(answer) => Ok(Some(answer.flag(0)?)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Sets the device clock (`E8`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_time(&mut self, time: ClockTime) -> Result<()> {
        let cmd = CommandLine::new("E8")
            .with_param('H', i32::from(time.hours()))
            .with_param('M', i32::from(time.minutes()));
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_time(time));
        Ok(())
    }

    /// Reads the device clock (`E81`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure, `Error::Parse` on a
    /// short answer, and `Error::Value` when the device reports an
    /// impossible time.
    pub async fn time(&mut self) -> Result<Option<ClockTime>> {
        match self.command(&CommandLine::new("E81"), SendOptions::lines(GET2)).await? {
            Some(answer) => {
                let hours = narrow_u8(answer.int(0)?);
                let minutes = narrow_u8(answer.int(1)?);
                Ok(Some(ClockTime::new(hours, minutes)?))
            }
            None => Ok(None),
        }
    }

    /// Sets the time source (`E9`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_time_source(&mut self, source: TimeSource) -> Result<()> {
        let cmd = CommandLine::new("E9").with_param('T', i32::from(source.code()));
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_time_source(source));
        Ok(())
    }

    /// Reads the time source (`E91`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn time_source(&mut self) -> Result<Option<TimeSource>> {
        match self.command(&CommandLine::new("E91"), SendOptions::lines(GET)).await? {
            Some(answer) => Ok(Some(TimeSource::new(narrow_u8(answer.int(0)?)))),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Hard cycle
    // ------------------------------------------------------------------

    /// Sets a hard-cycle period duration in minutes (`E101`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_hard_cycle_duration(
        &mut self,
        actuator: ActuatorCode,
        period: HardPeriod,
        duration: i32,
    ) -> Result<()> {
        let cmd = CommandLine::new("E101")
            .with_param('A', i32::from(actuator.code()))
            .with_param('B', i32::from(period.code()))
            .with_param('D', duration);
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_hard_duration(actuator, period, duration));
        Ok(())
    }

    /// Reads a hard-cycle period duration (`E1011`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn hard_cycle_duration(
        &mut self,
        actuator: ActuatorCode,
        period: HardPeriod,
    ) -> Result<Option<i32>> {
        let cmd = CommandLine::new("E1011")
            .with_param('A', i32::from(actuator.code()))
            .with_param('B', i32::from(period.code()));
        self.get_int(&cmd).await
    }

    /// Reads the hard cycle's current period code and elapsed minutes
    /// (`E102`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn hard_cycle_state(&mut self, actuator: ActuatorCode) -> Result<Option<(i32, i32)>> {
        let cmd = CommandLine::new("E102").with_param('A', i32::from(actuator.code()));
        self.get_int_pair(&cmd).await
    }

    /// Sets a hard-cycle period value (`E103`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_hard_cycle_value(
        &mut self,
        actuator: ActuatorCode,
        period: HardPeriod,
        value: i32,
    ) -> Result<()> {
        let cmd = CommandLine::new("E103")
            .with_param('A', i32::from(actuator.code()))
            .with_param('B', i32::from(period.code()))
            .with_param('V', value);
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_hard_value(actuator, period, value));
        Ok(())
    }

    /// Reads a hard-cycle period value (`E1031`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn hard_cycle_value(
        &mut self,
        actuator: ActuatorCode,
        period: HardPeriod,
    ) -> Result<Option<i32>> {
        let cmd = CommandLine::new("E1031")
            .with_param('A', i32::from(actuator.code()))
            .with_param('B', i32::from(period.code()));
        self.get_int(&cmd).await
    }

    // ------------------------------------------------------------------
    // Soft cycle
    // ------------------------------------------------------------------

    /// Sets a soft-cycle period duration in minutes (`E151`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_soft_cycle_duration(
        &mut self,
        actuator: ActuatorCode,
        period: SoftPeriod,
        duration: i32,
    ) -> Result<()> {
        let cmd = CommandLine::new("E151")
            .with_param('A', i32::from(actuator.code()))
            .with_param('P', i32::from(period.code()))
            .with_param('D', duration);
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_soft_duration(actuator, period, duration));
        Ok(())
    }

    /// Reads a soft-cycle period duration (`E1511`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn soft_cycle_duration(
        &mut self,
        actuator: ActuatorCode,
        period: SoftPeriod,
    ) -> Result<Option<i32>> {
        let cmd = CommandLine::new("E1511")
            .with_param('A', i32::from(actuator.code()))
            .with_param('P', i32::from(period.code()));
        self.get_int(&cmd).await
    }

    /// Reads the soft cycle's current period code and elapsed minutes
    /// (`E152`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn soft_cycle_state(&mut self, actuator: ActuatorCode) -> Result<Option<(i32, i32)>> {
        let cmd = CommandLine::new("E152").with_param('A', i32::from(actuator.code()));
        self.get_int_pair(&cmd).await
    }

    /// Sets a soft-cycle period value (`E153`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_soft_cycle_value(
        &mut self,
        actuator: ActuatorCode,
        period: SoftPeriod,
        value: i32,
    ) -> Result<()> {
        let cmd = CommandLine::new("E153")
            .with_param('A', i32::from(actuator.code()))
            .with_param('P', i32::from(period.code()))
            .with_param('V', value);
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_soft_value(actuator, period, value));
        Ok(())
    }

    /// Reads a soft-cycle period value (`E1531`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn soft_cycle_value(
        &mut self,
        actuator: ActuatorCode,
        period: SoftPeriod,
    ) -> Result<Option<i32>> {
        let cmd = CommandLine::new("E1531")
            .with_param('A', i32::from(actuator.code()))
            .with_param('P', i32::from(period.code()));
        self.get_int(&cmd).await
    }

    // ------------------------------------------------------------------
    // Climate control
    // ------------------------------------------------------------------

    /// Assigns the sensor driving climate control for an actuator (`E201`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_climate_sensor(
        &mut self,
        actuator: ActuatorCode,
        sensor: SensorCode,
    ) -> Result<()> {
        self.set_climate_sensor_raw(actuator, i32::from(sensor.code()))
            .await
    }

    /// `E201` with a raw sensor code; the firmware uses -1 for "none".
    pub(crate) async fn set_climate_sensor_raw(
        &mut self,
        actuator: ActuatorCode,
        sensor: i32,
    ) -> Result<()> {
        let cmd = CommandLine::new("E201")
            .with_param('A', i32::from(actuator.code()))
            .with_param('S', sensor);
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_climate_sensor(actuator, sensor));
        Ok(())
    }

    /// Reads the climate-control sensor code (`E2011`); -1 means none
    /// assigned.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn climate_sensor(&mut self, actuator: ActuatorCode) -> Result<Option<i32>> {
        let cmd = CommandLine::new("E2011").with_param('A', i32::from(actuator.code()));
        self.get_int(&cmd).await
    }

    /// Sets the climate-control lower bound (`E202`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_climate_min(&mut self, actuator: ActuatorCode, min: i32) -> Result<()> {
        let cmd = CommandLine::new("E202")
            .with_param('A', i32::from(actuator.code()))
            .with_param('V', min);
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_climate_min(actuator, min));
        Ok(())
    }

    /// Reads the climate-control lower bound (`E2021`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn climate_min(&mut self, actuator: ActuatorCode) -> Result<Option<i32>> {
        let cmd = CommandLine::new("E2021").with_param('A', i32::from(actuator.code()));
        self.get_int(&cmd).await
    }

    /// Sets the climate-control upper bound (`E203`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_climate_max(&mut self, actuator: ActuatorCode, max: i32) -> Result<()> {
        let cmd = CommandLine::new("E203")
            .with_param('A', i32::from(actuator.code()))
            .with_param('V', max);
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_climate_max(actuator, max));
        Ok(())
    }

    /// Reads the climate-control upper bound (`E2031`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn climate_max(&mut self, actuator: ActuatorCode) -> Result<Option<i32>> {
        let cmd = CommandLine::new("E2031").with_param('A', i32::from(actuator.code()));
        self.get_int(&cmd).await
    }

    // ------------------------------------------------------------------
    // Timer
    // ------------------------------------------------------------------

    /// Sets one byte of the packed timer schedule (`E251`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_timer_byte(
        &mut self,
        actuator: ActuatorCode,
        index: usize,
        value: u8,
    ) -> Result<()> {
        let cmd = CommandLine::new("E251")
            .with_param('A', i32::from(actuator.code()))
            .with_param('B', index_param(index))
            .with_param('V', i32::from(value));
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_timer_byte(actuator, index, value));
        Ok(())
    }

    /// Reads the full 12-byte timer schedule (`E2511`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse`
    /// when fewer than 12 bytes came back.
    pub async fn minute_grid(&mut self, actuator: ActuatorCode) -> Result<Option<MinuteGrid>> {
        let cmd = CommandLine::new("E2511").with_param('A', i32::from(actuator.code()));
        let opts = SendOptions::lines(TIMER_DUMP).with_max_bytes(TIMER_DUMP_BYTES);
        match self.command(&cmd, opts).await? {
            Some(answer) => {
                let mut bytes = [0u8; MINUTE_GRID_BYTES];
                for (index, byte) in bytes.iter_mut().enumerate() {
                    *byte = narrow_u8(answer.int(index)?);
                }
                Ok(Some(MinuteGrid::from_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    /// Sets one quarter-hour flag, or (with `quarter` `None`) all four
    /// flags of an hour (`E252`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure.
    pub async fn set_minute_flag(
        &mut self,
        actuator: ActuatorCode,
        hour: u8,
        quarter: Option<u8>,
        on: bool,
    ) -> Result<()> {
        let mut cmd = CommandLine::new("E252")
            .with_param('A', i32::from(actuator.code()))
            .with_param('H', i32::from(hour));
        if let Some(quarter) = quarter {
            cmd.set_param('M', i32::from(quarter));
        }
        cmd.set_param('B', i32::from(on));
        self.set(&cmd).await?;
        self.mirror_set(|m| m.set_minute_flag(actuator, hour, quarter, on));
        Ok(())
    }

    /// Reads one quarter-hour flag (`E2521`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer.
    pub async fn minute_flag(
        &mut self,
        actuator: ActuatorCode,
        hour: u8,
        quarter: u8,
    ) -> Result<Option<bool>> {
        let cmd = CommandLine::new("E2521")
            .with_param('A', i32::from(actuator.code()))
            .with_param('H', i32::from(hour))
            .with_param('M', i32::from(quarter));
        match self.command(&cmd, SendOptions::lines(GET)).await? {
            Some(answer) => Ok(Some(answer.flag(0)?)),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Bulk settings transfer
    // ------------------------------------------------------------------

    /// Reads the device's full configuration into a fresh settings buffer.
    ///
    /// Iterates the whole capability space with get commands; pair it with
    /// [`SettingsBuffer::flush`] to clone one unit's configuration onto
    /// another. On a write-only writer nothing can be read and the returned
    /// buffer stays at its defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` on channel failure and `Error::Parse` on
    /// a short answer mid-scan.
    pub async fn pull_settings(&mut self) -> Result<SettingsBuffer> {
        let caps = self.capabilities.clone();
        let mut buffer = SettingsBuffer::new();

        if let Some(source) = self.time_source().await? {
            buffer.set_time_source(source);
        }
        if let Some(time) = self.time().await? {
            buffer.set_time(time);
        }

        for &actuator in caps.actuators() {
            if let Some(value) = self.actuator_value(actuator).await? {
                buffer.set_actuator_value(actuator, value);
            }
            for &mode in caps.modes() {
                if let Some(on) = self.auto_turned_on(mode, actuator).await? {
                    buffer.set_auto_on(mode, actuator, on);
                }
                self.pull_mode_params(&mut buffer, mode, actuator).await?;
            }
        }

        Ok(buffer)
    }

    async fn pull_mode_params(
        &mut self,
        buffer: &mut SettingsBuffer,
        mode: AutoMode,
        actuator: ActuatorCode,
    ) -> Result<()> {
        match mode {
            AutoMode::CycleHard => {
                for period in HardPeriod::ALL {
                    if let Some(d) = self.hard_cycle_duration(actuator, period).await? {
                        buffer.set_hard_duration(actuator, period, d);
                    }
                    if let Some(v) = self.hard_cycle_value(actuator, period).await? {
                        buffer.set_hard_value(actuator, period, v);
                    }
                }
            }
            AutoMode::CycleSoft => {
                for period in SoftPeriod::ALL {
                    if let Some(d) = self.soft_cycle_duration(actuator, period).await? {
                        buffer.set_soft_duration(actuator, period, d);
                    }
                    if period.code() % 2 == 1 {
                        if let Some(v) = self.soft_cycle_value(actuator, period).await? {
                            buffer.set_soft_value(actuator, period, v);
                        }
                    }
                }
            }
            AutoMode::ClimateControl => {
                if let Some(min) = self.climate_min(actuator).await? {
                    buffer.set_climate_min(actuator, min);
                }
                if let Some(max) = self.climate_max(actuator).await? {
                    buffer.set_climate_max(actuator, max);
                }
                if let Some(sensor) = self.climate_sensor(actuator).await? {
                    buffer.set_climate_sensor(actuator, sensor);
                }
            }
            AutoMode::Timer => {
                if let Some(grid) = self.minute_grid(actuator).await? {
                    buffer.set_minute_grid(actuator, grid);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    async fn command(&mut self, cmd: &CommandLine, opts: SendOptions) -> Result<Option<Answer>> {
        self.writer.send_and_parse(&cmd.to_string(), opts).await
    }

    async fn set(&mut self, cmd: &CommandLine) -> Result<()> {
        self.command(cmd, SendOptions::lines(SET)).await?;
        Ok(())
    }

    async fn get_int(&mut self, cmd: &CommandLine) -> Result<Option<i32>> {
        match self.command(cmd, SendOptions::lines(GET)).await? {
            Some(answer) => Ok(Some(narrow_i32(answer.int(0)?))),
            None => Ok(None),
        }
    }

    async fn get_int_pair(&mut self, cmd: &CommandLine) -> Result<Option<(i32, i32)>> {
        match self.command(cmd, SendOptions::lines(GET2)).await? {
            Some(answer) => Ok(Some((narrow_i32(answer.int(0)?), narrow_i32(answer.int(1)?)))),
            None => Ok(None),
        }
    }

    fn mirror_set(&mut self, apply: impl FnOnce(&mut SettingsBuffer)) {
        if let Some(mirror) = &mut self.mirror {
            apply(mirror);
        }
    }
}

// Device values are one protocol field wide; clamp instead of wrapping so a
// corrupt answer cannot alias a valid value.
#[allow(clippy::cast_possible_truncation)]
fn narrow_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn narrow_u8(value: i64) -> u8 {
    value.clamp(0, i64::from(u8::MAX)) as u8
}

fn index_param(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::error::TransportError;

    /// Records every written line; never answers.
    #[derive(Debug, Default)]
    struct Recording {
        lines: Vec<String>,
    }

    impl Transport for Recording {
        async fn write(&mut self, data: &[u8]) -> std::result::Result<(), TransportError> {
            self.lines.push(String::from_utf8_lossy(data).into_owned());
            Ok(())
        }

        async fn read(&mut self, _max_len: usize) -> std::result::Result<Vec<u8>, TransportError> {
            Ok(Vec::new())
        }
    }

    /// Replays one canned answer and records read-timeout overrides.
    #[derive(Debug, Default)]
    struct TimedAnswer {
        to_read: VecDeque<u8>,
        timeout: Option<Duration>,
        overrides: Vec<Option<Duration>>,
    }

    impl TimedAnswer {
        fn with_answer(answer: &[u8]) -> Self {
            Self {
                to_read: answer.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Transport for TimedAnswer {
        async fn write(&mut self, _data: &[u8]) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn read(&mut self, max_len: usize) -> std::result::Result<Vec<u8>, TransportError> {
            let take = self.to_read.len().min(max_len);
            Ok(self.to_read.drain(..take).collect())
        }

        fn read_timeout(&self) -> Option<Duration> {
            self.timeout
        }

        fn set_read_timeout(&mut self, timeout: Option<Duration>) {
            self.overrides.push(timeout);
            self.timeout = timeout;
        }
    }

    fn write_only() -> Growbox<Recording> {
        Growbox::new(CommandWriter::new(Recording::default()))
    }

    fn lines(growbox: &Growbox<Recording>) -> &[String] {
        &growbox.writer().transport().lines
    }

    #[tokio::test]
    async fn set_commands_encode() {
        let mut g = write_only();
        g.set_actuator(ActuatorCode::WHITE_LIGHT, 255).await.unwrap();
        g.turn_auto(AutoMode::Timer, ActuatorCode::EXTRACTOR, true)
            .await
            .unwrap();
        g.set_time(ClockTime::new(7, 30).unwrap()).await.unwrap();
        g.set_time_source(TimeSource::new(1)).await.unwrap();
        g.set_hard_cycle_duration(ActuatorCode::HUMIDIFIER, HardPeriod::Day, 600)
            .await
            .unwrap();
        g.set_soft_cycle_value(ActuatorCode::WHITE_LIGHT, SoftPeriod::Night, 0)
            .await
            .unwrap();
        g.set_climate_min(ActuatorCode::HUMIDIFIER, 40).await.unwrap();
        g.set_climate_sensor(ActuatorCode::HUMIDIFIER, SensorCode::HUMIDITY)
            .await
            .unwrap();
        g.set_timer_byte(ActuatorCode::EXTRACTOR, 11, 128).await.unwrap();

        assert_eq!(
            lines(&g),
            &[
                "E0 A2 V255\n",
                "E3 R3 A1 B1\n",
                "E8 H7 M30\n",
                "E9 T1\n",
                "E101 A0 B1 D600\n",
                "E153 A2 P3 V0\n",
                "E202 A0 V40\n",
                "E201 A0 S1\n",
                "E251 A1 B11 V128\n",
            ]
        );
    }

    #[tokio::test]
    async fn get_commands_encode_and_return_none_when_write_only() {
        let mut g = write_only();
        assert_eq!(g.actuator_value(ActuatorCode::HUMIDIFIER).await.unwrap(), None);
        assert_eq!(g.sensor_value(SensorCode::TEMPERATURE).await.unwrap(), None);
        assert_eq!(g.time().await.unwrap(), None);
        assert_eq!(g.minute_grid(ActuatorCode::EXTRACTOR).await.unwrap(), None);
        assert_eq!(
            g.hard_cycle_state(ActuatorCode::HUMIDIFIER).await.unwrap(),
            None
        );

        assert_eq!(
            lines(&g),
            &["E1 A0\n", "E2 S0\n", "E81\n", "E2511 A1\n", "E102 A0\n"]
        );
    }

    #[tokio::test]
    async fn sensor_nan_answer_reads_as_none() {
        let writer = CommandWriter::new(Recording::default()).with_wait_for_answer(true);
        let mut g = Growbox::new(writer);

        g.writer_mut().mock_answer(b"S:NAN\r\nok\r\n".as_slice());
        assert_eq!(g.sensor_value(SensorCode::TEMPERATURE).await.unwrap(), None);

        g.writer_mut().mock_answer(b"S:21.50\r\nok\r\n".as_slice());
        assert_eq!(
            g.sensor_value(SensorCode::TEMPERATURE).await.unwrap(),
            Some(21.5)
        );
    }

    #[tokio::test]
    async fn sensor_read_extends_the_timeout() {
        let transport = TimedAnswer::with_answer(b"S:NAN\r\nok\r\n");
        let writer = CommandWriter::new(transport).with_wait_for_answer(true);
        let mut g = Growbox::new(writer);

        assert_eq!(g.sensor_value(SensorCode::HUMIDITY).await.unwrap(), None);
        // Applied for the exchange, then restored.
        assert_eq!(
            g.writer().transport().overrides,
            vec![Some(SENSOR_READ_TIMEOUT), None]
        );
    }

    #[tokio::test]
    async fn bare_e3_has_no_params() {
        let mut g = write_only();
        g.turn_off_all_autos().await.unwrap();
        assert_eq!(lines(&g), &["E3\n"]);
    }

    #[tokio::test]
    async fn minute_flag_hour_form_omits_quarter() {
        let mut g = write_only();
        g.set_minute_flag(ActuatorCode::EXTRACTOR, 7, None, true)
            .await
            .unwrap();
        g.set_minute_flag(ActuatorCode::EXTRACTOR, 7, Some(2), false)
            .await
            .unwrap();
        assert_eq!(lines(&g), &["E252 A1 H7 B1\n", "E252 A1 H7 M2 B0\n"]);
    }

    #[tokio::test]
    async fn mirror_records_setters() {
        let mut g = write_only().with_mirroring();
        g.set_actuator(ActuatorCode::WHITE_LIGHT, 200).await.unwrap();
        g.turn_auto(AutoMode::CycleHard, ActuatorCode::WHITE_LIGHT, true)
            .await
            .unwrap();
        g.set_minute_flag(ActuatorCode::WHITE_LIGHT, 6, Some(1), true)
            .await
            .unwrap();

        let mirror = g.mirror().unwrap();
        assert_eq!(mirror.actuator_value(ActuatorCode::WHITE_LIGHT), 200);
        assert!(mirror.is_auto_on(AutoMode::CycleHard, ActuatorCode::WHITE_LIGHT));
        assert!(mirror.minute_grid(ActuatorCode::WHITE_LIGHT).get(6, 1).unwrap());
    }

    #[tokio::test]
    async fn mirror_tracks_raw_lines() {
        let mut g = write_only().with_mirroring();
        g.send_line("E0 A1 V33", SendOptions::default()).await.unwrap();
        assert_eq!(
            g.mirror().unwrap().actuator_value(ActuatorCode::EXTRACTOR),
            33
        );
    }

    #[tokio::test]
    async fn take_mirror_detaches() {
        let mut g = write_only().with_mirroring();
        g.set_actuator(ActuatorCode::HUMIDIFIER, 1).await.unwrap();
        let mirror = g.take_mirror().unwrap();
        assert_eq!(mirror.actuator_value(ActuatorCode::HUMIDIFIER), 1);
        assert!(g.mirror().is_none());
    }
}
