// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The settings buffer engine.
//!
//! [`SettingsBuffer`] is a tree mirroring the device configuration:
//! actuator values, per-mode per-actuator automation settings, the time
//! source, and a flag controlling whether playback starts by turning every
//! automation off. It is built three ways - by replaying observed command
//! lines, by direct facade calls with mirroring enabled, or by explicit
//! setters - and flushed back out as the minimal command sequence that
//! reproduces it on a device.
//!
//! When operating disconnected the buffer is the single owner of
//! configuration state; when connected, the hardware is authoritative and
//! the buffer is a cache that must be resynchronized explicitly.
//!
//! Missing keys are never errors: every accessor is total and returns the
//! documented default (values and cycle parameters 0, turn flags false,
//! `turn_off_all_autos` true).
//!
//! # Persisted format
//!
//! The tree serializes to JSON with decimal-string keys: root keys
//! `"actuators"`, the mode codes `"0"`..`"3"`, `"time"` and
//! `"turn_off_all_autos"`; below them actuator, period and timer-byte
//! indices, again as strings. Files written by older revisions stored some
//! numbers as strings and flags as 0/1; deserialization accepts those and
//! normalizes on the next save.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;
use crate::command::CommandLine;
use crate::device::Growbox;
use crate::error::{ParseError, Result};
use crate::protocol::Transport;
use crate::types::{
    ActuatorCode, AutoMode, ClockTime, HardPeriod, MINUTE_GRID_BYTES, MinuteGrid, SoftPeriod,
    TimeSource,
};

// ============================================================================
// Leaf records
// ============================================================================

/// Per-actuator base settings (`"actuators"` subtree).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ActuatorSettings {
    #[serde(default, deserialize_with = "de_flex_i32")]
    value: i32,
}

/// One period of a cycle automation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PeriodSettings {
    #[serde(default, deserialize_with = "de_flex_i32")]
    duration: i32,
    #[serde(default, deserialize_with = "de_flex_i32")]
    value: i32,
}

/// Cycle automation settings for one actuator: the turn flag plus a map of
/// period-code keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CycleSettings {
    #[serde(default, deserialize_with = "de_flex_bool")]
    turn: bool,
    #[serde(flatten)]
    periods: BTreeMap<String, PeriodSettings>,
}

/// Climate-control settings for one actuator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ClimateSettings {
    #[serde(default, deserialize_with = "de_flex_bool")]
    turn: bool,
    #[serde(default, deserialize_with = "de_flex_i32")]
    min: i32,
    #[serde(default, deserialize_with = "de_flex_i32")]
    max: i32,
    #[serde(
        default,
        deserialize_with = "de_flex_opt_i32",
        skip_serializing_if = "Option::is_none"
    )]
    sensor: Option<i32>,
}

/// Timer settings for one actuator: the turn flag plus byte-index keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TimerSettings {
    #[serde(default, deserialize_with = "de_flex_bool")]
    turn: bool,
    #[serde(flatten)]
    bytes: BTreeMap<String, FlexByte>,
}

/// Device clock settings (`"time"` subtree).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TimeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<(u8, u8)>,
    #[serde(
        default,
        deserialize_with = "de_flex_opt_i32",
        skip_serializing_if = "Option::is_none"
    )]
    source: Option<i32>,
}

impl TimeSettings {
    fn is_empty(&self) -> bool {
        self.time.is_none() && self.source.is_none()
    }
}

// ============================================================================
// SettingsBuffer
// ============================================================================

/// In-memory mirror of a growbox configuration.
///
/// # Examples
///
/// ```
/// use growbox_lib::SettingsBuffer;
/// use growbox_lib::Capabilities;
/// use growbox_lib::command::CommandLine;
/// use growbox_lib::types::ActuatorCode;
///
/// let caps = Capabilities::default();
/// let mut buffer = SettingsBuffer::new();
/// let cmd = CommandLine::parse("E0 A2 V255").unwrap();
/// buffer.apply_command(&cmd, &caps);
/// assert_eq!(buffer.actuator_value(ActuatorCode::WHITE_LIGHT), 255);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsBuffer {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    actuators: BTreeMap<String, ActuatorSettings>,
    #[serde(rename = "0", default, skip_serializing_if = "BTreeMap::is_empty")]
    cycle_hard: BTreeMap<String, CycleSettings>,
    #[serde(rename = "1", default, skip_serializing_if = "BTreeMap::is_empty")]
    cycle_soft: BTreeMap<String, CycleSettings>,
    #[serde(rename = "2", default, skip_serializing_if = "BTreeMap::is_empty")]
    climate_control: BTreeMap<String, ClimateSettings>,
    #[serde(rename = "3", default, skip_serializing_if = "BTreeMap::is_empty")]
    timer: BTreeMap<String, TimerSettings>,
    #[serde(default, skip_serializing_if = "TimeSettings::is_empty")]
    time: TimeSettings,
    #[serde(default = "default_true", deserialize_with = "de_flex_bool")]
    turn_off_all_autos: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SettingsBuffer {
    fn default() -> Self {
        Self {
            actuators: BTreeMap::new(),
            cycle_hard: BTreeMap::new(),
            cycle_soft: BTreeMap::new(),
            climate_control: BTreeMap::new(),
            timer: BTreeMap::new(),
            time: TimeSettings::default(),
            turn_off_all_autos: true,
        }
    }
}

impl SettingsBuffer {
    /// Creates an empty buffer (all fields at their defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Loads a buffer from its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` when the document is structurally
    /// invalid.
    pub fn from_json(json: &str) -> std::result::Result<Self, ParseError> {
        serde_json::from_str(json).map_err(ParseError::Json)
    }

    /// Serializes the buffer to its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` on serialization failure.
    pub fn to_json(&self) -> std::result::Result<String, ParseError> {
        serde_json::to_string(self).map_err(ParseError::Json)
    }

    // ------------------------------------------------------------------
    // Actuators
    // ------------------------------------------------------------------

    /// Returns the stored value of an actuator (default 0).
    #[must_use]
    pub fn actuator_value(&self, actuator: ActuatorCode) -> i32 {
        self.stored_actuator_value(actuator).unwrap_or(0)
    }

    /// Returns the stored value of an actuator, or `None` if no value was
    /// ever recorded for it.
    #[must_use]
    pub fn stored_actuator_value(&self, actuator: ActuatorCode) -> Option<i32> {
        self.actuators
            .get(&actuator.code().to_string())
            .map(|a| a.value)
    }

    /// Stores an actuator value.
    pub fn set_actuator_value(&mut self, actuator: ActuatorCode, value: i32) {
        self.actuators
            .entry(actuator.code().to_string())
            .or_default()
            .value = value;
    }

    // ------------------------------------------------------------------
    // Turn flags
    // ------------------------------------------------------------------

    /// Returns whether an automation mode is marked on for an actuator
    /// (default false).
    #[must_use]
    pub fn is_auto_on(&self, mode: AutoMode, actuator: ActuatorCode) -> bool {
        let key = actuator.code().to_string();
        match mode {
            AutoMode::CycleHard => self.cycle_hard.get(&key).is_some_and(|c| c.turn),
            AutoMode::CycleSoft => self.cycle_soft.get(&key).is_some_and(|c| c.turn),
            AutoMode::ClimateControl => self.climate_control.get(&key).is_some_and(|c| c.turn),
            AutoMode::Timer => self.timer.get(&key).is_some_and(|t| t.turn),
        }
    }

    /// Marks an automation mode on or off for an actuator.
    pub fn set_auto_on(&mut self, mode: AutoMode, actuator: ActuatorCode, on: bool) {
        let key = actuator.code().to_string();
        match mode {
            AutoMode::CycleHard => self.cycle_hard.entry(key).or_default().turn = on,
            AutoMode::CycleSoft => self.cycle_soft.entry(key).or_default().turn = on,
            AutoMode::ClimateControl => self.climate_control.entry(key).or_default().turn = on,
            AutoMode::Timer => self.timer.entry(key).or_default().turn = on,
        }
    }

    /// Clears the turn flag of every (mode, actuator) pair in the given
    /// capability space. This is what the bare `E3` command does.
    pub fn wipe_turn_flags(&mut self, caps: &Capabilities) {
        for &actuator in caps.actuators() {
            for &mode in caps.modes() {
                self.set_auto_on(mode, actuator, false);
            }
        }
    }

    /// Returns whether playback starts with a device-wide automation stop
    /// (default true).
    #[must_use]
    pub fn turn_off_all_autos(&self) -> bool {
        self.turn_off_all_autos
    }

    /// Controls whether playback starts with a device-wide automation stop.
    pub fn set_turn_off_all_autos(&mut self, on: bool) {
        self.turn_off_all_autos = on;
    }

    // ------------------------------------------------------------------
    // Hard cycle
    // ------------------------------------------------------------------

    /// Returns the hard-cycle period duration in minutes (default 0).
    #[must_use]
    pub fn hard_duration(&self, actuator: ActuatorCode, period: HardPeriod) -> i32 {
        Self::cycle_field(&self.cycle_hard, actuator, period.code(), |p| p.duration)
    }

    /// Stores a hard-cycle period duration.
    pub fn set_hard_duration(&mut self, actuator: ActuatorCode, period: HardPeriod, duration: i32) {
        Self::cycle_entry(&mut self.cycle_hard, actuator, period.code()).duration = duration;
    }

    /// Returns the hard-cycle period value (default 0).
    #[must_use]
    pub fn hard_value(&self, actuator: ActuatorCode, period: HardPeriod) -> i32 {
        Self::cycle_field(&self.cycle_hard, actuator, period.code(), |p| p.value)
    }

    /// Stores a hard-cycle period value.
    pub fn set_hard_value(&mut self, actuator: ActuatorCode, period: HardPeriod, value: i32) {
        Self::cycle_entry(&mut self.cycle_hard, actuator, period.code()).value = value;
    }

    // ------------------------------------------------------------------
    // Soft cycle
    // ------------------------------------------------------------------

    /// Returns the soft-cycle period duration in minutes (default 0).
    #[must_use]
    pub fn soft_duration(&self, actuator: ActuatorCode, period: SoftPeriod) -> i32 {
        Self::cycle_field(&self.cycle_soft, actuator, period.code(), |p| p.duration)
    }

    /// Stores a soft-cycle period duration.
    pub fn set_soft_duration(&mut self, actuator: ActuatorCode, period: SoftPeriod, duration: i32) {
        Self::cycle_entry(&mut self.cycle_soft, actuator, period.code()).duration = duration;
    }

    /// Returns the soft-cycle period value (default 0).
    #[must_use]
    pub fn soft_value(&self, actuator: ActuatorCode, period: SoftPeriod) -> i32 {
        Self::cycle_field(&self.cycle_soft, actuator, period.code(), |p| p.value)
    }

    /// Stores a soft-cycle period value.
    pub fn set_soft_value(&mut self, actuator: ActuatorCode, period: SoftPeriod, value: i32) {
        Self::cycle_entry(&mut self.cycle_soft, actuator, period.code()).value = value;
    }

    fn cycle_field(
        map: &BTreeMap<String, CycleSettings>,
        actuator: ActuatorCode,
        period: u8,
        field: impl Fn(&PeriodSettings) -> i32,
    ) -> i32 {
        map.get(&actuator.code().to_string())
            .and_then(|c| c.periods.get(&period.to_string()))
            .map_or(0, field)
    }

    fn cycle_entry<'a>(
        map: &'a mut BTreeMap<String, CycleSettings>,
        actuator: ActuatorCode,
        period: u8,
    ) -> &'a mut PeriodSettings {
        map.entry(actuator.code().to_string())
            .or_default()
            .periods
            .entry(period.to_string())
            .or_default()
    }

    // ------------------------------------------------------------------
    // Climate control
    // ------------------------------------------------------------------

    /// Returns the climate-control lower bound (default 0).
    #[must_use]
    pub fn climate_min(&self, actuator: ActuatorCode) -> i32 {
        self.climate_control
            .get(&actuator.code().to_string())
            .map_or(0, |c| c.min)
    }

    /// Stores the climate-control lower bound.
    pub fn set_climate_min(&mut self, actuator: ActuatorCode, min: i32) {
        self.climate_control
            .entry(actuator.code().to_string())
            .or_default()
            .min = min;
    }

    /// Returns the climate-control upper bound (default 0).
    #[must_use]
    pub fn climate_max(&self, actuator: ActuatorCode) -> i32 {
        self.climate_control
            .get(&actuator.code().to_string())
            .map_or(0, |c| c.max)
    }

    /// Stores the climate-control upper bound.
    pub fn set_climate_max(&mut self, actuator: ActuatorCode, max: i32) {
        self.climate_control
            .entry(actuator.code().to_string())
            .or_default()
            .max = max;
    }

    /// Returns the climate-control driving sensor, if one was assigned.
    #[must_use]
    pub fn climate_sensor(&self, actuator: ActuatorCode) -> Option<i32> {
        self.climate_control
            .get(&actuator.code().to_string())
            .and_then(|c| c.sensor)
    }

    /// Assigns the climate-control driving sensor.
    pub fn set_climate_sensor(&mut self, actuator: ActuatorCode, sensor: i32) {
        self.climate_control
            .entry(actuator.code().to_string())
            .or_default()
            .sensor = Some(sensor);
    }

    // ------------------------------------------------------------------
    // Timer
    // ------------------------------------------------------------------

    /// Returns one byte of the packed timer schedule (default 0).
    #[must_use]
    pub fn timer_byte(&self, actuator: ActuatorCode, index: usize) -> u8 {
        self.timer
            .get(&actuator.code().to_string())
            .and_then(|t| t.bytes.get(&index.to_string()))
            .map_or(0, |b| b.0)
    }

    /// Stores one byte of the packed timer schedule.
    pub fn set_timer_byte(&mut self, actuator: ActuatorCode, index: usize, value: u8) {
        self.timer
            .entry(actuator.code().to_string())
            .or_default()
            .bytes
            .insert(index.to_string(), FlexByte(value));
    }

    /// Assembles the full quarter-hour schedule of an actuator.
    #[must_use]
    pub fn minute_grid(&self, actuator: ActuatorCode) -> MinuteGrid {
        let mut bytes = [0u8; MINUTE_GRID_BYTES];
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = self.timer_byte(actuator, index);
        }
        MinuteGrid::from_bytes(bytes)
    }

    /// Stores a full quarter-hour schedule for an actuator.
    pub fn set_minute_grid(&mut self, actuator: ActuatorCode, grid: MinuteGrid) {
        for (index, byte) in grid.bytes().into_iter().enumerate() {
            self.set_timer_byte(actuator, index, byte);
        }
    }

    /// Sets one quarter-hour flag, or (with `quarter` `None`) the whole
    /// hour, as the two forms of `E252` do. Out-of-range indices are
    /// ignored.
    pub fn set_minute_flag(
        &mut self,
        actuator: ActuatorCode,
        hour: u8,
        quarter: Option<u8>,
        on: bool,
    ) {
        let mut grid = self.minute_grid(actuator);
        let outcome = match quarter {
            Some(quarter) => grid.set(hour, quarter, on),
            None => grid.set_hour(hour, on),
        };
        if outcome.is_ok() {
            self.set_minute_grid(actuator, grid);
        }
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Returns the stored device clock time, if any.
    #[must_use]
    pub fn time(&self) -> Option<ClockTime> {
        self.time
            .time
            .and_then(|(h, m)| ClockTime::new(h, m).ok())
    }

    /// Stores the device clock time.
    pub fn set_time(&mut self, time: ClockTime) {
        self.time.time = Some((time.hours(), time.minutes()));
    }

    /// Returns the stored time source, if any.
    #[must_use]
    pub fn time_source(&self) -> Option<TimeSource> {
        self.time
            .source
            .and_then(|s| u8::try_from(s).ok())
            .map(TimeSource::new)
    }

    /// Stores the time source.
    pub fn set_time_source(&mut self, source: TimeSource) {
        self.time.source = Some(i32::from(source.code()));
    }

    // ------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------

    /// Applies one parsed command to the buffer.
    ///
    /// Only configuration-bearing commands mutate state; queries and
    /// unknown names are no-ops, so a full transcript can be replayed
    /// without filtering. Commands with missing or out-of-range parameters
    /// are skipped.
    ///
    /// The capability space bounds the bare-`E3` wipe.
    pub fn apply_command(&mut self, cmd: &CommandLine, caps: &Capabilities) {
        if cmd.is_empty() {
            return;
        }
        match cmd.name() {
            "E0" => {
                if let (Some(a), Some(v)) = (actuator_param(cmd, 'A'), cmd.param('V')) {
                    self.set_actuator_value(a, v);
                }
            }
            // Older firmware revisions had one turn command per mode.
            "E100" | "E150" | "E200" | "E250" => {
                let mode = match cmd.name() {
                    "E100" => AutoMode::CycleHard,
                    "E150" => AutoMode::CycleSoft,
                    "E200" => AutoMode::ClimateControl,
                    _ => AutoMode::Timer,
                };
                if let (Some(a), Some(b)) = (actuator_param(cmd, 'A'), cmd.param('B')) {
                    self.set_auto_on(mode, a, b != 0);
                }
            }
            "E3" => match (cmd.param('R'), actuator_param(cmd, 'A')) {
                (Some(r), Some(a)) => {
                    let mode = u8::try_from(r).ok().and_then(|r| AutoMode::from_code(r).ok());
                    if let Some(mode) = mode {
                        self.set_auto_on(mode, a, cmd.param('B').unwrap_or(0) != 0);
                    }
                }
                _ => self.wipe_turn_flags(caps),
            },
            "E8" => {
                let time = cmd.param('H').zip(cmd.param('M')).and_then(|(h, m)| {
                    let h = u8::try_from(h).ok()?;
                    let m = u8::try_from(m).ok()?;
                    ClockTime::new(h, m).ok()
                });
                if let Some(time) = time {
                    self.set_time(time);
                }
            }
            "E9" => {
                if let Some(t) = cmd.param('T').and_then(|t| u8::try_from(t).ok()) {
                    self.set_time_source(TimeSource::new(t));
                }
            }
            "E101" | "E103" => {
                let period = cmd
                    .param('B')
                    .and_then(|b| u8::try_from(b).ok())
                    .and_then(|b| HardPeriod::from_code(b).ok());
                if let (Some(a), Some(p)) = (actuator_param(cmd, 'A'), period) {
                    if cmd.name() == "E101" {
                        if let Some(d) = cmd.param('D') {
                            self.set_hard_duration(a, p, d);
                        }
                    } else if let Some(v) = cmd.param('V') {
                        self.set_hard_value(a, p, v);
                    }
                }
            }
            "E151" | "E153" => {
                let period = cmd
                    .param('P')
                    .and_then(|p| u8::try_from(p).ok())
                    .and_then(|p| SoftPeriod::from_code(p).ok());
                if let (Some(a), Some(p)) = (actuator_param(cmd, 'A'), period) {
                    if cmd.name() == "E151" {
                        if let Some(d) = cmd.param('D') {
                            self.set_soft_duration(a, p, d);
                        }
                    } else if let Some(v) = cmd.param('V') {
                        self.set_soft_value(a, p, v);
                    }
                }
            }
            "E201" => {
                if let (Some(a), Some(s)) = (actuator_param(cmd, 'A'), cmd.param('S')) {
                    self.set_climate_sensor(a, s);
                }
            }
            "E202" => {
                if let (Some(a), Some(v)) = (actuator_param(cmd, 'A'), cmd.param('V')) {
                    self.set_climate_min(a, v);
                }
            }
            "E203" => {
                if let (Some(a), Some(v)) = (actuator_param(cmd, 'A'), cmd.param('V')) {
                    self.set_climate_max(a, v);
                }
            }
            "E251" => {
                let index = cmd
                    .param('B')
                    .and_then(|b| usize::try_from(b).ok())
                    .filter(|&b| b < MINUTE_GRID_BYTES);
                let value = cmd.param('V').and_then(|v| u8::try_from(v).ok());
                if let (Some(a), Some(index), Some(value)) =
                    (actuator_param(cmd, 'A'), index, value)
                {
                    self.set_timer_byte(a, index, value);
                }
            }
            "E252" => {
                let hour = cmd.param('H').and_then(|h| u8::try_from(h).ok());
                let quarter = cmd.param('M').and_then(|m| u8::try_from(m).ok());
                if let (Some(a), Some(hour), Some(b)) =
                    (actuator_param(cmd, 'A'), hour, cmd.param('B'))
                {
                    self.set_minute_flag(a, hour, quarter, b != 0);
                }
            }
            _ => {}
        }
    }

    /// Replays a transcript of command lines, in order.
    ///
    /// Blank lines are skipped; malformed lines are logged and skipped.
    /// Order matters: later writes to the same field win.
    pub fn replay<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>, caps: &Capabilities) {
        for line in lines {
            match CommandLine::parse(line) {
                Ok(cmd) => self.apply_command(&cmd, caps),
                Err(err) => tracing::warn!(line, %err, "skipping malformed line in replay"),
            }
        }
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    /// Emits the command sequence that reproduces this buffer on a device.
    ///
    /// Deterministic order: the device-wide automation stop first (unless
    /// disabled), then the time source, then actuator values, then every
    /// automation parameter, and only then the `turn(on)` commands. Turning
    /// on strictly last keeps the hardware from running an automation on
    /// stale or default parameters mid-configuration.
    ///
    /// The iteration space comes from the target device's capabilities, so
    /// flushing onto a smaller unit configures only what it has.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` when the channel fails mid-sequence.
    pub async fn flush<T: Transport>(&self, device: &mut Growbox<T>) -> Result<()> {
        let caps = device.capabilities().clone();

        if self.turn_off_all_autos {
            device.turn_off_all_autos().await?;
        }
        if let Some(source) = self.time_source() {
            device.set_time_source(source).await?;
        }

        for &actuator in caps.actuators() {
            device
                .set_actuator(actuator, self.actuator_value(actuator))
                .await?;
        }

        for &actuator in caps.actuators() {
            for &mode in caps.modes() {
                self.flush_mode_params(device, mode, actuator).await?;
            }
        }

        // Parameters are all in place; now, and only now, enable.
        for &actuator in caps.actuators() {
            for &mode in caps.modes() {
                if self.is_auto_on(mode, actuator) {
                    device.turn_auto(mode, actuator, true).await?;
                }
            }
        }

        Ok(())
    }

    async fn flush_mode_params<T: Transport>(
        &self,
        device: &mut Growbox<T>,
        mode: AutoMode,
        actuator: ActuatorCode,
    ) -> Result<()> {
        match mode {
            AutoMode::CycleHard => {
                for period in HardPeriod::ALL {
                    device
                        .set_hard_cycle_duration(actuator, period, self.hard_duration(actuator, period))
                        .await?;
                    device
                        .set_hard_cycle_value(actuator, period, self.hard_value(actuator, period))
                        .await?;
                }
            }
            AutoMode::CycleSoft => {
                for period in SoftPeriod::ALL {
                    device
                        .set_soft_cycle_duration(actuator, period, self.soft_duration(actuator, period))
                        .await?;
                    // Sunrise and sunset interpolate between the
                    // neighbouring periods; only day and night carry values.
                    if period.code() % 2 == 1 {
                        device
                            .set_soft_cycle_value(actuator, period, self.soft_value(actuator, period))
                            .await?;
                    }
                }
            }
            AutoMode::ClimateControl => {
                device
                    .set_climate_min(actuator, self.climate_min(actuator))
                    .await?;
                device
                    .set_climate_max(actuator, self.climate_max(actuator))
                    .await?;
                if let Some(sensor) = self.climate_sensor(actuator) {
                    device.set_climate_sensor_raw(actuator, sensor).await?;
                }
            }
            AutoMode::Timer => {
                for index in 0..MINUTE_GRID_BYTES {
                    device
                        .set_timer_byte(actuator, index, self.timer_byte(actuator, index))
                        .await?;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Flexible scalar decoding (legacy persisted files)
// ============================================================================

/// A timer byte that deserializes from a number or a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
struct FlexByte(u8);

impl<'de> Deserialize<'de> for FlexByte {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        de_flex_i32(deserializer).and_then(|v| {
            u8::try_from(v)
                .map(FlexByte)
                .map_err(|_| de::Error::custom(format!("timer byte {v} out of range")))
        })
    }
}

fn de_flex_i32<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
    struct FlexI32;

    impl Visitor<'_> for FlexI32 {
        type Value = i32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer, a numeric string, or a boolean")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<i32, E> {
            i32::try_from(v).map_err(|_| E::custom(format!("integer {v} out of range")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<i32, E> {
            i32::try_from(v).map_err(|_| E::custom(format!("integer {v} out of range")))
        }

        #[allow(clippy::cast_possible_truncation)]
        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<i32, E> {
            Ok(v as i32)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<i32, E> {
            Ok(i32::from(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<i32, E> {
            v.trim()
                .parse()
                .map_err(|_| E::custom(format!("non-numeric string {v:?}")))
        }
    }

    deserializer.deserialize_any(FlexI32)
}

fn de_flex_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    struct FlexBool;

    impl Visitor<'_> for FlexBool {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean, an integer, or a numeric string")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<bool, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<bool, E> {
            match v.trim() {
                "true" | "True" => Ok(true),
                "false" | "False" => Ok(false),
                other => other
                    .parse::<i64>()
                    .map(|n| n != 0)
                    .map_err(|_| E::custom(format!("non-boolean string {v:?}"))),
            }
        }
    }

    deserializer.deserialize_any(FlexBool)
}

fn de_flex_opt_i32<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i32>, D::Error> {
    struct FlexOpt;

    impl<'de> Visitor<'de> for FlexOpt {
        type Value = Option<i32>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an optional integer or numeric string")
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(
            self,
            deserializer: D2,
        ) -> std::result::Result<Self::Value, D2::Error> {
            de_flex_i32(deserializer).map(Some)
        }
    }

    deserializer.deserialize_option(FlexOpt)
}

fn actuator_param(cmd: &CommandLine, key: char) -> Option<ActuatorCode> {
    cmd.param(key)
        .and_then(|a| u8::try_from(a).ok())
        .map(ActuatorCode::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> Capabilities {
        Capabilities::default()
    }

    fn apply(buffer: &mut SettingsBuffer, line: &str) {
        let cmd = CommandLine::parse(line).unwrap();
        buffer.apply_command(&cmd, &caps());
    }

    #[test]
    fn set_actuator_value_from_line() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E0 A2 V255");
        assert_eq!(buffer.actuator_value(ActuatorCode::WHITE_LIGHT), 255);
        assert_eq!(buffer.actuator_value(ActuatorCode::HUMIDIFIER), 0);
    }

    #[test]
    fn apply_is_idempotent() {
        let mut once = SettingsBuffer::new();
        apply(&mut once, "E101 A0 B1 D600");

        let mut thrice = SettingsBuffer::new();
        for _ in 0..3 {
            apply(&mut thrice, "E101 A0 B1 D600");
        }
        assert_eq!(once, thrice);
    }

    #[test]
    fn later_writes_win() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E0 A2 V100");
        apply(&mut buffer, "E0 A2 V255");
        assert_eq!(buffer.actuator_value(ActuatorCode::WHITE_LIGHT), 255);
    }

    #[test]
    fn turn_flag_with_mode_and_actuator() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E3 R2 A1 B1");
        assert!(buffer.is_auto_on(AutoMode::ClimateControl, ActuatorCode::EXTRACTOR));
        apply(&mut buffer, "E3 R2 A1 B0");
        assert!(!buffer.is_auto_on(AutoMode::ClimateControl, ActuatorCode::EXTRACTOR));
    }

    #[test]
    fn legacy_per_mode_turn_commands() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E100 A0 B1");
        apply(&mut buffer, "E250 A2 B1");
        assert!(buffer.is_auto_on(AutoMode::CycleHard, ActuatorCode::HUMIDIFIER));
        assert!(buffer.is_auto_on(AutoMode::Timer, ActuatorCode::WHITE_LIGHT));
        apply(&mut buffer, "E100 A0 B0");
        assert!(!buffer.is_auto_on(AutoMode::CycleHard, ActuatorCode::HUMIDIFIER));
    }

    #[test]
    fn bare_e3_wipes_capability_space() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E3 R0 A0 B1");
        apply(&mut buffer, "E3 R3 A2 B1");
        apply(&mut buffer, "E3");
        for &mode in caps().modes() {
            for &actuator in caps().actuators() {
                assert!(!buffer.is_auto_on(mode, actuator));
            }
        }
    }

    #[test]
    fn cycle_settings_from_lines() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E101 A0 B1 D600");
        apply(&mut buffer, "E103 A0 B1 V255");
        apply(&mut buffer, "E151 A2 P3 D540");
        apply(&mut buffer, "E153 A2 P1 V200");

        let a0 = ActuatorCode::HUMIDIFIER;
        let a2 = ActuatorCode::WHITE_LIGHT;
        assert_eq!(buffer.hard_duration(a0, HardPeriod::Day), 600);
        assert_eq!(buffer.hard_value(a0, HardPeriod::Day), 255);
        assert_eq!(buffer.soft_duration(a2, SoftPeriod::Night), 540);
        assert_eq!(buffer.soft_value(a2, SoftPeriod::Day), 200);
        // Untouched fields stay at defaults.
        assert_eq!(buffer.hard_duration(a0, HardPeriod::Night), 0);
    }

    #[test]
    fn climate_settings_from_lines() {
        let mut buffer = SettingsBuffer::new();
        let a = ActuatorCode::HUMIDIFIER;
        apply(&mut buffer, "E202 A0 V40");
        apply(&mut buffer, "E203 A0 V60");
        assert_eq!(buffer.climate_min(a), 40);
        assert_eq!(buffer.climate_max(a), 60);
        assert_eq!(buffer.climate_sensor(a), None);
        apply(&mut buffer, "E201 A0 S1");
        assert_eq!(buffer.climate_sensor(a), Some(1));
    }

    #[test]
    fn timer_bytes_and_flags() {
        let mut buffer = SettingsBuffer::new();
        let a = ActuatorCode::EXTRACTOR;
        apply(&mut buffer, "E251 A1 B0 V128");
        assert_eq!(buffer.timer_byte(a, 0), 128);
        assert!(buffer.minute_grid(a).get(0, 0).unwrap());

        apply(&mut buffer, "E252 A1 H6 M2 B1");
        assert!(buffer.minute_grid(a).get(6, 2).unwrap());

        // Hour-only form covers all four quarters.
        apply(&mut buffer, "E252 A1 H7 B1");
        for quarter in 0..4 {
            assert!(buffer.minute_grid(a).get(7, quarter).unwrap());
        }
    }

    #[test]
    fn clock_from_lines() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E8 H7 M30");
        apply(&mut buffer, "E9 T1");
        assert_eq!(buffer.time(), Some(ClockTime::new(7, 30).unwrap()));
        assert_eq!(buffer.time_source(), Some(TimeSource::new(1)));
    }

    #[test]
    fn unknown_commands_are_noops() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E1 A0");
        apply(&mut buffer, "E99 X5");
        apply(&mut buffer, "G28");
        assert_eq!(buffer, SettingsBuffer::new());
    }

    #[test]
    fn missing_params_are_skipped() {
        let mut buffer = SettingsBuffer::new();
        apply(&mut buffer, "E0 A2");
        apply(&mut buffer, "E101 A0 D600");
        assert_eq!(buffer, SettingsBuffer::new());
    }

    #[test]
    fn replay_skips_blank_and_malformed() {
        let mut buffer = SettingsBuffer::new();
        buffer.replay(
            ["E0 A2 V255", "", "   ", "garbage line", "E0 A1 V9"],
            &caps(),
        );
        assert_eq!(buffer.actuator_value(ActuatorCode::WHITE_LIGHT), 255);
        assert_eq!(buffer.actuator_value(ActuatorCode::EXTRACTOR), 9);
    }

    #[test]
    fn json_round_trip() {
        let mut buffer = SettingsBuffer::new();
        buffer.set_actuator_value(ActuatorCode::WHITE_LIGHT, 255);
        buffer.set_hard_duration(ActuatorCode::HUMIDIFIER, HardPeriod::Day, 600);
        buffer.set_auto_on(AutoMode::Timer, ActuatorCode::EXTRACTOR, true);
        buffer.set_climate_sensor(ActuatorCode::HUMIDIFIER, 1);
        buffer.set_timer_byte(ActuatorCode::EXTRACTOR, 0, 128);
        buffer.set_time_source(TimeSource::new(1));

        let json = buffer.to_json().unwrap();
        let restored = SettingsBuffer::from_json(&json).unwrap();
        assert_eq!(restored, buffer);
    }

    #[test]
    fn json_keys_are_decimal_strings() {
        let mut buffer = SettingsBuffer::new();
        buffer.set_actuator_value(ActuatorCode::WHITE_LIGHT, 255);
        buffer.set_hard_duration(ActuatorCode::HUMIDIFIER, HardPeriod::Day, 600);

        let value: serde_json::Value = serde_json::from_str(&buffer.to_json().unwrap()).unwrap();
        assert_eq!(value["actuators"]["2"]["value"], 255);
        assert_eq!(value["0"]["0"]["1"]["duration"], 600);
    }

    #[test]
    fn legacy_stringified_values_load() {
        // Shape produced by the original desktop tool: stringified numbers,
        // 0/1 turn flags, stray breadcrumb keys at the root.
        let json = r#"{
            "actuators": {"2": {"value": 255}},
            "0": {"0": {"turn": 1, "1": {"duration": "600", "value": "255"}}},
            "2": {"0": {"min": "40", "max": "60", "sensor": 1}},
            "3": {"1": {"0": "128"}},
            "time": {"source": 1},
            "set_actuator_value": {"actuator": 2, "value": 255}
        }"#;
        let buffer = SettingsBuffer::from_json(json).unwrap();
        assert_eq!(buffer.actuator_value(ActuatorCode::WHITE_LIGHT), 255);
        assert!(buffer.is_auto_on(AutoMode::CycleHard, ActuatorCode::HUMIDIFIER));
        assert_eq!(
            buffer.hard_duration(ActuatorCode::HUMIDIFIER, HardPeriod::Day),
            600
        );
        assert_eq!(buffer.climate_min(ActuatorCode::HUMIDIFIER), 40);
        assert_eq!(buffer.timer_byte(ActuatorCode::EXTRACTOR, 0), 128);
        assert_eq!(buffer.time_source(), Some(TimeSource::new(1)));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(SettingsBuffer::from_json("{not json").is_err());
    }

    #[test]
    fn turn_off_all_autos_defaults_true() {
        let buffer = SettingsBuffer::from_json("{}").unwrap();
        assert!(buffer.turn_off_all_autos());

        let mut buffer = SettingsBuffer::new();
        buffer.set_turn_off_all_autos(false);
        let restored = SettingsBuffer::from_json(&buffer.to_json().unwrap()).unwrap();
        assert!(!restored.turn_off_all_autos());
    }
}
