// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device capability description.
//!
//! A growbox unit carries a fixed set of actuators and supports a fixed set
//! of automation modes, but those sets changed between hardware revisions.
//! Operations that iterate the whole (mode, actuator) space - the bare-`E3`
//! wipe and buffer flushing - take their bounds from a [`Capabilities`]
//! value instead of hard-coding them.

use crate::types::{ActuatorCode, AutoMode, SensorCode};

/// The (mode, actuator, sensor) space of one device revision.
///
/// # Examples
///
/// ```
/// use growbox_lib::Capabilities;
/// use growbox_lib::types::{ActuatorCode, AutoMode};
///
/// // Reference hardware: three actuators, all four automation modes.
/// let caps = Capabilities::default();
/// assert_eq!(caps.actuators().len(), 3);
/// assert_eq!(caps.modes().len(), 4);
///
/// // A stripped-down unit.
/// let caps = Capabilities::new(vec![ActuatorCode::WHITE_LIGHT], AutoMode::ALL.to_vec());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    actuators: Vec<ActuatorCode>,
    sensors: Vec<SensorCode>,
    modes: Vec<AutoMode>,
}

impl Capabilities {
    /// Creates a capability description with the given actuator and mode
    /// sets and the reference sensor pair.
    #[must_use]
    pub fn new(actuators: Vec<ActuatorCode>, modes: Vec<AutoMode>) -> Self {
        Self {
            actuators,
            sensors: vec![SensorCode::TEMPERATURE, SensorCode::HUMIDITY],
            modes,
        }
    }

    /// Replaces the sensor set.
    #[must_use]
    pub fn with_sensors(mut self, sensors: Vec<SensorCode>) -> Self {
        self.sensors = sensors;
        self
    }

    /// Returns the actuators present on this device, in flush order.
    #[must_use]
    pub fn actuators(&self) -> &[ActuatorCode] {
        &self.actuators
    }

    /// Returns the sensors present on this device.
    #[must_use]
    pub fn sensors(&self) -> &[SensorCode] {
        &self.sensors
    }

    /// Returns the automation modes this device understands.
    #[must_use]
    pub fn modes(&self) -> &[AutoMode] {
        &self.modes
    }
}

impl Default for Capabilities {
    /// The later hardware revision: actuators 0-2, all four modes.
    fn default() -> Self {
        Self::new(
            vec![
                ActuatorCode::HUMIDIFIER,
                ActuatorCode::EXTRACTOR,
                ActuatorCode::WHITE_LIGHT,
            ],
            AutoMode::ALL.to_vec(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_space_is_4x3() {
        let caps = Capabilities::default();
        assert_eq!(caps.actuators().len() * caps.modes().len(), 12);
    }

    #[test]
    fn custom_sensor_set() {
        let caps = Capabilities::default().with_sensors(vec![SensorCode::TEMPERATURE]);
        assert_eq!(caps.sensors(), &[SensorCode::TEMPERATURE]);
    }
}
