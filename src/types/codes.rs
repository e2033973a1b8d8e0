// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Small address types for the devices inside a growbox.
//!
//! Actuators and sensors are addressed on the wire by small integer codes.
//! The codes of the reference hardware are provided as constants, but any
//! code fits: the set of actuators a given unit actually carries is part of
//! its [`Capabilities`](crate::Capabilities), not of the type.

use std::fmt;

/// Address of a controllable output device (light, fan, humidifier).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ActuatorCode(u8);

impl ActuatorCode {
    /// Humidifier of the reference hardware.
    pub const HUMIDIFIER: Self = Self(0);
    /// Air extractor of the reference hardware.
    pub const EXTRACTOR: Self = Self(1);
    /// White grow light of the reference hardware.
    pub const WHITE_LIGHT: Self = Self(2);
    /// Far-red light of the reference hardware.
    pub const FAR_RED_LIGHT: Self = Self(3);

    /// Creates an actuator address from a raw wire code.
    #[must_use]
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Returns the raw wire code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for ActuatorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for ActuatorCode {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

/// Address of a readable input device (temperature, humidity).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SensorCode(u8);

impl SensorCode {
    /// Temperature sensor of the reference hardware (°C).
    pub const TEMPERATURE: Self = Self(0);
    /// Relative humidity sensor of the reference hardware (%).
    pub const HUMIDITY: Self = Self(1);

    /// Creates a sensor address from a raw wire code.
    #[must_use]
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Returns the raw wire code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SensorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for SensorCode {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

/// Source the device clock is driven from (`E9`/`E91`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(transparent)]
pub struct TimeSource(u8);

impl TimeSource {
    /// Creates a time source from a raw wire code.
    #[must_use]
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Returns the raw wire code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for TimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actuator_constants() {
        assert_eq!(ActuatorCode::HUMIDIFIER.code(), 0);
        assert_eq!(ActuatorCode::EXTRACTOR.code(), 1);
        assert_eq!(ActuatorCode::WHITE_LIGHT.code(), 2);
        assert_eq!(ActuatorCode::FAR_RED_LIGHT.code(), 3);
    }

    #[test]
    fn sensor_constants() {
        assert_eq!(SensorCode::TEMPERATURE.code(), 0);
        assert_eq!(SensorCode::HUMIDITY.code(), 1);
    }

    #[test]
    fn display_is_bare_code() {
        assert_eq!(ActuatorCode::WHITE_LIGHT.to_string(), "2");
        assert_eq!(SensorCode::HUMIDITY.to_string(), "1");
        assert_eq!(TimeSource::new(1).to_string(), "1");
    }
}
