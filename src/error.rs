// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the growbox library.
//!
//! This module provides the error hierarchy for failures across the library:
//! value validation, transport communication, and line/answer parsing.
//!
//! A timed-out read is deliberately *not* an error. It yields a short or
//! empty answer, and decoding that answer fails with
//! [`ParseError::MissingLine`] only when a caller asks for a line that never
//! arrived.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred at the transport boundary.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while parsing a command line or an answer.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("{field} value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// The field that was validated.
        field: &'static str,
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// An automation mode code is not one of the four known modes.
    #[error("unknown automation mode code: {0}")]
    UnknownMode(u8),

    /// A period code does not exist within the given automation mode.
    #[error("unknown period code {code} for {mode}")]
    UnknownPeriod {
        /// The automation mode that was addressed.
        mode: &'static str,
        /// The period code that was provided.
        code: u8,
    },
}

/// Errors at the channel boundary (write/connect/read failures).
///
/// These always propagate to the caller; the library never retries
/// internally. After any transport error the channel should be assumed
/// unusable and reopened by the caller.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP relay request failed.
    #[cfg(feature = "http")]
    #[error("HTTP relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O failure on the underlying channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection to the device failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The channel was closed and cannot carry further requests.
    #[error("channel closed")]
    Closed,
}

/// Errors related to parsing command lines and device answers.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A command line did not follow the wire syntax.
    #[error("malformed command line {line:?}: {reason}")]
    MalformedLine {
        /// The offending line.
        line: String,
        /// Description of the syntax violation.
        reason: String,
    },

    /// An expected answer line was missing.
    ///
    /// This is how a timed-out or truncated answer surfaces when a caller
    /// decodes it positionally.
    #[error("answer line {index} is missing")]
    MissingLine {
        /// Zero-based index of the missing data line.
        index: usize,
    },

    /// An answer line carried the NAN sentinel where a number was required.
    #[error("answer line {index} is not a number")]
    NotANumber {
        /// Zero-based index of the data line.
        index: usize,
    },

    /// JSON (de)serialization of a persisted settings buffer failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            field: "hours",
            min: 0,
            max: 23,
            actual: 25,
        };
        assert_eq!(err.to_string(), "hours value 25 is out of range [0, 23]");
    }

    #[test]
    fn error_from_parse_error() {
        let parse_err = ParseError::MissingLine { index: 1 };
        let err: Error = parse_err.into();
        assert!(matches!(
            err,
            Error::Parse(ParseError::MissingLine { index: 1 })
        ));
    }

    #[test]
    fn malformed_line_display() {
        let err = ParseError::MalformedLine {
            line: "E0 Axy".to_string(),
            reason: "parameter 'A' has a non-numeric value".to_string(),
        };
        assert!(err.to_string().contains("E0 Axy"));
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::Closed;
        assert_eq!(err.to_string(), "channel closed");
    }
}
