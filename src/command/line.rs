// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The wire line codec.
//!
//! One command per line, ASCII, fields space-separated. The first token is
//! the command name (a letter followed by digits, e.g. `E101`); every
//! further token is a single-letter parameter key followed by a signed
//! integer (e.g. `A0`, `D600`, `V-1`). Keys are uppercased on parse, and a
//! repeated key silently overwrites the earlier one - firmware behaves the
//! same way, so the tolerance is kept rather than fixed.

use std::fmt;

use crate::error::ParseError;

/// One parsed or under-construction command line.
///
/// Parsing an empty (or whitespace-only) line yields an *empty sentinel*
/// rather than an error; dispatchers check [`CommandLine::is_empty`] and
/// skip it. This mirrors how blank lines inside recorded transcripts and
/// `.gcode` files are treated.
///
/// # Examples
///
/// ```
/// use growbox_lib::command::CommandLine;
///
/// let cmd = CommandLine::parse("e101 a0 B1 D600").unwrap();
/// assert_eq!(cmd.name(), "E101");
/// assert_eq!(cmd.letter(), 'E');
/// assert_eq!(cmd.number(), 101);
/// assert_eq!(cmd.param('d'), Some(600));
///
/// let built = CommandLine::new("E0").with_param('A', 2).with_param('V', 255);
/// assert_eq!(built.to_string(), "E0 A2 V255");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine {
    name: String,
    letter: char,
    number: u16,
    params: Vec<(char, i32)>,
}

impl CommandLine {
    /// Starts building a command line for encoding.
    ///
    /// The name is uppercased; its letter/number split follows the same
    /// rule as parsing.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let name = name.to_ascii_uppercase();
        let letter = name.chars().next().unwrap_or('\0');
        let number = name.get(1..).and_then(|d| d.parse().ok()).unwrap_or(0);
        Self {
            name,
            letter,
            number,
            params: Vec::new(),
        }
    }

    /// Appends a parameter, replacing any earlier value under the same key.
    #[must_use]
    pub fn with_param(mut self, key: char, value: i32) -> Self {
        self.set_param(key, value);
        self
    }

    /// Sets a parameter in place (last write wins).
    pub fn set_param(&mut self, key: char, value: i32) {
        let key = key.to_ascii_uppercase();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    /// Parses one line of text.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MalformedLine` when the command name has no
    /// digits or a parameter value is not a signed integer. An empty line is
    /// *not* an error; it parses to the empty sentinel.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            return Ok(Self::default());
        };

        let name = first.to_ascii_uppercase();
        let letter = name
            .chars()
            .next()
            .expect("split_whitespace yields non-empty tokens");
        let number = name[letter.len_utf8()..]
            .parse()
            .map_err(|_| ParseError::MalformedLine {
                line: line.to_string(),
                reason: format!("command name {name:?} has no numeric id"),
            })?;

        let mut cmd = Self {
            name,
            letter,
            number,
            params: Vec::new(),
        };
        for token in tokens {
            let key = token
                .chars()
                .next()
                .expect("split_whitespace yields non-empty tokens")
                .to_ascii_uppercase();
            let value =
                token[1..]
                    .parse::<i32>()
                    .map_err(|_| ParseError::MalformedLine {
                        line: line.to_string(),
                        reason: format!("parameter {key:?} has a non-numeric value"),
                    })?;
            cmd.set_param(key, value);
        }

        Ok(cmd)
    }

    /// Returns true for the sentinel produced by parsing a blank line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Returns the uppercase command name, e.g. `"E101"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the command letter, e.g. `'E'`.
    #[must_use]
    pub fn letter(&self) -> char {
        self.letter
    }

    /// Returns the numeric id of the command, e.g. `101`.
    #[must_use]
    pub fn number(&self) -> u16 {
        self.number
    }

    /// Looks a parameter up by key, case-insensitively.
    #[must_use]
    pub fn param(&self, key: char) -> Option<i32> {
        let key = key.to_ascii_uppercase();
        self.params.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Returns the parameters in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(char, i32)] {
        &self.params
    }
}

impl fmt::Display for CommandLine {
    /// Renders the wire form, without line termination.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.params {
            write!(f, " {key}{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_line() {
        let cmd = CommandLine::parse("E0 A2 V255").unwrap();
        assert_eq!(cmd.name(), "E0");
        assert_eq!(cmd.letter(), 'E');
        assert_eq!(cmd.number(), 0);
        assert_eq!(cmd.param('A'), Some(2));
        assert_eq!(cmd.param('V'), Some(255));
    }

    #[test]
    fn parse_uppercases() {
        let cmd = CommandLine::parse("e101 a0 b1 d600").unwrap();
        assert_eq!(cmd.name(), "E101");
        assert_eq!(cmd.param('D'), Some(600));
        assert_eq!(cmd.param('d'), Some(600));
    }

    #[test]
    fn parse_negative_value() {
        let cmd = CommandLine::parse("E201 A0 S-1").unwrap();
        assert_eq!(cmd.param('S'), Some(-1));
    }

    #[test]
    fn empty_line_is_sentinel() {
        assert!(CommandLine::parse("").unwrap().is_empty());
        assert!(CommandLine::parse("   ").unwrap().is_empty());
        assert!(!CommandLine::parse("E3").unwrap().is_empty());
    }

    #[test]
    fn repeated_key_last_wins() {
        let cmd = CommandLine::parse("E0 A1 a2").unwrap();
        assert_eq!(cmd.param('A'), Some(2));
        assert_eq!(cmd.params().len(), 1);
    }

    #[test]
    fn malformed_command_name() {
        assert!(CommandLine::parse("E A0").is_err());
        assert!(CommandLine::parse("ok").is_err());
    }

    #[test]
    fn malformed_param_value() {
        assert!(CommandLine::parse("E0 Axy").is_err());
        assert!(CommandLine::parse("E0 A").is_err());
    }

    #[test]
    fn encode_round_trip() {
        let built = CommandLine::new("E101")
            .with_param('A', 0)
            .with_param('B', 1)
            .with_param('D', 600);
        let line = built.to_string();
        assert_eq!(line, "E101 A0 B1 D600");
        let parsed = CommandLine::parse(&line).unwrap();
        assert_eq!(parsed, built);
    }

    #[test]
    fn encode_without_params() {
        assert_eq!(CommandLine::new("E3").to_string(), "E3");
    }

    #[test]
    fn display_has_no_newline() {
        let line = CommandLine::new("E8")
            .with_param('H', 7)
            .with_param('M', 30)
            .to_string();
        assert!(!line.ends_with('\n'));
    }
}
