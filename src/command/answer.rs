// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Framed device answers.
//!
//! A successful answer is a sequence of CRLF-terminated data lines followed
//! by a literal `ok` line. Each data line is `"<tag>:<value>"` with
//! two-decimal formatting on the device side, or the case-insensitive
//! literal `NAN` for an undefined sensor reading.
//!
//! Decoding is positional: a two-value answer (say, current period plus
//! elapsed duration) is disambiguated by line order, not by tag. The tag is
//! still kept for callers that want to sanity-check it.

use crate::error::ParseError;

/// An ordered sequence of `(tag, value)` pairs decoded from raw answer
/// bytes, the trailing `ok` terminator stripped.
///
/// `None` values represent the device's explicit not-a-number sentinel.
///
/// # Examples
///
/// ```
/// use growbox_lib::command::Answer;
///
/// let answer = Answer::parse(b"V:42.00\r\nok\r\n");
/// assert_eq!(answer.lines(), &[('V', Some(42.0))]);
/// assert_eq!(answer.int(0).unwrap(), 42);
///
/// let nan = Answer::parse(b"S:NAN\r\nok\r\n");
/// assert_eq!(nan.float(0).unwrap(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Answer {
    lines: Vec<(char, Option<f64>)>,
}

impl Answer {
    /// Decodes raw answer bytes.
    ///
    /// The final line (normally `ok`) is dropped; lines that do not look
    /// like `"<tag>:<value>"` are skipped. A short or empty input simply
    /// yields fewer lines - truncation surfaces later, through the typed
    /// accessors.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut lines: Vec<&str> = text.trim().split("\r\n").collect();
        // The last line is the `ok` terminator (or a truncated fragment).
        lines.pop();

        let mut parsed = Vec::with_capacity(lines.len());
        for line in lines {
            let Some((tag_part, value_part)) = line.split_once(':') else {
                continue;
            };
            let Some(tag) = tag_part.trim().chars().next() else {
                continue;
            };
            let value_part = value_part.trim();
            let value = if value_part.eq_ignore_ascii_case("NAN") {
                None
            } else {
                match value_part.parse::<f64>() {
                    Ok(v) => Some(v),
                    Err(_) => continue,
                }
            };
            parsed.push((tag, value));
        }

        Self { lines: parsed }
    }

    /// Returns the decoded `(tag, value)` pairs in wire order.
    #[must_use]
    pub fn lines(&self) -> &[(char, Option<f64>)] {
        &self.lines
    }

    /// Returns the number of data lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true when no data lines were decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the value at `index`, `None` meaning the NAN sentinel.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingLine` when the answer has no line at
    /// `index` (a timed-out read delivered fewer lines than expected).
    pub fn float(&self, index: usize) -> Result<Option<f64>, ParseError> {
        self.lines
            .get(index)
            .map(|(_, v)| *v)
            .ok_or(ParseError::MissingLine { index })
    }

    /// Returns the value at `index` as an integer.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingLine` for an absent line and
    /// `ParseError::NotANumber` for the NAN sentinel.
    pub fn int(&self, index: usize) -> Result<i64, ParseError> {
        match self.float(index)? {
            // Device values are integers rendered with two decimals.
            #[allow(clippy::cast_possible_truncation)]
            Some(v) => Ok(v as i64),
            None => Err(ParseError::NotANumber { index }),
        }
    }

    /// Returns the value at `index` as a flag (non-zero means true).
    ///
    /// # Errors
    ///
    /// Same as [`Answer::int`].
    pub fn flag(&self, index: usize) -> Result<bool, ParseError> {
        Ok(self.int(index)? != 0)
    }

    /// Returns the tag character of the line at `index`, if present.
    #[must_use]
    pub fn tag(&self, index: usize) -> Option<char> {
        self.lines.get(index).map(|(t, _)| *t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value() {
        let answer = Answer::parse(b"V:42.00\r\nok\r\n");
        assert_eq!(answer.lines(), &[('V', Some(42.0))]);
    }

    #[test]
    fn nan_sentinel_decodes_as_none() {
        let answer = Answer::parse(b"S:NAN\r\nok\r\n");
        assert_eq!(answer.float(0).unwrap(), None);
        assert!(matches!(
            answer.int(0),
            Err(ParseError::NotANumber { index: 0 })
        ));
    }

    #[test]
    fn nan_is_case_insensitive() {
        let answer = Answer::parse(b"S:nan\r\nok\r\n");
        assert_eq!(answer.float(0).unwrap(), None);
    }

    #[test]
    fn multi_line_keeps_order() {
        let answer = Answer::parse(b"H:7.00\r\nM:30.00\r\nok\r\n");
        assert_eq!(answer.int(0).unwrap(), 7);
        assert_eq!(answer.int(1).unwrap(), 30);
        assert_eq!(answer.tag(0), Some('H'));
        assert_eq!(answer.tag(1), Some('M'));
    }

    #[test]
    fn empty_answer() {
        let answer = Answer::parse(b"");
        assert!(answer.is_empty());
        assert!(matches!(
            answer.float(0),
            Err(ParseError::MissingLine { index: 0 })
        ));
    }

    #[test]
    fn bare_ok_has_no_data_lines() {
        let answer = Answer::parse(b"ok\r\n");
        assert!(answer.is_empty());
    }

    #[test]
    fn truncated_answer_loses_last_line() {
        // No trailing `ok`: the fragment is treated as the terminator slot.
        let answer = Answer::parse(b"V:42.00\r\nM:3");
        assert_eq!(answer.len(), 1);
        assert_eq!(answer.int(0).unwrap(), 42);
    }

    #[test]
    fn flag_values() {
        let answer = Answer::parse(b"B:1.00\r\nok\r\n");
        assert!(answer.flag(0).unwrap());
        let answer = Answer::parse(b"B:0.00\r\nok\r\n");
        assert!(!answer.flag(0).unwrap());
    }

    #[test]
    fn garbage_lines_are_skipped() {
        let answer = Answer::parse(b"noise\r\nV:1.00\r\nok\r\n");
        assert_eq!(answer.len(), 1);
    }
}
