// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request/response writer with answer framing.
//!
//! [`CommandWriter`] sends one encoded line at a time over a
//! [`Transport`](super::Transport) and, when configured to wait, collects
//! the framed answer: it reads byte by byte until the expected number of
//! newline-terminated lines arrived, the channel went idle, or a byte
//! budget ran out. The byte budget is a defensive bound against a hung or
//! chattering device that never sends the expected terminator.

use std::time::Duration;

use crate::command::Answer;
use crate::error::Error;
use crate::protocol::Transport;

/// Observer for outgoing lines (raw text, newline included).
pub type WriteObserver = Box<dyn Fn(&str) + Send>;

/// Observer for raw incoming answers.
pub type AnswerObserver = Box<dyn Fn(&[u8]) + Send>;

/// Per-call tuning for [`CommandWriter::send`].
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    /// Number of newline-terminated lines the answer is expected to have,
    /// terminator (`ok`) line included.
    pub answer_lines: usize,
    /// Scoped read-timeout override; the transport's previous timeout is
    /// restored after the call, even on error.
    pub timeout: Option<Duration>,
    /// Upper bound on bytes read for one answer.
    pub max_bytes: usize,
}

impl SendOptions {
    /// Expects `answer_lines` lines with the default byte budget.
    #[must_use]
    pub fn lines(answer_lines: usize) -> Self {
        Self {
            answer_lines,
            ..Self::default()
        }
    }

    /// Sets the scoped read-timeout override.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the byte budget.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            answer_lines: 1,
            timeout: None,
            max_bytes: 100,
        }
    }
}

/// Sends encoded command lines and frames their answers.
///
/// A writer either waits for answers (connected to live hardware or the
/// emulator) or runs write-only (generating a `.gcode` file with no device
/// attached); the flag is fixed at construction. Observer hooks see every
/// outgoing line and raw answer for logging, and never influence control
/// flow.
pub struct CommandWriter<T: Transport> {
    transport: T,
    wait_for_answer: bool,
    idle_timeout: Duration,
    mocked_answer: Option<Vec<u8>>,
    write_observer: Option<WriteObserver>,
    answer_observer: Option<AnswerObserver>,
}

impl<T: Transport> CommandWriter<T> {
    /// Default idle timeout applied when neither the call nor the transport
    /// carries one.
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

    /// Creates a write-only writer over the given transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            wait_for_answer: false,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            mocked_answer: None,
            write_observer: None,
            answer_observer: None,
        }
    }

    /// Enables or disables waiting for answers.
    #[must_use]
    pub fn with_wait_for_answer(mut self, wait: bool) -> Self {
        self.wait_for_answer = wait;
        self
    }

    /// Sets the fallback idle timeout.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Installs an observer for outgoing lines.
    pub fn set_write_observer(&mut self, observer: WriteObserver) {
        self.write_observer = Some(observer);
    }

    /// Installs an observer for raw answers.
    pub fn set_answer_observer(&mut self, observer: AnswerObserver) {
        self.answer_observer = Some(observer);
    }

    /// Returns whether this writer waits for answers.
    #[must_use]
    pub fn waits_for_answer(&self) -> bool {
        self.wait_for_answer
    }

    /// Queues raw bytes to be returned by the next `send` instead of
    /// touching the transport. Consumed by that one call.
    pub fn mock_answer(&mut self, answer: impl Into<Vec<u8>>) {
        self.mocked_answer = Some(answer.into());
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the underlying transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Closes the underlying transport.
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Sends one line (newline appended) and returns the raw answer bytes,
    /// or `None` when running write-only.
    ///
    /// A queued mocked answer is returned without touching the transport.
    /// A timed-out read is not an error: the answer simply comes back with
    /// fewer lines than expected.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` when the channel fails to write or read.
    pub async fn send(&mut self, line: &str, opts: SendOptions) -> Result<Option<Vec<u8>>, Error> {
        let data = format!("{line}\n");

        tracing::debug!(line, "sending command");
        if let Some(observer) = &self.write_observer {
            observer(&data);
        }

        if let Some(mock) = self.mocked_answer.take() {
            return Ok(Some(mock));
        }

        // Scoped read-timeout override; restore even when the exchange
        // errors out.
        let previous_timeout = opts.timeout.map(|timeout| {
            let previous = self.transport.read_timeout();
            self.transport.set_read_timeout(Some(timeout));
            previous
        });

        let result = self.exchange(data.as_bytes(), opts).await;

        if let Some(previous) = previous_timeout {
            self.transport.set_read_timeout(previous);
        }

        let answer = result?;
        if let Some(answer) = &answer {
            tracing::debug!(bytes = answer.len(), "received answer");
            if let Some(observer) = &self.answer_observer {
                observer(answer);
            }
        }
        Ok(answer)
    }

    /// Sends one line and decodes the framed answer, or returns `None` when
    /// running write-only.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` when the channel fails.
    pub async fn send_and_parse(
        &mut self,
        line: &str,
        opts: SendOptions,
    ) -> Result<Option<Answer>, Error> {
        let raw = self.send(line, opts).await?;
        Ok(raw.map(|bytes| Answer::parse(&bytes)))
    }

    async fn exchange(&mut self, data: &[u8], opts: SendOptions) -> Result<Option<Vec<u8>>, Error> {
        self.transport.write(data).await.map_err(Error::Transport)?;
        if !self.wait_for_answer {
            return Ok(None);
        }

        let idle = opts
            .timeout
            .or_else(|| self.transport.read_timeout())
            .unwrap_or(self.idle_timeout);

        let mut received = Vec::new();
        let mut lines_left = opts.answer_lines.max(1);
        for _ in 0..opts.max_bytes {
            let chunk = match tokio::time::timeout(idle, self.transport.read(1)).await {
                Ok(read) => read.map_err(Error::Transport)?,
                // Channel went idle: hand back whatever arrived.
                Err(_) => break,
            };
            let Some(&byte) = chunk.first() else {
                break;
            };
            received.push(byte);
            if byte == b'\n' {
                lines_left -= 1;
                if lines_left == 0 {
                    break;
                }
            }
        }

        Ok(Some(received))
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for CommandWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandWriter")
            .field("transport", &self.transport)
            .field("wait_for_answer", &self.wait_for_answer)
            .field("idle_timeout", &self.idle_timeout)
            .field("mocked_answer", &self.mocked_answer.is_some())
            .finish_non_exhaustive()
    }
}
