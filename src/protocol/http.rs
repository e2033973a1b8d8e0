// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP serial-relay transport.
//!
//! The growbox itself only speaks serial; a small relay board next to it
//! exposes that port over HTTP at `/api.c`. Writing is
//! `action=send_to_serial` with the line in `string_data`; reading is
//! `action=timeout_read` with the bound in `ms`. Both answer a JSON body
//! whose `data.string_response_data` field carries whatever the device sent
//! back. The relay may return bytes on either call, so everything received
//! goes through one local accumulator that reads drain from.

use std::collections::VecDeque;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::TransportError;
use crate::protocol::Transport;

// ============================================================================
// RelayConfig
// ============================================================================

/// Configuration for an HTTP serial relay.
///
/// # Examples
///
/// ```
/// use growbox_lib::protocol::RelayConfig;
/// use std::time::Duration;
///
/// let config = RelayConfig::new("192.168.1.100");
///
/// let config = RelayConfig::new("192.168.1.100")
///     .with_port(8080)
///     .with_request_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct RelayConfig {
    host: String,
    port: u16,
    request_timeout: Duration,
    read_timeout: Duration,
}

impl RelayConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default whole-request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default serial read bound passed to `timeout_read`.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

    /// Creates a configuration for the given relay host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the whole-request timeout.
    ///
    /// Must comfortably exceed the serial read bound, or requests get cut
    /// off while the relay is still waiting on the device.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the initial serial read bound.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Builds the relay endpoint URL from this configuration.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        let host = &self.host;
        if host.starts_with("http://") || host.starts_with("https://") {
            return format!("{host}/api.c");
        }
        if self.port == Self::DEFAULT_PORT {
            format!("http://{host}/api.c")
        } else {
            format!("http://{host}:{}/api.c", self.port)
        }
    }

    /// Creates an [`HttpRelay`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the HTTP client cannot be built.
    pub fn into_relay(self) -> Result<HttpRelay, TransportError> {
        let client = Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(TransportError::Http)?;

        Ok(HttpRelay {
            url: self.endpoint_url(),
            client,
            read_timeout: Some(self.read_timeout),
            received: VecDeque::new(),
        })
    }
}

// ============================================================================
// HttpRelay
// ============================================================================

/// JSON envelope the relay wraps every response in.
#[derive(Debug, Default, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    data: RelayData,
}

#[derive(Debug, Default, Deserialize)]
struct RelayData {
    #[serde(default)]
    string_response_data: String,
}

/// [`Transport`](super::Transport) over an HTTP serial relay.
///
/// # Examples
///
/// ```no_run
/// use growbox_lib::protocol::{CommandWriter, RelayConfig};
/// use growbox_lib::Growbox;
///
/// # async fn example() -> growbox_lib::Result<()> {
/// let relay = RelayConfig::new("192.168.1.100").into_relay()?;
/// let writer = CommandWriter::new(relay).with_wait_for_answer(true);
/// let mut growbox = Growbox::new(writer);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpRelay {
    url: String,
    client: Client,
    read_timeout: Option<Duration>,
    received: VecDeque<u8>,
}

impl HttpRelay {
    /// Creates a relay transport for the given host with default settings.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the HTTP client cannot be built.
    pub fn new(host: impl Into<String>) -> Result<Self, TransportError> {
        RelayConfig::new(host).into_relay()
    }

    /// Returns the relay endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&mut self, query: &[(&str, &str)]) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.url)
            .query(query)
            .send()
            .await
            .map_err(TransportError::Http)?;

        if !response.status().is_success() {
            return Err(TransportError::ConnectionFailed(format!(
                "relay answered HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: RelayResponse = response.json().await.map_err(TransportError::Http)?;
        if !body.data.string_response_data.is_empty() {
            tracing::debug!(
                bytes = body.data.string_response_data.len(),
                "relay forwarded serial data"
            );
            self.received.extend(body.data.string_response_data.as_bytes());
        }
        Ok(())
    }
}

impl Transport for HttpRelay {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(data).into_owned();
        self.request(&[("action", "send_to_serial"), ("string_data", &text)])
            .await
    }

    async fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        if self.received.is_empty() {
            let bound = self
                .read_timeout
                .unwrap_or(RelayConfig::DEFAULT_READ_TIMEOUT);
            let ms = bound.as_millis().to_string();
            self.request(&[("action", "timeout_read"), ("ms", &ms)]).await?;
        }

        let take = self.received.len().min(max_len);
        Ok(self.received.drain(..take).collect())
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_default_port() {
        let config = RelayConfig::new("192.168.1.100");
        assert_eq!(config.endpoint_url(), "http://192.168.1.100/api.c");
    }

    #[test]
    fn endpoint_url_custom_port() {
        let config = RelayConfig::new("192.168.1.100").with_port(8080);
        assert_eq!(config.endpoint_url(), "http://192.168.1.100:8080/api.c");
    }

    #[test]
    fn endpoint_url_explicit_scheme() {
        let config = RelayConfig::new("https://relay.local");
        assert_eq!(config.endpoint_url(), "https://relay.local/api.c");
    }

    #[test]
    fn config_defaults() {
        let config = RelayConfig::new("relay.local");
        assert_eq!(config.host(), "relay.local");
        assert_eq!(config.port(), RelayConfig::DEFAULT_PORT);
    }

    #[test]
    fn into_relay_carries_read_timeout() {
        let relay = RelayConfig::new("relay.local")
            .with_read_timeout(Duration::from_millis(500))
            .into_relay()
            .unwrap();
        assert_eq!(relay.read_timeout(), Some(Duration::from_millis(500)));
    }
}
