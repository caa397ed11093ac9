// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration for the link and its supervisor.
//!
//! Everything that differs between installations or firmware revisions lives
//! here: address, framing, the input catalog, and timing. Types can be built
//! in code with `with_*` methods or loaded from JSON, where durations are
//! written as whole seconds.
//!
//! # Examples
//!
//! ```
//! use mcintosh_lib::config::SupervisorConfig;
//! use mcintosh_lib::protocol::Framing;
//!
//! let config = SupervisorConfig::from_json(r#"{
//!     "host": "192.168.1.60",
//!     "framing": "line",
//!     "poll_interval": 60
//! }"#).unwrap();
//!
//! assert_eq!(config.link().port(), 84);
//! assert_eq!(config.link().framing(), Framing::Line);
//! assert_eq!(config.poll_interval().as_secs(), 60);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::Framing;
use crate::types::SourceMap;

/// Connection parameters for a single preamplifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    framing: Framing,
    #[serde(default)]
    sources: SourceMap,
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    connect_timeout: Duration,
}

impl LinkConfig {
    /// Default control port.
    pub const DEFAULT_PORT: u16 = 84;
    /// Default bound on opening the TCP connection.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration for the given host with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            framing: Framing::default(),
            sources: SourceMap::default(),
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Loads a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the JSON is malformed or lacks `host`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the wire framing.
    #[must_use]
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Sets the input source catalog.
    #[must_use]
    pub fn with_sources(mut self, sources: SourceMap) -> Self {
        self.sources = sources;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
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

    /// Returns the wire framing.
    #[must_use]
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Returns the input source catalog.
    #[must_use]
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Returns the connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration for the connection supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(flatten)]
    link: LinkConfig,
    #[serde(default = "default_poll_interval", with = "duration_secs")]
    poll_interval: Duration,
    #[serde(default)]
    reconnection: ReconnectionPolicy,
}

impl SupervisorConfig {
    /// Default interval between status polls.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

    /// Creates a supervisor configuration around a link configuration.
    #[must_use]
    pub fn new(link: LinkConfig) -> Self {
        Self {
            link,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            reconnection: ReconnectionPolicy::default(),
        }
    }

    /// Loads a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the JSON is malformed or lacks `host`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the status poll interval.
    ///
    /// `Duration::ZERO` turns periodic polling off; the supervisor then only
    /// queries the device after a connect or on an explicit refresh.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Returns the link configuration.
    #[must_use]
    pub fn link(&self) -> &LinkConfig {
        &self.link
    }

    /// Returns the status poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the reconnection policy.
    #[must_use]
    pub fn reconnection(&self) -> &ReconnectionPolicy {
        &self.reconnection
    }
}

/// Configuration for automatic reconnection.
///
/// Retries never give up while enabled. The default waits a fixed five
/// seconds before every attempt; a multiplier above 1.0 turns that into an
/// exponential backoff capped at `max_delay`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use mcintosh_lib::config::ReconnectionPolicy;
///
/// let policy = ReconnectionPolicy::default();
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(5));
/// assert_eq!(policy.delay_for_attempt(7), Duration::from_secs(5));
///
/// let policy = ReconnectionPolicy::new()
///     .with_delay(Duration::from_secs(1))
///     .with_backoff_multiplier(2.0)
///     .with_max_delay(Duration::from_secs(10));
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectionPolicy {
    /// Whether automatic reconnection is enabled.
    pub enabled: bool,
    /// Delay before each reconnect attempt.
    #[serde(with = "duration_secs")]
    pub delay: Duration,
    /// Upper bound on the delay when backing off.
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
    /// Multiplier applied per failed attempt.
    pub backoff_multiplier: f32,
}

impl ReconnectionPolicy {
    /// Creates a new reconnection policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disabled reconnection policy.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the delay before each attempt.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the maximum delay between attempts.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay before a given attempt (0-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.backoff_multiplier <= 1.0 {
            return self.delay;
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.delay.as_millis() as f32 * multiplier;

        // delay_ms is positive; saturating cast handles overflow to infinity
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 1.0,
        }
    }
}

fn default_port() -> u16 {
    LinkConfig::DEFAULT_PORT
}

fn default_connect_timeout() -> Duration {
    LinkConfig::DEFAULT_CONNECT_TIMEOUT
}

fn default_poll_interval() -> Duration {
    SupervisorConfig::DEFAULT_POLL_INTERVAL
}

/// Durations as whole seconds in configuration files.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
