//! Shared configuration for the courier dispatch core.
//!
//! [`Config`] is assembled by `ortho_config` from defaults, an optional
//! configuration file, `COURIER_*` environment variables and command-line
//! flags, in increasing order of precedence. Every field is optional on the
//! wire; the accessor methods substitute the documented defaults.

mod channel;
mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use channel::{ChannelEndpoint, ChannelParseError};
pub use defaults::{
    DEFAULT_CHANNEL_NAME, DEFAULT_LOG_FILTER, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SLOW_CALLBACK_MS, DEFAULT_TCP_PORT, default_channel_endpoint, default_log_filter,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for the dispatch routers and their channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "COURIER")]
pub struct Config {
    /// Endpoint publishers connect to when delivering net commands.
    pub channel_endpoint: Option<ChannelEndpoint>,
    /// Logical name of the subscribed channel, used in logs.
    pub channel_name: Option<String>,
    /// Tracing filter expression.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Largest accepted net command payload, in bytes.
    pub max_payload_bytes: Option<usize>,
    /// Threshold in milliseconds above which a callback is reported as slow.
    pub slow_callback_ms: Option<u64>,
    /// Receive wait in milliseconds between stop-flag checks.
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    /// Endpoint publishers connect to.
    #[must_use]
    pub fn channel_endpoint(&self) -> ChannelEndpoint {
        self.channel_endpoint
            .clone()
            .unwrap_or_else(default_channel_endpoint)
    }

    /// Logical channel name.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        self.channel_name.as_deref().unwrap_or(DEFAULT_CHANNEL_NAME)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Largest accepted net command payload, in bytes.
    #[must_use]
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES)
    }

    /// Threshold above which a callback is reported as slow.
    #[must_use]
    pub fn slow_callback_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_callback_ms.unwrap_or(DEFAULT_SLOW_CALLBACK_MS))
    }

    /// Receive wait between stop-flag checks; never zero.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .filter(|interval| *interval > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }
}
