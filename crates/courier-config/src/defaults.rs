#[cfg(unix)]
use camino::Utf8PathBuf;
#[cfg(unix)]
use dirs::runtime_dir;

use crate::channel::ChannelEndpoint;
use crate::logging::LogFormat;

/// Default TCP port used when Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 9780;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default name of the channel net commands are published on.
pub const DEFAULT_CHANNEL_NAME: &str = "courier";

/// Largest accepted net command payload, in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Callbacks running longer than this many milliseconds are reported.
pub const DEFAULT_SLOW_CALLBACK_MS: u64 = 250;

/// How long the dispatch worker waits for a message before rechecking its stop flag.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Computes the default channel endpoint.
#[must_use]
pub fn default_channel_endpoint() -> ChannelEndpoint {
    default_channel_endpoint_inner()
}

#[cfg(unix)]
fn default_channel_endpoint_inner() -> ChannelEndpoint {
    let mut base = runtime_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory);
    base.push("courier");
    ChannelEndpoint::unix(base.join("courier.sock"))
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir()).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(not(unix))]
fn default_channel_endpoint_inner() -> ChannelEndpoint {
    ChannelEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
