//! Address of the socket channel net commands arrive on.
//!
//! Endpoints are written as URLs in every configuration layer, so the same
//! text works in a file, in `COURIER_CHANNEL_ENDPOINT` and on the command
//! line: `tcp://127.0.0.1:9780` or `unix:///run/user/1000/courier/courier.sock`.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::DEFAULT_TCP_PORT;

/// Channel publishers deliver net commands on.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum ChannelEndpoint {
    /// Unix domain socket endpoint.
    Unix {
        /// Filesystem path of the socket.
        path: Utf8PathBuf,
    },
    /// TCP socket endpoint.
    Tcp {
        /// Host name or address to bind.
        host: String,
        /// Port to bind; `0` asks the OS for an ephemeral port.
        port: u16,
    },
}

impl ChannelEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns the Unix socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Tcp { .. } => None,
        }
    }
}

impl fmt::Display for ChannelEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for ChannelEndpoint {
    type Err = ChannelParseError;

    /// Parses `tcp://host[:port]` or `unix:///absolute/path`.
    ///
    /// A TCP endpoint without a port listens on [`DEFAULT_TCP_PORT`].
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input.trim())?;
        match url.scheme() {
            "unix" => {
                if url.host_str().is_some_and(|host| !host.is_empty()) {
                    return Err(ChannelParseError::RelativeUnixPath(input.to_owned()));
                }
                let path = url.path();
                if path.is_empty() || path == "/" {
                    return Err(ChannelParseError::MissingUnixPath(input.to_owned()));
                }
                Ok(Self::unix(path))
            }
            "tcp" => {
                let host = url
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| ChannelParseError::MissingHost(input.to_owned()))?;
                Ok(Self::tcp(host, url.port().unwrap_or(DEFAULT_TCP_PORT)))
            }
            other => Err(ChannelParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

impl TryFrom<String> for ChannelEndpoint {
    type Error = ChannelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelEndpoint> for String {
    fn from(endpoint: ChannelEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors encountered while parsing a [`ChannelEndpoint`] from text.
#[derive(Debug, Error)]
pub enum ChannelParseError {
    /// Scheme was neither `tcp` nor `unix`.
    #[error("unsupported channel scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// Unix socket path was written as `unix://name` rather than `unix:///path`.
    #[error("Unix socket path in '{0}' must be absolute")]
    RelativeUnixPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
