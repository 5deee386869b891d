//! Error types for the socket transport.

use std::io;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while binding or running the socket transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A Unix endpoint path has no directory to hold the socket.
    #[error("unix channel path '{path}' has no parent directory")]
    MissingSocketDirectory {
        /// Offending socket path.
        path: Utf8PathBuf,
    },
    /// The directory holding a Unix socket could not be created.
    #[error("could not create unix channel directory '{path}': {source}")]
    SocketDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Filesystem error.
        #[source]
        source: io::Error,
    },
    /// The TCP host name did not resolve.
    #[error("could not resolve {host}:{port}: {source}")]
    Resolve {
        /// Host that failed to resolve.
        host: String,
        /// Requested port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// The TCP host name resolved to no address.
    #[error("{host}:{port} resolved to no addresses")]
    ResolveEmpty {
        /// Host that resolved to nothing.
        host: String,
        /// Requested port.
        port: u16,
    },
    /// Binding the TCP socket failed.
    #[error("could not bind TCP channel at {addr}: {source}")]
    BindTcp {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Bind error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("could not make the channel listener non-blocking: {source}")]
    NonBlocking {
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[cfg(not(unix))]
    #[error("unix channel endpoints are unsupported here: {endpoint}")]
    UnsupportedUnix {
        /// Rejected endpoint.
        endpoint: String,
    },
    /// Binding the Unix socket failed.
    #[cfg(unix)]
    #[error("could not bind unix channel at {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: String,
        /// Bind error.
        #[source]
        source: io::Error,
    },
    /// Another process is listening on the Unix socket.
    #[cfg(unix)]
    #[error("unix channel {path} is already in use")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// The Unix socket path exists but is not a socket.
    #[cfg(unix)]
    #[error("{path} exists and is not a socket")]
    UnixNotSocket {
        /// Offending path.
        path: String,
    },
    /// Metadata of an existing Unix socket path could not be read.
    #[cfg(unix)]
    #[error("could not inspect unix channel {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: String,
        /// Metadata error.
        #[source]
        source: io::Error,
    },
    /// Probing an existing Unix socket failed unexpectedly.
    #[cfg(unix)]
    #[error("could not probe existing unix channel {path}: {source}")]
    UnixConnect {
        /// Socket path.
        path: String,
        /// Connect error.
        #[source]
        source: io::Error,
    },
    /// A stale Unix socket could not be removed.
    #[cfg(unix)]
    #[error("could not remove stale unix channel {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: String,
        /// Removal error.
        #[source]
        source: io::Error,
    },
    /// A background thread could not be spawned.
    #[error("could not spawn {thread}: {source}")]
    Spawn {
        /// Thread name.
        thread: &'static str,
        /// Spawn error.
        #[source]
        source: io::Error,
    },
    /// A background thread panicked.
    #[error("{thread} thread panicked")]
    ThreadPanic {
        /// Thread name.
        thread: &'static str,
    },
}
