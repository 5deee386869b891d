//! Socket-backed subscription.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use courier_config::{ChannelEndpoint, Config};
use tracing::{debug, info, warn};

use crate::net::{Subscription, SubscriptionError};

use super::stream::{ConnectionStream, LineEvent, LineReader};
use super::{TRANSPORT_TARGET, TransportError};

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const CONNECTION_POLL: Duration = Duration::from_millis(100);
const QUEUE_CAPACITY: usize = 1024;
const ACCEPT_THREAD: &str = "courier-channel-accept";
const CONNECTION_THREAD: &str = "courier-channel-conn";

/// Subscription fed by publishers connecting to a socket endpoint.
///
/// Each connection carries newline-delimited payloads. Lines are queued in
/// arrival order per connection; a connection sending a line longer than the
/// payload limit is closed. Dropping the subscription stops the accept loop
/// and removes a Unix socket file.
pub struct SocketSubscription {
    endpoint: ChannelEndpoint,
    local_addr: Option<SocketAddr>,
    queue: Receiver<Vec<u8>>,
    shutdown: Arc<AtomicBool>,
    accept: Option<thread::JoinHandle<()>>,
}

impl SocketSubscription {
    /// Prepares and binds the configured channel endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the socket directory cannot be created
    /// or the endpoint cannot be bound.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let endpoint = config.channel_endpoint();
        prepare_socket_directory(&endpoint)?;
        Self::bind(&endpoint, config.max_payload_bytes())
    }

    /// Binds `endpoint` and starts accepting publishers.
    ///
    /// A stale Unix socket left by a dead process is replaced; a live one is
    /// reported as [`TransportError::UnixInUse`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the endpoint cannot be bound or the
    /// accept thread cannot be spawned.
    pub fn bind(endpoint: &ChannelEndpoint, max_payload_bytes: usize) -> Result<Self, TransportError> {
        let listener = ListenerKind::bind(endpoint)?;
        let local_addr = listener.local_addr();
        let (sender, queue) = mpsc::sync_channel(QUEUE_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let acceptor = Acceptor {
            endpoint: endpoint.clone(),
            listener,
            sender,
            shutdown: Arc::clone(&shutdown),
            max_line_bytes: max_payload_bytes,
        };
        acceptor
            .listener
            .set_nonblocking()
            .map_err(|source| TransportError::NonBlocking { source })?;

        let accept = thread::Builder::new()
            .name(ACCEPT_THREAD.to_owned())
            .spawn(move || acceptor.run())
            .map_err(|source| TransportError::Spawn {
                thread: ACCEPT_THREAD,
                source,
            })?;

        Ok(Self {
            endpoint: endpoint.clone(),
            local_addr,
            queue,
            shutdown,
            accept: Some(accept),
        })
    }

    /// Bound endpoint.
    pub fn endpoint(&self) -> &ChannelEndpoint {
        &self.endpoint
    }

    /// Bound TCP address, resolving an ephemeral port; `None` for Unix sockets.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stops accepting publishers and waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ThreadPanic`] if the accept loop panicked.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        self.shutdown.store(true, Ordering::SeqCst);
        match self.accept.take() {
            Some(handle) => handle.join().map_err(|_| TransportError::ThreadPanic {
                thread: ACCEPT_THREAD,
            }),
            None => Ok(()),
        }
    }
}

impl Subscription for SocketSubscription {
    fn receive(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, SubscriptionError> {
        match self.queue.recv_timeout(wait) {
            Ok(payload) => Ok(Some(payload)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SubscriptionError::Disconnected),
        }
    }
}

impl Drop for SocketSubscription {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(target: TRANSPORT_TARGET, error = %error, "channel listener did not stop cleanly");
        }
    }
}

enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl ListenerKind {
    fn bind(endpoint: &ChannelEndpoint) -> Result<Self, TransportError> {
        match endpoint {
            ChannelEndpoint::Tcp { host, port } => bind_tcp(host, *port).map(Self::Tcp),
            #[cfg(unix)]
            ChannelEndpoint::Unix { path } => bind_unix(path.as_std_path()).map(Self::Unix),
            #[cfg(not(unix))]
            ChannelEndpoint::Unix { .. } => Err(TransportError::UnsupportedUnix {
                endpoint: endpoint.to_string(),
            }),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Self::Unix(_) => None,
        }
    }

    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    fn accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match self {
            Self::Tcp(listener) => listener
                .accept()
                .map(|(stream, _)| ConnectionStream::Tcp(stream)),
            #[cfg(unix)]
            Self::Unix(listener) => listener
                .accept()
                .map(|(stream, _)| ConnectionStream::Unix(stream)),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

struct Acceptor {
    endpoint: ChannelEndpoint,
    listener: ListenerKind,
    sender: SyncSender<Vec<u8>>,
    shutdown: Arc<AtomicBool>,
    max_line_bytes: usize,
}

impl Acceptor {
    fn run(self) {
        info!(target: TRANSPORT_TARGET, endpoint = %self.endpoint, "channel listener active");
        let mut last_error = None::<io::ErrorKind>;
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok(Some(stream)) => {
                    last_error = None;
                    self.serve(stream);
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    if last_error != Some(error.kind()) {
                        warn!(target: TRANSPORT_TARGET, error = %error, "channel accept error");
                    }
                    last_error = Some(error.kind());
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        info!(target: TRANSPORT_TARGET, endpoint = %self.endpoint, "channel listener stopped");
    }

    fn serve(&self, stream: ConnectionStream) {
        if let Err(error) = stream.poll_with(CONNECTION_POLL) {
            warn!(target: TRANSPORT_TARGET, error = %error, "could not configure publisher connection");
            return;
        }
        let connection = Connection {
            reader: LineReader::new(stream, self.max_line_bytes),
            sender: self.sender.clone(),
            shutdown: Arc::clone(&self.shutdown),
        };
        if let Err(error) = thread::Builder::new()
            .name(CONNECTION_THREAD.to_owned())
            .spawn(move || connection.run())
        {
            warn!(target: TRANSPORT_TARGET, error = %error, "could not spawn publisher connection thread");
        }
    }
}

impl Drop for Acceptor {
    fn drop(&mut self) {
        #[cfg(unix)]
        cleanup_unix_socket(&self.endpoint);
    }
}

struct Connection {
    reader: LineReader<ConnectionStream>,
    sender: SyncSender<Vec<u8>>,
    shutdown: Arc<AtomicBool>,
}

impl Connection {
    fn run(mut self) {
        debug!(target: TRANSPORT_TARGET, "publisher connected");
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.reader.next_event() {
                Ok(LineEvent::Line(line)) => {
                    if line.trim_ascii().is_empty() {
                        continue;
                    }
                    if self.sender.send(line).is_err() {
                        return;
                    }
                }
                Ok(LineEvent::Idle) => {}
                Ok(LineEvent::Closed) => {
                    debug!(target: TRANSPORT_TARGET, "publisher disconnected");
                    return;
                }
                Err(error) => {
                    warn!(target: TRANSPORT_TARGET, error = %error, "closing publisher connection");
                    return;
                }
            }
        }
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, TransportError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?
        .next()
        .ok_or_else(|| TransportError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| TransportError::BindTcp { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Path) -> Result<UnixListener, TransportError> {
    let display = || path.display().to_string();
    if path.exists() {
        let metadata = fs::symlink_metadata(path).map_err(|source| TransportError::UnixMetadata {
            path: display(),
            source,
        })?;
        if !metadata.file_type().is_socket() {
            return Err(TransportError::UnixNotSocket { path: display() });
        }
        match UnixStream::connect(path) {
            Ok(_live) => return Err(TransportError::UnixInUse { path: display() }),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                ) =>
            {
                debug!(target: TRANSPORT_TARGET, path = %path.display(), "removing stale unix channel");
                fs::remove_file(path).map_err(|source| TransportError::UnixCleanup {
                    path: display(),
                    source,
                })?;
            }
            Err(source) => {
                return Err(TransportError::UnixConnect {
                    path: display(),
                    source,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| TransportError::BindUnix {
        path: display(),
        source,
    })
}

/// Creates the directory holding a Unix socket, owner-only on Unix.
///
/// TCP endpoints need nothing and succeed immediately.
fn prepare_socket_directory(endpoint: &ChannelEndpoint) -> Result<(), TransportError> {
    let Some(path) = endpoint.unix_path() else {
        return Ok(());
    };
    let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
        return Err(TransportError::MissingSocketDirectory {
            path: path.to_path_buf(),
        });
    };

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    match builder.create(parent.as_std_path()) {
        Ok(()) => {
            debug!(target: TRANSPORT_TARGET, directory = %parent, "prepared unix channel directory");
            Ok(())
        }
        Err(source) if source.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(TransportError::SocketDirectory {
            path: parent.to_path_buf(),
            source,
        }),
    }
}

#[cfg(unix)]
fn cleanup_unix_socket(endpoint: &ChannelEndpoint) {
    let Some(path) = endpoint.unix_path() else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: TRANSPORT_TARGET,
            error = %error,
            path = %path,
            "failed to remove unix channel socket"
        );
    }
}
