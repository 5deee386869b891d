//! Accepted publisher connections and their line framing.

use std::io::{self, Read};
use std::net::TcpStream;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Stream types accepted by the channel listener.
pub(super) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    /// Switches to blocking reads that give up after `timeout`.
    pub(super) fn poll_with(&self, timeout: Duration) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => {
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(Some(timeout))
            }
            #[cfg(unix)]
            Self::Unix(stream) => {
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(Some(timeout))
            }
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

/// Progress of a [`LineReader`].
#[derive(Debug, PartialEq, Eq)]
pub(super) enum LineEvent {
    /// One complete line, newline included when present.
    Line(Vec<u8>),
    /// The read timed out with no complete line buffered.
    Idle,
    /// The peer closed the connection.
    Closed,
}

/// Splits a byte stream into newline-terminated payloads of bounded size.
pub(super) struct LineReader<R> {
    stream: R,
    buffer: Vec<u8>,
    max_line_bytes: usize,
}

impl<R: Read> LineReader<R> {
    pub(super) fn new(stream: R, max_line_bytes: usize) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            max_line_bytes,
        }
    }

    /// Returns the next line, an idle tick or end of stream.
    ///
    /// A final unterminated line is returned before [`LineEvent::Closed`].
    pub(super) fn next_event(&mut self) -> io::Result<LineEvent> {
        let mut chunk = [0_u8; 1024];
        loop {
            if let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=position).collect();
                return Ok(LineEvent::Line(line));
            }
            if self.buffer.len() > self.max_line_bytes {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "line exceeds maximum payload size",
                ));
            }
            match self.stream.read(&mut chunk) {
                Ok(0) if self.buffer.is_empty() => return Ok(LineEvent::Closed),
                Ok(0) => return Ok(LineEvent::Line(std::mem::take(&mut self.buffer))),
                Ok(read) => self.buffer.extend_from_slice(&chunk[..read]),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(LineEvent::Idle);
                }
                Err(error) => return Err(error),
            }
        }
    }
}
