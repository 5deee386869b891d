//! Error types shared by the local and distributed routers.
//!
//! [`DispatchError`] covers failures the routers own: malformed payloads,
//! unresolved commands, failed validation and poisoned registries.
//! [`CommandError`] is what handler code returns when it cannot complete, and
//! [`HandlerFault`] is the record the routers log and report after catching a
//! failing or panicking handler.

use std::fmt;
use std::io;
use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the dispatch routers.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Payload could not be decoded as JSON.
    #[error("malformed payload: {message}")]
    MalformedPayload {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Payload JSON does not match the `{command, data}` envelope.
    #[error("invalid payload structure: {message}")]
    InvalidStructure { message: String },

    /// Payload exceeds the configured size limit.
    #[error("payload too large: {size} bytes exceeds {max_size} byte limit")]
    PayloadTooLarge { size: usize, max_size: usize },

    /// No handler is registered under the command name.
    #[error("no handler registered for command '{command}'")]
    UnknownCommand { command: String },

    /// Payload data lacks fields the command declares as required.
    #[error("command '{command}' is missing required fields: {}", .missing.join(", "))]
    MissingArguments { command: String, missing: Vec<String> },

    /// Serialising an outbound payload failed.
    #[error("failed to serialise payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// IO error while spawning or driving the dispatch worker.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (e.g., lock poisoned).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Creates a malformed payload error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedPayload {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed payload error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Creates a payload too large error.
    pub fn payload_too_large(size: usize, max_size: usize) -> Self {
        Self::PayloadTooLarge { size, max_size }
    }

    /// Creates an unknown command error.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Self::UnknownCommand {
            command: command.into(),
        }
    }

    /// Creates a missing arguments error.
    pub fn missing_arguments(command: impl Into<String>, missing: Vec<String>) -> Self {
        Self::MissingArguments {
            command: command.into(),
            missing,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for parse failures of an inbound payload.
    pub fn is_parse_fault(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload { .. }
                | Self::InvalidStructure { .. }
                | Self::PayloadTooLarge { .. }
        )
    }
}

/// Failure reported by handler code.
///
/// The constructor records the caller's source location so a fault can be
/// traced back to the handler line that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
    location: &'static Location<'static>,
}

impl CommandError {
    /// Creates an error located at the caller.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Human-readable failure description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Source location that created the error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// How a handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The handler returned a [`CommandError`].
    Error,
    /// The handler panicked.
    Panic,
}

impl FaultKind {
    /// Short label used in logs and caller-facing messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "CommandError",
            Self::Panic => "Panic",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A handler failure caught at a router boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} in {handler} while running '{command}': {message}")]
pub struct HandlerFault {
    command: String,
    handler: &'static str,
    kind: FaultKind,
    message: String,
    location: Option<String>,
}

impl HandlerFault {
    pub(crate) fn new(
        command: impl Into<String>,
        handler: &'static str,
        kind: FaultKind,
        message: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            command: command.into(),
            handler,
            kind,
            message: message.into(),
            location,
        }
    }

    /// Command whose handler failed.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Type name of the failing handler.
    pub fn handler(&self) -> &'static str {
        self.handler
    }

    /// Whether the handler returned an error or panicked.
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Failure description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Originating `file:line`, when known.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}
