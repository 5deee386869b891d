//! Caller identities for local command dispatch.

use std::fmt;

/// Classified origin of a local command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SenderKind {
    /// The host's interactive console.
    Console,
    /// An automated block or script source.
    Block,
    /// A connected player.
    Player,
    /// A caller the host could not classify; never matches a declared kind.
    Unknown,
}

impl SenderKind {
    /// Classifies a caller by querying its capabilities.
    pub fn classify(sender: &dyn CommandSender) -> Self {
        sender.kind()
    }

    /// Returns the canonical string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Block => "block",
            Self::Player => "player",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SenderKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Host-supplied identity of whoever issued a local command.
///
/// The host owns permission and messaging semantics; the router only asks
/// whether a permission is held and hands back text for the caller.
pub trait CommandSender {
    /// Display name used in logs.
    fn name(&self) -> String;

    /// Capability classification of this caller.
    ///
    /// Callers the host cannot place report [`SenderKind::Unknown`].
    fn kind(&self) -> SenderKind {
        SenderKind::Unknown
    }

    /// Returns `true` when the caller holds `permission`.
    fn has_permission(&self, permission: &str) -> bool;

    /// Delivers a feedback line to the caller.
    fn send_message(&self, message: &str);
}
