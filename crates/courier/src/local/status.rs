//! Outcomes returned by local command handlers.

use std::fmt;

/// Status a handler reports for one invocation.
///
/// The router raises [`CommandStatus::WrongTarget`] and
/// [`CommandStatus::NoPermission`] itself before invoking a handler; every
/// other status originates from handler code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// The command completed.
    Success,
    /// The command ran but did not achieve its goal.
    Failure,
    /// The caller's kind is not allowed to run the command.
    WrongTarget,
    /// The caller lacks the command's permission.
    NoPermission,
    /// The caller asked for, or needs, the usage line.
    Help,
    /// The argument tokens were not acceptable.
    InvalidArgs,
    /// The command requires the caller to confirm before it proceeds.
    NeedsConfirmation,
}

impl CommandStatus {
    /// Returns the canonical string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::WrongTarget => "wrong_target",
            Self::NoPermission => "no_permission",
            Self::Help => "help",
            Self::InvalidArgs => "invalid_args",
            Self::NeedsConfirmation => "needs_confirmation",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
