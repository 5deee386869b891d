//! Declaration surface for local command handlers.
//!
//! Handlers list their commands explicitly through
//! [`CommandHandler::commands`]. Each entry pairs a [`CommandDescriptor`] with
//! a function pointer whose signature is the fixed five-parameter contract,
//! so a method with the wrong arity, parameter types or return type cannot be
//! listed at all.

use std::collections::BTreeSet;

use crate::errors::CommandError;

use super::sender::{CommandSender, SenderKind};
use super::status::CommandStatus;

/// Metadata identifying one local command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    name: String,
    usage: String,
    permission: String,
    senders: BTreeSet<SenderKind>,
}

impl CommandDescriptor {
    /// Creates a descriptor.
    ///
    /// The name is trimmed; it is matched case-insensitively at dispatch.
    pub fn new(
        name: impl Into<String>,
        usage: impl Into<String>,
        permission: impl Into<String>,
        senders: impl IntoIterator<Item = SenderKind>,
    ) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            usage: usage.into(),
            permission: permission.into(),
            senders: senders.into_iter().collect(),
        }
    }

    /// Command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Usage text shown for [`CommandStatus::Help`].
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Permission key the caller must hold.
    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// Sender kinds allowed to run the command.
    pub fn senders(&self) -> impl Iterator<Item = SenderKind> + '_ {
        self.senders.iter().copied()
    }

    /// Returns `true` when a caller of `kind` may run the command.
    ///
    /// [`SenderKind::Unknown`] never matches, even when declared.
    pub fn allows(&self, kind: SenderKind) -> bool {
        kind != SenderKind::Unknown && self.senders.contains(&kind)
    }

    /// Formats the line shown when a handler reports [`CommandStatus::Help`].
    pub fn usage_line(&self) -> String {
        format!("/{} - {}", self.name, self.usage)
    }

    /// Reason this descriptor cannot be registered, if any.
    pub(crate) fn ineligibility(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("command name is empty")
        } else if self.senders.is_empty() {
            Some("no sender kinds are allowed")
        } else {
            None
        }
    }
}

/// Signature every local command method must have.
///
/// Parameters, in order: the handler, the caller, the caller's classified
/// kind, the command's descriptor, the command identity as invoked, and the
/// argument tokens.
pub type CommandFn<H> = fn(
    &H,
    &dyn CommandSender,
    SenderKind,
    &CommandDescriptor,
    &str,
    &[String],
) -> Result<CommandStatus, CommandError>;

/// One declared command method of a handler.
pub struct CommandMethod<H> {
    pub(crate) descriptor: CommandDescriptor,
    pub(crate) target: CommandFn<H>,
}

impl<H> CommandMethod<H> {
    /// Pairs a descriptor with the method servicing it.
    pub fn new(descriptor: CommandDescriptor, target: CommandFn<H>) -> Self {
        Self { descriptor, target }
    }

    /// Descriptor of the declared command.
    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }
}

/// An object servicing local commands.
pub trait CommandHandler: Send + Sync + Sized + 'static {
    /// Lists the commands this handler services.
    fn commands(&self) -> Vec<CommandMethod<Self>>;

    /// Receives every status except [`CommandStatus::Help`], including the
    /// validation statuses raised by the router.
    fn handle_command_status(
        &self,
        status: CommandStatus,
        sender: &dyn CommandSender,
        kind: SenderKind,
    );
}
