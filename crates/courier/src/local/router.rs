//! Local command routing.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::errors::{DispatchError, HandlerFault};
use crate::fault::{self, Caught};
use crate::registry::{CommandRegistry, HandlerBinding};

use super::handler::{CommandDescriptor, CommandHandler};
use super::sender::{CommandSender, SenderKind};
use super::status::CommandStatus;
use super::{LOCAL_TARGET, messages};

/// What happened to one local command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler is bound to the command; the caller was told so.
    NoHandler,
    /// The router rejected the caller before invoking the handler.
    Rejected(CommandStatus),
    /// The handler asked for help; the usage line was sent to the caller.
    Help,
    /// The handler ran and its status reached the status callback.
    Completed(CommandStatus),
    /// Handler code failed; the caller received an internal-error report.
    Faulted(HandlerFault),
}

/// Router owning the local command registry.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use courier::{
///     CommandDescriptor, CommandError, CommandHandler, CommandMethod, CommandSender,
///     CommandStatus, LocalDispatcher, SenderKind,
/// };
///
/// struct Greeter;
///
/// impl Greeter {
///     fn hello(
///         &self,
///         sender: &dyn CommandSender,
///         _kind: SenderKind,
///         _descriptor: &CommandDescriptor,
///         _command: &str,
///         _arguments: &[String],
///     ) -> Result<CommandStatus, CommandError> {
///         sender.send_message("hello");
///         Ok(CommandStatus::Success)
///     }
/// }
///
/// impl CommandHandler for Greeter {
///     fn commands(&self) -> Vec<CommandMethod<Self>> {
///         let descriptor =
///             CommandDescriptor::new("hello", "", "cmd.hello", [SenderKind::Console]);
///         vec![CommandMethod::new(descriptor, Self::hello)]
///     }
///
///     fn handle_command_status(&self, _: CommandStatus, _: &dyn CommandSender, _: SenderKind) {}
/// }
///
/// let dispatcher = LocalDispatcher::new();
/// dispatcher.register_commands(&Arc::new(Greeter)).expect("register");
/// assert!(dispatcher.is_registered("HELLO").expect("query"));
/// ```
#[derive(Default)]
pub struct LocalDispatcher {
    registry: CommandRegistry,
}

impl LocalDispatcher {
    /// Creates a dispatcher with no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every eligible command `handler` declares.
    ///
    /// A command already bound to another handler is rebound to this one.
    /// Returns the number of commands bound.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn register_commands<H: CommandHandler>(&self, handler: &Arc<H>) -> Result<usize, DispatchError> {
        self.registry.register(handler)
    }

    /// Removes every binding pointing at `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn unregister_commands<H: CommandHandler>(
        &self,
        handler: &Arc<H>,
    ) -> Result<usize, DispatchError> {
        self.registry.unregister(handler)
    }

    /// Descriptor currently bound to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn descriptor(&self, name: &str) -> Result<Option<CommandDescriptor>, DispatchError> {
        Ok(self
            .registry
            .resolve(name)?
            .map(|binding| binding.descriptor().clone()))
    }

    /// Returns `true` when a handler is bound to `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn is_registered(&self, name: &str) -> Result<bool, DispatchError> {
        Ok(self.registry.resolve(name)?.is_some())
    }

    /// Bound command names, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn command_names(&self) -> Result<Vec<String>, DispatchError> {
        self.registry.names()
    }

    /// Number of bound commands.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn len(&self) -> Result<usize, DispatchError> {
        self.registry.len()
    }

    /// Returns `true` when no command is bound.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, DispatchError> {
        Ok(self.len()? == 0)
    }

    /// Host entry point: routes one command and reports whether it was consumed.
    ///
    /// Every handler outcome, including a handler fault, counts as consumed.
    /// Only router-level failures yield `false`.
    pub fn dispatch(
        &self,
        sender: &dyn CommandSender,
        command: &str,
        label: &str,
        arguments: &[String],
    ) -> bool {
        match self.try_dispatch(sender, command, label, arguments) {
            Ok(_) => true,
            Err(error) => {
                error!(
                    target: LOCAL_TARGET,
                    command,
                    label,
                    error = %error,
                    "local dispatch failed"
                );
                false
            }
        }
    }

    /// Routes one command and returns its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] when the registry lock is poisoned
    /// or host code (caller classification, permission lookup or caller
    /// messaging) panics.
    pub fn try_dispatch(
        &self,
        sender: &dyn CommandSender,
        command: &str,
        label: &str,
        arguments: &[String],
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(binding) = self.registry.resolve(command)? else {
            debug!(target: LOCAL_TARGET, command, label, "no handler bound");
            tell(sender, messages::NO_HANDLER)?;
            return Ok(DispatchOutcome::NoHandler);
        };
        let descriptor = binding.descriptor();

        let kind = fault::guard(|| SenderKind::classify(sender))
            .map_err(|message| host_panic("classifying the caller", &message))?;
        if !descriptor.allows(kind) {
            debug!(target: LOCAL_TARGET, command, kind = %kind, "caller kind not allowed");
            return Ok(reject(&binding, CommandStatus::WrongTarget, sender, kind, command));
        }

        let permitted = fault::guard(|| sender.has_permission(descriptor.permission()))
            .map_err(|message| host_panic("checking the caller's permission", &message))?;
        if !permitted {
            debug!(
                target: LOCAL_TARGET,
                command,
                permission = descriptor.permission(),
                "caller lacks permission"
            );
            return Ok(reject(&binding, CommandStatus::NoPermission, sender, kind, command));
        }

        let status = match fault::isolate(|| binding.invoke(sender, kind, command, arguments)) {
            Ok(status) => status,
            Err(caught) => return report_fault(&binding, caught, sender, command),
        };
        debug!(target: LOCAL_TARGET, command, status = %status, "handler returned");

        if status == CommandStatus::Help {
            tell(sender, &descriptor.usage_line())?;
            return Ok(DispatchOutcome::Help);
        }
        match notify(&binding, status, sender, kind) {
            Ok(()) => Ok(DispatchOutcome::Completed(status)),
            Err(caught) => report_fault(&binding, caught, sender, command),
        }
    }
}

fn reject(
    binding: &HandlerBinding,
    status: CommandStatus,
    sender: &dyn CommandSender,
    kind: SenderKind,
    command: &str,
) -> DispatchOutcome {
    if let Err(caught) = notify(binding, status, sender, kind) {
        // The rejection stands even when the status callback fails.
        log_fault(&caught.into_fault(command, binding.handler_name()));
    }
    DispatchOutcome::Rejected(status)
}

fn notify(
    binding: &HandlerBinding,
    status: CommandStatus,
    sender: &dyn CommandSender,
    kind: SenderKind,
) -> Result<(), Caught> {
    fault::guard(|| binding.handle_status(status, sender, kind)).map_err(Caught::Panic)
}

fn report_fault(
    binding: &HandlerBinding,
    caught: Caught,
    sender: &dyn CommandSender,
    command: &str,
) -> Result<DispatchOutcome, DispatchError> {
    let fault = caught.into_fault(command, binding.handler_name());
    log_fault(&fault);
    tell(sender, messages::INTERNAL_ERROR)?;
    tell(sender, &format!("{}: {}", fault.kind(), fault.message()))?;
    tell(
        sender,
        &format!("at: {}", fault.location().unwrap_or(fault.handler())),
    )?;
    Ok(DispatchOutcome::Faulted(fault))
}

fn log_fault(fault: &HandlerFault) {
    error!(
        target: LOCAL_TARGET,
        command = fault.command(),
        handler = fault.handler(),
        fault = %fault.kind(),
        location = fault.location().unwrap_or("unknown"),
        message = fault.message(),
        "command handler failed"
    );
}

fn tell(sender: &dyn CommandSender, message: &str) -> Result<(), DispatchError> {
    fault::guard(|| sender.send_message(message)).map_err(|panic| {
        warn!(target: LOCAL_TARGET, "caller messaging panicked");
        host_panic("messaging the caller", &panic)
    })
}

fn host_panic(stage: &str, message: &str) -> DispatchError {
    DispatchError::internal(format!("host code panicked while {stage}: {message}"))
}
