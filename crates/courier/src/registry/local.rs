//! Registry of local command bindings.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::errors::{CommandError, DispatchError};
use crate::local::{CommandDescriptor, CommandFn, CommandHandler, CommandSender, CommandStatus, SenderKind};

use super::{HandlerId, REGISTRY_TARGET, handler_name, poisoned};

/// Normalises a command name for lookup.
pub(crate) fn command_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Type-erased handler plus the method servicing one command.
trait BoundTarget: Send + Sync {
    fn handler_id(&self) -> HandlerId;

    fn handler_name(&self) -> &'static str;

    fn invoke(
        &self,
        sender: &dyn CommandSender,
        kind: SenderKind,
        descriptor: &CommandDescriptor,
        command: &str,
        arguments: &[String],
    ) -> Result<CommandStatus, CommandError>;

    fn handle_status(&self, status: CommandStatus, sender: &dyn CommandSender, kind: SenderKind);
}

struct TypedTarget<H> {
    handler: Arc<H>,
    target: CommandFn<H>,
}

impl<H: CommandHandler> BoundTarget for TypedTarget<H> {
    fn handler_id(&self) -> HandlerId {
        HandlerId::of(&self.handler)
    }

    fn handler_name(&self) -> &'static str {
        handler_name::<H>()
    }

    fn invoke(
        &self,
        sender: &dyn CommandSender,
        kind: SenderKind,
        descriptor: &CommandDescriptor,
        command: &str,
        arguments: &[String],
    ) -> Result<CommandStatus, CommandError> {
        (self.target)(&self.handler, sender, kind, descriptor, command, arguments)
    }

    fn handle_status(&self, status: CommandStatus, sender: &dyn CommandSender, kind: SenderKind) {
        self.handler.handle_command_status(status, sender, kind);
    }
}

/// Live association of one command name with a handler method.
pub(crate) struct HandlerBinding {
    descriptor: CommandDescriptor,
    target: Box<dyn BoundTarget>,
}

impl HandlerBinding {
    pub(crate) fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub(crate) fn handler_id(&self) -> HandlerId {
        self.target.handler_id()
    }

    pub(crate) fn handler_name(&self) -> &'static str {
        self.target.handler_name()
    }

    pub(crate) fn invoke(
        &self,
        sender: &dyn CommandSender,
        kind: SenderKind,
        command: &str,
        arguments: &[String],
    ) -> Result<CommandStatus, CommandError> {
        self.target
            .invoke(sender, kind, &self.descriptor, command, arguments)
    }

    pub(crate) fn handle_status(
        &self,
        status: CommandStatus,
        sender: &dyn CommandSender,
        kind: SenderKind,
    ) {
        self.target.handle_status(status, sender, kind);
    }
}

/// Command name to binding map; the last registration for a name wins.
#[derive(Default)]
pub(crate) struct CommandRegistry {
    bindings: RwLock<HashMap<String, Arc<HandlerBinding>>>,
}

impl CommandRegistry {
    /// Binds every eligible command `handler` declares.
    ///
    /// Returns the number of commands bound.
    pub(crate) fn register<H: CommandHandler>(&self, handler: &Arc<H>) -> Result<usize, DispatchError> {
        let name = handler_name::<H>();
        let mut staged = Vec::new();
        for method in handler.commands() {
            if let Some(reason) = method.descriptor.ineligibility() {
                debug!(
                    target: REGISTRY_TARGET,
                    handler = name,
                    command = method.descriptor.name(),
                    reason,
                    "skipping ineligible command"
                );
                continue;
            }
            let binding = HandlerBinding {
                target: Box::new(TypedTarget {
                    handler: Arc::clone(handler),
                    target: method.target,
                }),
                descriptor: method.descriptor,
            };
            staged.push((command_key(binding.descriptor.name()), Arc::new(binding)));
        }

        let mut bindings = self.bindings.write().map_err(|_| poisoned("command"))?;
        let count = staged.len();
        for (key, binding) in staged {
            if let Some(previous) = bindings.insert(key, binding) {
                info!(
                    target: REGISTRY_TARGET,
                    command = previous.descriptor().name(),
                    replaced = previous.handler_name(),
                    handler = name,
                    "command binding replaced"
                );
            }
        }
        debug!(target: REGISTRY_TARGET, handler = name, count, "registered commands");
        Ok(count)
    }

    /// Removes every binding that points at `handler`.
    ///
    /// Bindings owned by other handlers, including other instances of the
    /// same type, are kept. Returns the number of bindings removed.
    pub(crate) fn unregister<H: CommandHandler>(&self, handler: &Arc<H>) -> Result<usize, DispatchError> {
        let id = HandlerId::of(handler);
        let mut bindings = self.bindings.write().map_err(|_| poisoned("command"))?;
        let before = bindings.len();
        bindings.retain(|_, binding| binding.handler_id() != id);
        let removed = before - bindings.len();
        debug!(
            target: REGISTRY_TARGET,
            handler = handler_name::<H>(),
            removed,
            "unregistered commands"
        );
        Ok(removed)
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<Option<Arc<HandlerBinding>>, DispatchError> {
        let bindings = self.bindings.read().map_err(|_| poisoned("command"))?;
        Ok(bindings.get(&command_key(name)).cloned())
    }

    /// Registered command names, sorted.
    pub(crate) fn names(&self) -> Result<Vec<String>, DispatchError> {
        let bindings = self.bindings.read().map_err(|_| poisoned("command"))?;
        let mut names: Vec<String> = bindings
            .values()
            .map(|binding| binding.descriptor().name().to_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    pub(crate) fn len(&self) -> Result<usize, DispatchError> {
        let bindings = self.bindings.read().map_err(|_| poisoned("command"))?;
        Ok(bindings.len())
    }
}
