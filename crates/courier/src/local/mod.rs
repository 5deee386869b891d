//! Synchronous router for locally issued commands.
//!
//! The host hands each command invocation to [`LocalDispatcher::dispatch`] on
//! whatever thread it runs commands on. The router resolves the binding,
//! checks the caller's kind and permission, invokes the handler method and
//! routes the resulting [`CommandStatus`] back to the handler.

mod handler;
mod router;
mod sender;
mod status;

pub use self::handler::{CommandDescriptor, CommandFn, CommandHandler, CommandMethod};
pub use self::router::{DispatchOutcome, LocalDispatcher};
pub use self::sender::{CommandSender, SenderKind};
pub use self::status::CommandStatus;

/// Tracing target for local dispatch.
pub(crate) const LOCAL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::local");

/// Caller-facing texts.
pub(crate) mod messages {
    pub(crate) const NO_HANDLER: &str = "There was no handler found for this command!";
    pub(crate) const INTERNAL_ERROR: &str =
        "An error occurred internally when executing this command. A detailed log is in the console!";
}
