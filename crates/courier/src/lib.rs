//! Command dispatch core.
//!
//! Handler objects declare the commands they service; routers receive raw
//! invocations and deliver them to the right handler code.
//!
//! - [`LocalDispatcher`] routes one synchronous command at a time. It checks
//!   the caller's [`SenderKind`] and permission, invokes exactly one handler
//!   method and hands the resulting [`CommandStatus`] back to the handler.
//! - [`NetDispatcher`] drains a [`Subscription`] on one background worker,
//!   normalises each payload's `data` object into a [`Mapping`], checks the
//!   declared required fields and fans the mapping out to every registered
//!   callback.
//!
//! Both routers are fault-isolation boundaries: a handler that returns a
//! [`CommandError`] or panics is logged and reported, and the router carries
//! on with the next command.
//!
//! Registration is explicit. A handler type implements [`CommandHandler`] or
//! [`NetCommandHandler`] and lists `(descriptor, method)` pairs whose method
//! signatures the compiler checks against the fixed calling contract.

mod errors;
mod fault;
pub mod local;
pub mod net;
pub mod payload;
mod registry;
pub mod telemetry;
pub mod transport;

pub use errors::{CommandError, DispatchError, FaultKind, HandlerFault};
pub use local::{
    CommandDescriptor, CommandHandler, CommandMethod, CommandSender, CommandStatus,
    DispatchOutcome, LocalDispatcher, SenderKind,
};
pub use net::{
    ChannelPublisher, ChannelSubscription, Delivery, DispatchSettings, ListenerHandle,
    ListenerState, NetCommand, NetCommandDescriptor, NetCommandHandler, NetCommandMethod,
    NetDispatcher, Subscription, SubscriptionError,
};
pub use payload::{Mapping, NormalizedValue, Scalar, normalize};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{SocketSubscription, TransportError};

#[cfg(test)]
mod tests;
