//! Asynchronous router for distributed commands.
//!
//! A single background worker receives raw payloads from a [`Subscription`],
//! decodes each into a command name and a normalised `data` mapping, checks
//! the command's required fields and calls every registered callback in
//! registration order. A failing callback is logged and skipped; its siblings
//! still run and the worker keeps listening.

mod dispatcher;
mod envelope;
mod handler;
mod subscription;
mod worker;

pub use self::dispatcher::{Delivery, DispatchSettings, NetDispatcher};
pub use self::envelope::NetCommand;
pub use self::handler::{NetCommandFn, NetCommandHandler, NetCommandMethod};
pub use self::subscription::{
    ChannelPublisher, ChannelSubscription, Subscription, SubscriptionError, channel,
};
pub use self::worker::{ListenerHandle, ListenerState};
pub use crate::registry::NetCommandDescriptor;

/// Tracing target for distributed dispatch.
pub(crate) const NET_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::net");
