//! Handler registries shared by the local and distributed routers.
//!
//! Registries are owned by a dispatcher instance and may be mutated from any
//! thread while dispatch is in progress. Lookups hand out `Arc` snapshots, so
//! handler code always runs without a registry lock held and may itself
//! register or unregister handlers.

mod identity;
mod local;
mod net;

pub(crate) use self::identity::{HandlerId, handler_name};
pub(crate) use self::local::{CommandRegistry, HandlerBinding};
pub use self::net::NetCommandDescriptor;
pub(crate) use self::net::{NetCallback, NetRegistry};

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

fn poisoned(registry: &str) -> crate::errors::DispatchError {
    crate::errors::DispatchError::internal(format!("{registry} registry lock poisoned"))
}
