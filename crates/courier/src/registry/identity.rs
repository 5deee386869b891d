//! Identity of registered handler instances.

use std::any::{TypeId, type_name};
use std::sync::Arc;

/// Identifies one shared handler instance.
///
/// Two ids are equal only when they refer to the same allocation of the same
/// type. Bindings keep their handler alive, so an address cannot be reused
/// while a binding carrying its id exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HandlerId {
    address: usize,
    type_id: TypeId,
}

impl HandlerId {
    pub(crate) fn of<H: 'static>(handler: &Arc<H>) -> Self {
        Self {
            address: Arc::as_ptr(handler).cast::<()>() as usize,
            type_id: TypeId::of::<H>(),
        }
    }
}

/// Short type name of a handler for logs and fault reports.
pub(crate) fn handler_name<H>() -> &'static str {
    let full = type_name::<H>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
