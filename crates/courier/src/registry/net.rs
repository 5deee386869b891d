//! Registry of distributed command callbacks.
//!
//! Descriptors are copy-on-write: registration builds a new descriptor and
//! swaps it in, so a dispatch in progress keeps iterating the callback set it
//! looked up.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::errors::{CommandError, DispatchError};
use crate::net::{NetCommandFn, NetCommandHandler};
use crate::payload::Mapping;

use super::{HandlerId, REGISTRY_TARGET, handler_name, poisoned};

trait NetTarget: Send + Sync {
    fn handler_name(&self) -> &'static str;

    fn invoke(&self, data: &Mapping) -> Result<(), CommandError>;
}

struct TypedNetTarget<H> {
    handler: Arc<H>,
    target: NetCommandFn<H>,
}

impl<H: NetCommandHandler> NetTarget for TypedNetTarget<H> {
    fn handler_name(&self) -> &'static str {
        handler_name::<H>()
    }

    fn invoke(&self, data: &Mapping) -> Result<(), CommandError> {
        (self.target)(&self.handler, data)
    }
}

/// One registered callback of a distributed command.
#[derive(Clone)]
pub(crate) struct NetCallback {
    handler: HandlerId,
    method: usize,
    target: Arc<dyn NetTarget>,
}

impl NetCallback {
    pub(crate) fn handler_name(&self) -> &'static str {
        self.target.handler_name()
    }

    pub(crate) fn invoke(&self, data: &Mapping) -> Result<(), CommandError> {
        self.target.invoke(data)
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.handler == other.handler && self.method == other.method
    }
}

/// A distributed command name, its required fields and its callbacks.
#[derive(Clone)]
pub struct NetCommandDescriptor {
    name: String,
    required: Vec<String>,
    callbacks: Vec<NetCallback>,
}

impl NetCommandDescriptor {
    /// Command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field names every inbound `data` object must carry.
    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    /// Number of registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Required fields absent from `data`, in declaration order.
    pub fn missing_fields(&self, data: &Mapping) -> Vec<String> {
        self.required
            .iter()
            .filter(|field| !data.contains_key(field.as_str()))
            .cloned()
            .collect()
    }

    pub(crate) fn callbacks(&self) -> &[NetCallback] {
        &self.callbacks
    }

    fn merge_required(&mut self, required: &[String], handler: &'static str) {
        let mut extra: Vec<String> = Vec::new();
        for field in required {
            if !self.required.contains(field) && !extra.contains(field) {
                extra.push(field.clone());
            }
        }
        if extra.is_empty() {
            return;
        }
        warn!(
            target: REGISTRY_TARGET,
            command = self.name.as_str(),
            handler,
            added = %extra.join(", "),
            "net command registered with additional required fields"
        );
        self.required.extend(extra);
    }
}

impl std::fmt::Debug for NetCommandDescriptor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NetCommandDescriptor")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct NetRegistry {
    commands: RwLock<HashMap<String, Arc<NetCommandDescriptor>>>,
}

impl NetRegistry {
    /// Appends every callback `handler` declares to its command's set.
    ///
    /// Returns the number of callbacks added; re-registering an instance adds
    /// nothing.
    pub(crate) fn register<H: NetCommandHandler>(&self, handler: &Arc<H>) -> Result<usize, DispatchError> {
        let name = handler_name::<H>();
        let id = HandlerId::of(handler);
        let methods = handler.net_commands();

        let mut commands = self.commands.write().map_err(|_| poisoned("net command"))?;
        let mut added = 0;
        for (index, method) in methods.into_iter().enumerate() {
            if method.name.is_empty() {
                debug!(target: REGISTRY_TARGET, handler = name, "skipping unnamed net command");
                continue;
            }
            let callback = NetCallback {
                handler: id,
                method: index,
                target: Arc::new(TypedNetTarget {
                    handler: Arc::clone(handler),
                    target: method.target,
                }),
            };
            let existing = commands.get(&method.name);
            if existing.is_some_and(|existing| {
                existing
                    .callbacks
                    .iter()
                    .any(|registered| registered.same_slot(&callback))
            }) {
                continue;
            }
            let mut descriptor = match existing {
                Some(existing) => {
                    let mut descriptor = NetCommandDescriptor::clone(existing);
                    descriptor.merge_required(&method.required, name);
                    descriptor
                }
                None => NetCommandDescriptor {
                    name: method.name.clone(),
                    required: dedupe(method.required),
                    callbacks: Vec::new(),
                },
            };
            descriptor.callbacks.push(callback);
            added += 1;
            commands.insert(method.name, Arc::new(descriptor));
        }
        debug!(target: REGISTRY_TARGET, handler = name, added, "registered net commands");
        Ok(added)
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<Option<Arc<NetCommandDescriptor>>, DispatchError> {
        let commands = self.commands.read().map_err(|_| poisoned("net command"))?;
        Ok(commands.get(name).cloned())
    }

    pub(crate) fn names(&self) -> Result<Vec<String>, DispatchError> {
        let commands = self.commands.read().map_err(|_| poisoned("net command"))?;
        let mut names: Vec<String> = commands.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

fn dedupe(fields: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(fields.len());
    for field in fields {
        if !unique.contains(&field) {
            unique.push(field);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NetCommandMethod;

    struct Scoreboard {
        required: &'static [&'static str],
    }

    impl Scoreboard {
        fn add_score(&self, _data: &Mapping) -> Result<(), CommandError> {
            Ok(())
        }
    }

    impl NetCommandHandler for Scoreboard {
        fn net_commands(&self) -> Vec<NetCommandMethod<Self>> {
            vec![NetCommandMethod::new(
                "addscore",
                self.required.iter().copied(),
                Self::add_score,
            )]
        }
    }

    #[test]
    fn reregistering_an_instance_is_ignored() {
        let registry = NetRegistry::default();
        let handler = Arc::new(Scoreboard {
            required: &["player", "amount"],
        });
        assert_eq!(registry.register(&handler).expect("register"), 1);
        assert_eq!(registry.register(&handler).expect("register again"), 0);
        let descriptor = registry.lookup("addscore").expect("lookup").expect("present");
        assert_eq!(descriptor.callback_count(), 1);
    }

    #[test]
    fn merges_required_fields_in_order() {
        let registry = NetRegistry::default();
        let first = Arc::new(Scoreboard {
            required: &["player", "amount", "player"],
        });
        let second = Arc::new(Scoreboard {
            required: &["amount", "reason"],
        });
        registry.register(&first).expect("register first");
        registry.register(&second).expect("register second");
        let descriptor = registry.lookup("addscore").expect("lookup").expect("present");
        assert_eq!(descriptor.required_fields(), ["player", "amount", "reason"]);
        assert_eq!(descriptor.callback_count(), 2);
    }

    #[test]
    fn snapshots_are_unaffected_by_later_registrations() {
        let registry = NetRegistry::default();
        let first = Arc::new(Scoreboard { required: &[] });
        registry.register(&first).expect("register first");
        let snapshot = registry.lookup("addscore").expect("lookup").expect("present");
        let second = Arc::new(Scoreboard { required: &[] });
        registry.register(&second).expect("register second");
        assert_eq!(snapshot.callback_count(), 1);
        assert_eq!(registry.names().expect("names"), vec!["addscore".to_owned()]);
    }

    #[test]
    fn reports_missing_fields() {
        let registry = NetRegistry::default();
        let handler = Arc::new(Scoreboard {
            required: &["player", "amount"],
        });
        registry.register(&handler).expect("register");
        let descriptor = registry.lookup("addscore").expect("lookup").expect("present");
        let mut data = Mapping::new();
        data.insert("player".to_owned(), "Alice".into());
        assert_eq!(descriptor.missing_fields(&data), vec!["amount".to_owned()]);
    }

    /// Declares one more required field on every call.
    #[derive(Default)]
    struct Growing {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Growing {
        fn add_score(&self, _data: &Mapping) -> Result<(), CommandError> {
            Ok(())
        }
    }

    impl NetCommandHandler for Growing {
        fn net_commands(&self) -> Vec<NetCommandMethod<Self>> {
            let calls = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let required = ["player", "amount", "reason"].into_iter().take(calls + 1);
            vec![NetCommandMethod::new("addscore", required, Self::add_score)]
        }
    }

    #[test]
    fn reregistering_keeps_the_original_required_fields() {
        let registry = NetRegistry::default();
        let handler = Arc::new(Growing::default());
        assert_eq!(registry.register(&handler).expect("register"), 1);
        assert_eq!(registry.register(&handler).expect("register again"), 0);

        let descriptor = registry.lookup("addscore").expect("lookup").expect("present");
        assert_eq!(descriptor.required_fields(), ["player"]);
        assert_eq!(descriptor.callback_count(), 1);
    }
}
