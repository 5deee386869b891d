//! Distributed command dispatch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_config::Config;
use tracing::{debug, error, info, warn};

use crate::errors::{DispatchError, HandlerFault};
use crate::fault;
use crate::payload::Mapping;
use crate::registry::{NetCallback, NetCommandDescriptor, NetRegistry};

use super::NET_TARGET;
use super::envelope::InboundCommand;
use super::handler::NetCommandHandler;
use super::subscription::Subscription;
use super::worker::{self, ListenerHandle};

/// Tunables of the distributed router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    channel: String,
    max_payload_bytes: usize,
    slow_callback_threshold: Duration,
    poll_interval: Duration,
}

impl DispatchSettings {
    /// Reads the router tunables from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            channel: config.channel_name().to_owned(),
            max_payload_bytes: config.max_payload_bytes(),
            slow_callback_threshold: config.slow_callback_threshold(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Overrides the payload size limit; zero is ignored.
    #[must_use]
    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.max_payload_bytes = limit;
        }
        self
    }

    /// Overrides the slow-callback warning threshold.
    #[must_use]
    pub fn with_slow_callback_threshold(mut self, threshold: Duration) -> Self {
        self.slow_callback_threshold = threshold;
        self
    }

    /// Overrides the worker's receive wait; zero is ignored.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.poll_interval = interval;
        }
        self
    }

    /// Logical channel name used in logs.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Largest accepted payload, in bytes.
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Callback duration above which a warning is logged.
    pub fn slow_callback_threshold(&self) -> Duration {
        self.slow_callback_threshold
    }

    /// Receive wait between stop-signal checks.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of a message whose callbacks were attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    command: String,
    attempted: usize,
    faults: Vec<HandlerFault>,
}

impl Delivery {
    /// Command the message named.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Number of callbacks invoked.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Callbacks that failed, in invocation order.
    pub fn faults(&self) -> &[HandlerFault] {
        &self.faults
    }
}

struct Shared {
    registry: NetRegistry,
    settings: DispatchSettings,
}

/// Router fanning net commands out to registered callbacks.
///
/// Clones share one registry, so handlers registered through any clone are
/// visible to a running worker.
#[derive(Clone)]
pub struct NetDispatcher {
    shared: Arc<Shared>,
}

impl NetDispatcher {
    /// Creates a dispatcher with no registered commands.
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: NetRegistry::default(),
                settings,
            }),
        }
    }

    /// Creates a dispatcher configured from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(DispatchSettings::from_config(config))
    }

    /// Active tunables.
    pub fn settings(&self) -> &DispatchSettings {
        &self.shared.settings
    }

    /// Adds every callback `handler` declares to its command's callback set.
    ///
    /// Registering the same instance twice adds nothing the second time.
    /// Returns the number of callbacks added.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn register_net_commands<H: NetCommandHandler>(
        &self,
        handler: &Arc<H>,
    ) -> Result<usize, DispatchError> {
        self.shared.registry.register(handler)
    }

    /// Descriptor registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn descriptor(&self, name: &str) -> Result<Option<Arc<NetCommandDescriptor>>, DispatchError> {
        self.shared.registry.lookup(name)
    }

    /// Registered command names, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn command_names(&self) -> Result<Vec<String>, DispatchError> {
        self.shared.registry.names()
    }

    /// Handles one raw payload and reports whether its callbacks were attempted.
    ///
    /// Malformed payloads, unknown commands and payloads missing required
    /// fields yield `false` without invoking anything.
    pub fn handle_message(&self, payload: &[u8]) -> bool {
        match self.try_handle_message(payload) {
            Ok(_) => true,
            Err(error) => {
                match &error {
                    DispatchError::UnknownCommand { command } => {
                        debug!(target: NET_TARGET, command = command.as_str(), "no callbacks registered");
                    }
                    DispatchError::MissingArguments { command, missing } => {
                        info!(
                            target: NET_TARGET,
                            command = command.as_str(),
                            missing = %missing.join(", "),
                            "net command rejected"
                        );
                    }
                    error if error.is_parse_fault() => {
                        warn!(target: NET_TARGET, error = %error, "dropping malformed net payload");
                    }
                    error => {
                        error!(target: NET_TARGET, error = %error, "net dispatch failed");
                    }
                }
                false
            }
        }
    }

    /// Handles one raw payload and describes what happened.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed payloads,
    /// [`DispatchError::UnknownCommand`] when no callback is registered,
    /// [`DispatchError::MissingArguments`] when required fields are absent and
    /// [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn try_handle_message(&self, payload: &[u8]) -> Result<Delivery, DispatchError> {
        let settings = &self.shared.settings;
        let inbound = InboundCommand::parse(payload, settings.max_payload_bytes)?;
        let Some(descriptor) = self.shared.registry.lookup(&inbound.command)? else {
            return Err(DispatchError::unknown_command(inbound.command));
        };

        let missing = descriptor.missing_fields(&inbound.data);
        if !missing.is_empty() {
            return Err(DispatchError::missing_arguments(inbound.command, missing));
        }

        let faults: Vec<HandlerFault> = descriptor
            .callbacks()
            .iter()
            .filter_map(|callback| self.invoke(callback, &inbound.command, &inbound.data))
            .collect();
        debug!(
            target: NET_TARGET,
            command = inbound.command.as_str(),
            callbacks = descriptor.callback_count(),
            faults = faults.len(),
            "net command dispatched"
        );
        Ok(Delivery {
            command: inbound.command,
            attempted: descriptor.callback_count(),
            faults,
        })
    }

    /// Spawns the single worker draining `subscription`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Io`] if the worker thread cannot be spawned.
    pub fn start<S: Subscription>(&self, subscription: S) -> Result<ListenerHandle, DispatchError> {
        worker::spawn(self.clone(), subscription)
    }

    fn invoke(&self, callback: &NetCallback, command: &str, data: &Mapping) -> Option<HandlerFault> {
        let started = Instant::now();
        let result = fault::isolate(|| callback.invoke(data));
        let elapsed = started.elapsed();
        if elapsed > self.shared.settings.slow_callback_threshold {
            warn!(
                target: NET_TARGET,
                command,
                handler = callback.handler_name(),
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "slow net command callback"
            );
        }
        let caught = result.err()?;
        let fault = caught.into_fault(command, callback.handler_name());
        error!(
            target: NET_TARGET,
            command,
            handler = fault.handler(),
            fault = %fault.kind(),
            location = fault.location().unwrap_or("unknown"),
            message = fault.message(),
            "net command callback failed"
        );
        Some(fault)
    }
}
