//! Message-receive primitives the dispatch worker reads from.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use thiserror::Error;

/// Errors raised while receiving from a subscription.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Every publisher is gone; no further message can arrive.
    #[error("subscription disconnected")]
    Disconnected,
    /// The underlying transport failed.
    #[error("subscription IO error: {0}")]
    Io(#[from] io::Error),
}

/// Source of raw net command payloads.
///
/// Implementations must return within roughly `wait` so the worker can
/// observe its stop signal.
pub trait Subscription: Send + 'static {
    /// Waits up to `wait` for the next payload.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Disconnected`] once the source is closed
    /// for good; other errors are treated as transient.
    fn receive(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, SubscriptionError>;
}

impl Subscription for Box<dyn Subscription> {
    fn receive(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, SubscriptionError> {
        (**self).receive(wait)
    }
}

/// Creates an in-process publisher and subscription pair.
pub fn channel() -> (ChannelPublisher, ChannelSubscription) {
    let (sender, receiver) = mpsc::channel();
    (ChannelPublisher { sender }, ChannelSubscription { receiver })
}

/// Sending half of an in-process channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: Sender<Vec<u8>>,
}

impl ChannelPublisher {
    /// Queues one raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Disconnected`] when the subscription has
    /// been dropped.
    pub fn publish(&self, payload: impl Into<Vec<u8>>) -> Result<(), SubscriptionError> {
        self.sender
            .send(payload.into())
            .map_err(|_| SubscriptionError::Disconnected)
    }
}

/// Receiving half of an in-process channel.
#[derive(Debug)]
pub struct ChannelSubscription {
    receiver: Receiver<Vec<u8>>,
}

impl Subscription for ChannelSubscription {
    fn receive(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, SubscriptionError> {
        match self.receiver.recv_timeout(wait) {
            Ok(payload) => Ok(Some(payload)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SubscriptionError::Disconnected),
        }
    }
}
