//! Background worker draining a subscription into the dispatcher.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::errors::DispatchError;
use crate::fault;
use crate::transport::TransportError;

use super::NET_TARGET;
use super::dispatcher::NetDispatcher;
use super::subscription::{Subscription, SubscriptionError};

const WORKER_NAME: &str = "courier-net-dispatch";
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Lifecycle state of the dispatch worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// The worker has exited.
    Stopped,
    /// Waiting for the next message.
    Listening,
    /// Running the callbacks of one message.
    Dispatching,
}

impl ListenerState {
    fn encode(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Listening => 1,
            Self::Dispatching => 2,
        }
    }

    fn decode(value: u8) -> Self {
        match value {
            1 => Self::Listening,
            2 => Self::Dispatching,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ListenerState) -> Self {
        Self(AtomicU8::new(state.encode()))
    }

    fn set(&self, state: ListenerState) {
        self.0.store(state.encode(), Ordering::SeqCst);
    }

    fn get(&self) -> ListenerState {
        ListenerState::decode(self.0.load(Ordering::SeqCst))
    }
}

/// Handle to the running dispatch worker.
///
/// Dropping the handle signals the worker to stop without waiting for it.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    state: Arc<StateCell>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the worker to stop after its current message.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ListenerState {
        self.state.get()
    }

    /// Waits for the worker to exit.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ThreadPanic`] if the worker panicked.
    pub fn join(mut self) -> Result<(), TransportError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| TransportError::ThreadPanic {
                thread: WORKER_NAME,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

pub(super) fn spawn<S: Subscription>(
    dispatcher: NetDispatcher,
    subscription: S,
) -> Result<ListenerHandle, DispatchError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let state = Arc::new(StateCell::new(ListenerState::Stopped));
    let worker = Worker {
        dispatcher,
        shutdown: Arc::clone(&shutdown),
        state: Arc::clone(&state),
    };
    let handle = thread::Builder::new()
        .name(WORKER_NAME.to_owned())
        .spawn(move || worker.run(subscription))?;
    Ok(ListenerHandle {
        shutdown,
        state,
        handle: Some(handle),
    })
}

struct Worker {
    dispatcher: NetDispatcher,
    shutdown: Arc<AtomicBool>,
    state: Arc<StateCell>,
}

/// Marks the worker stopped however `Worker::run` exits.
struct StopOnExit(Arc<StateCell>);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.set(ListenerState::Stopped);
    }
}

impl Worker {
    fn run<S: Subscription>(self, mut subscription: S) {
        let _stopped = StopOnExit(Arc::clone(&self.state));
        self.state.set(ListenerState::Listening);
        let channel = self.dispatcher.settings().channel().to_owned();
        let wait = self.dispatcher.settings().poll_interval();
        info!(target: NET_TARGET, channel = channel.as_str(), "net dispatch worker listening");

        let mut last_error = None::<io::ErrorKind>;
        while !self.shutdown.load(Ordering::SeqCst) {
            let received = match fault::guard(|| subscription.receive(wait)) {
                Ok(received) => received,
                Err(message) => {
                    error!(
                        target: NET_TARGET,
                        channel = channel.as_str(),
                        message = message.as_str(),
                        "subscription receive panicked"
                    );
                    break;
                }
            };
            match received {
                Ok(Some(payload)) => {
                    last_error = None;
                    self.dispatch(&payload);
                }
                Ok(None) => {}
                Err(SubscriptionError::Disconnected) => {
                    info!(target: NET_TARGET, channel = channel.as_str(), "subscription closed");
                    break;
                }
                Err(SubscriptionError::Io(source)) => {
                    if last_error != Some(source.kind()) {
                        warn!(
                            target: NET_TARGET,
                            channel = channel.as_str(),
                            error = %source,
                            "subscription receive error"
                        );
                    }
                    last_error = Some(source.kind());
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        drop(subscription);
        info!(target: NET_TARGET, channel = channel.as_str(), "net dispatch worker stopped");
    }

    fn dispatch(&self, payload: &[u8]) {
        self.state.set(ListenerState::Dispatching);
        if let Err(message) = fault::guard(|| self.dispatcher.handle_message(payload)) {
            error!(target: NET_TARGET, message = message.as_str(), "net dispatch panicked");
        }
        self.state.set(ListenerState::Listening);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::net::DispatchSettings;

    struct Exploding;

    impl Subscription for Exploding {
        fn receive(&mut self, _wait: Duration) -> Result<Option<Vec<u8>>, SubscriptionError> {
            panic!("socket reader exploded");
        }
    }

    /// Records the worker state seen by each receive, then disconnects.
    struct Recording {
        state: Arc<StateCell>,
        seen: Arc<Mutex<Vec<ListenerState>>>,
    }

    impl Subscription for Recording {
        fn receive(&mut self, _wait: Duration) -> Result<Option<Vec<u8>>, SubscriptionError> {
            self.seen.lock().expect("seen lock").push(self.state.get());
            Err(SubscriptionError::Disconnected)
        }
    }

    fn worker(state: &Arc<StateCell>) -> Worker {
        Worker {
            dispatcher: NetDispatcher::new(
                DispatchSettings::default().with_poll_interval(Duration::from_millis(5)),
            ),
            shutdown: Arc::new(AtomicBool::new(false)),
            state: Arc::clone(state),
        }
    }

    #[test]
    fn state_moves_from_stopped_to_listening_and_back() {
        let state = Arc::new(StateCell::new(ListenerState::Stopped));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscription = Recording {
            state: Arc::clone(&state),
            seen: Arc::clone(&seen),
        };

        worker(&state).run(subscription);

        assert_eq!(*seen.lock().expect("seen lock"), vec![ListenerState::Listening]);
        assert_eq!(state.get(), ListenerState::Stopped);
    }

    #[test]
    fn receive_panic_leaves_the_worker_stopped() {
        let state = Arc::new(StateCell::new(ListenerState::Stopped));
        worker(&state).run(Exploding);
        assert_eq!(state.get(), ListenerState::Stopped);
    }

    #[test]
    fn spawned_worker_survives_a_panicking_subscription() {
        let dispatcher = NetDispatcher::new(DispatchSettings::default());
        let handle = spawn(dispatcher, Exploding).expect("spawn worker");
        handle.join().expect("a receive panic must not escape the worker thread");
    }
}
