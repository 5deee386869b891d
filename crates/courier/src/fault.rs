//! Fault isolation for handler code.
//!
//! Every call into handler code goes through [`isolate`], which converts both
//! a returned [`CommandError`] and a panic into a [`Caught`] value so neither
//! can escape a router boundary.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::errors::{CommandError, FaultKind, HandlerFault};

/// Failure captured while running handler code.
#[derive(Debug)]
pub(crate) enum Caught {
    Error(CommandError),
    Panic(String),
}

impl Caught {
    /// Builds the fault record for `command` handled by `handler`.
    pub(crate) fn into_fault(self, command: &str, handler: &'static str) -> HandlerFault {
        match self {
            Self::Error(error) => {
                let location = error.location();
                let location = format!("{}:{}", location.file(), location.line());
                HandlerFault::new(
                    command,
                    handler,
                    FaultKind::Error,
                    error.message(),
                    Some(location),
                )
            }
            Self::Panic(message) => {
                HandlerFault::new(command, handler, FaultKind::Panic, message, None)
            }
        }
    }
}

/// Runs fallible handler code, catching panics.
pub(crate) fn isolate<T>(call: impl FnOnce() -> Result<T, CommandError>) -> Result<T, Caught> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(Caught::Error(error)),
        Err(payload) => Err(Caught::Panic(panic_message(payload.as_ref()))),
    }
}

/// Runs infallible host or handler code, catching panics.
pub(crate) fn guard<T>(call: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|payload| panic_message(payload.as_ref()))
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_values_through() {
        let result = isolate(|| Ok::<_, CommandError>(7));
        assert!(matches!(result, Ok(7)));
    }

    #[test]
    fn captures_returned_errors_with_location() {
        let caught = isolate(|| Err::<(), _>(CommandError::new("nope"))).expect_err("error");
        let fault = caught.into_fault("heal", "Medic");
        assert_eq!(fault.kind(), FaultKind::Error);
        assert_eq!(fault.message(), "nope");
        assert!(
            fault
                .location()
                .is_some_and(|location| location.starts_with(file!()))
        );
    }

    #[test]
    fn captures_panics() {
        let caught = isolate::<()>(|| panic!("handler exploded")).expect_err("panic");
        let fault = caught.into_fault("heal", "Medic");
        assert_eq!(fault.kind(), FaultKind::Panic);
        assert_eq!(fault.message(), "handler exploded");
        assert!(fault.location().is_none());
    }

    #[test]
    fn guard_captures_formatted_panics() {
        let code = 3;
        let message = guard(|| -> u8 { panic!("code {code}") }).expect_err("panic");
        assert_eq!(message, "code 3");
    }
}
