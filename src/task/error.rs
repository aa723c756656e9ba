use std::any::Any;
use std::error::Error;
use std::fmt;

use crate::utils::panic_message;

/// A boxed error that can cross threads.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// The error half of a task's result slot.
///
/// A task body never takes the process down: whatever goes wrong inside it is stored here and
/// handed to whoever retrieves the result.
pub enum TaskError {
    /// The body returned an error.
    Failed(BoxError),

    /// The body panicked. The payload is the value passed to `panic!`.
    Panicked(Box<dyn Any + Send + 'static>),

    /// The result was read before the task completed.
    Incomplete,

    /// The result was already retrieved once.
    Consumed,
}

impl TaskError {
    /// Returns `true` if the body panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    /// Returns the panic message if the body panicked with a string payload.
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            TaskError::Panicked(payload) => Some(panic_message(&**payload)),
            _ => None,
        }
    }

    /// Consumes the error, returning the body's own error if it returned one.
    pub fn into_failure(self) -> Option<BoxError> {
        match self {
            TaskError::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            TaskError::Panicked(payload) => f
                .debug_tuple("Panicked")
                .field(&panic_message(&**payload))
                .finish(),
            TaskError::Incomplete => f.pad("Incomplete"),
            TaskError::Consumed => f.pad("Consumed"),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Failed(err) => write!(f, "task failed: {}", err),
            TaskError::Panicked(payload) => {
                write!(f, "task panicked: {}", panic_message(&**payload))
            }
            TaskError::Incomplete => f.pad("task result read before completion"),
            TaskError::Consumed => f.pad("task result already retrieved"),
        }
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TaskError::Failed(err) => Some(&**err),
            _ => None,
        }
    }
}
