//! Lazy suspendable computations.
//!
//! A [`Task`] wraps a future into a unit of work that doesn't start until it is awaited or
//! resumed, stores its outcome (a value or a [`TaskError`]) in a single result slot, and resumes
//! whoever awaits it once it completes.
//!
//! Tasks run inline by default: whoever resumes a task, or wakes it from a channel, polls its
//! body on the spot. Binding a task to a [`Scheduler`] moves those resumptions onto the
//! scheduler's worker threads instead.
//!
//! # Examples
//!
//! Awaiting a task from a plain thread:
//!
//! ```
//! use coop_rt::task::{self, Task};
//!
//! let t = Task::new(async { "hello" });
//! assert_eq!(task::block_on(t).unwrap(), "hello");
//! ```
//!
//! A panic inside a body is captured and surfaces where the result is retrieved:
//!
//! ```
//! use coop_rt::task::{self, Task};
//!
//! let t = Task::<()>::new(async { panic!("boom") });
//! let err = task::block_on(t).unwrap_err();
//! assert_eq!(err.panic_message(), Some("boom"));
//! ```
//!
//! [`Task`]: struct.Task.html
//! [`TaskError`]: enum.TaskError.html
//! [`Scheduler`]: ../scheduler/struct.Scheduler.html

pub use block_on::block_on;
pub use error::{BoxError, TaskError};
pub use raw::current_id;
pub use state::TaskState;
pub use task::Task;
pub use task_id::TaskId;

mod block_on;
mod error;
mod raw;
mod state;
mod task;
mod task_id;

pub(crate) use block_on::Parking;
