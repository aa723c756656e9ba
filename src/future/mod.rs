//! The awaitable contract and the operations built on it.
//!
//! Anything a task can wait on, besides another task or a channel operation, plugs in through
//! the [`Awaitable`] trait: say whether the result is ready, accept a waker, hand over the result.
//! [`suspend`] adapts an `Awaitable` into a future, so inside a task body it reads like any other
//! `.await`.
//!
//! This module ships a few collaborators:
//!
//! * [`Ready`] for a value that is already known.
//! * [`Delay`] for a timer.
//! * [`Blocking`] for a closure that has to block, run on its own thread.
//!
//! [`Task`] implements `Awaitable` too.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use coop_rt::future::{self, Delay};
//! use coop_rt::task::{self, Task};
//!
//! let t = Task::new(async {
//!     future::suspend(Delay::new(Duration::from_millis(5))).await;
//!     let n = future::suspend(future::blocking(|| 6 * 7)).await.unwrap();
//!     n + future::suspend(future::ready(0)).await
//! });
//!
//! assert_eq!(task::block_on(t).unwrap(), 42);
//! ```
//!
//! [`Awaitable`]: trait.Awaitable.html
//! [`suspend`]: fn.suspend.html
//! [`Ready`]: struct.Ready.html
//! [`Delay`]: struct.Delay.html
//! [`Blocking`]: struct.Blocking.html
//! [`Task`]: ../task/struct.Task.html

pub use awaitable::{suspend, Awaitable, Suspend, Suspended};
pub use blocking::{blocking, Blocking};
pub use delay::Delay;
pub use ready::{ready, Ready};
pub use sleep::sleep;

mod awaitable;
mod blocking;
mod delay;
mod ready;
mod sleep;
