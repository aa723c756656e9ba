//! A small cooperative concurrency runtime.
//!
//! The crate is built from three primitives that fit together:
//!
//! * [`task::Task`], a lazy computation that runs until it has to wait, suspends, and stores a
//!   value or an error once it finishes.
//! * [`sync::Channel`], a bounded queue tasks use to hand values to each other, suspending while
//!   it is full or empty.
//! * [`scheduler::Scheduler`], a pool of worker threads that resumes suspended tasks in priority
//!   order.
//!
//! Tasks don't need a scheduler: unbound tasks are resumed inline by whoever wakes them. Binding
//! a task to a scheduler moves its resumptions onto the worker threads.
//!
//! Anything else a task can wait on plugs in through the [`future::Awaitable`] contract, and
//! [`generator::Generator`] turns an async body into an iterator.
//!
//! # Examples
//!
//! A producer and a consumer talking through a channel, driven by a two-thread scheduler:
//!
//! ```
//! use coop_rt::scheduler::Scheduler;
//! use coop_rt::sync::Channel;
//! use coop_rt::task::{self, Task};
//!
//! let scheduler = Scheduler::new(2);
//! scheduler.start().unwrap();
//!
//! let ch = Channel::new(2);
//!
//! let producer = Task::new({
//!     let ch = ch.clone();
//!     async move {
//!         for i in 0..5 {
//!             ch.send(i).await.unwrap();
//!         }
//!         ch.close();
//!     }
//! });
//!
//! let consumer = Task::new(async move {
//!     let mut received = Vec::new();
//!     while let Ok(v) = ch.recv().await {
//!         received.push(v);
//!     }
//!     received
//! });
//!
//! producer.start(Some(&scheduler), 0);
//! consumer.set_scheduler(&scheduler, 0);
//!
//! assert_eq!(task::block_on(consumer).unwrap(), vec![0, 1, 2, 3, 4]);
//! ```
//!
//! # Logging
//!
//! Lifecycle events (tasks starting and completing, schedulers starting and stopping, workers
//! exiting) are logged at `trace` level through the [`log`] facade, with structured key-value
//! pairs. A panic swallowed by a worker is logged at `debug` level.
//!
//! [`task::Task`]: task/struct.Task.html
//! [`sync::Channel`]: sync/struct.Channel.html
//! [`scheduler::Scheduler`]: scheduler/struct.Scheduler.html
//! [`future::Awaitable`]: future/trait.Awaitable.html
//! [`generator::Generator`]: generator/struct.Generator.html
//! [`log`]: https://docs.rs/log

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![allow(clippy::mutex_atomic, clippy::module_inception)]
#![doc(test(attr(deny(rust_2018_idioms))))]
#![doc(test(attr(allow(unused_extern_crates, unused_variables))))]

mod utils;

pub mod future;
pub mod generator;
pub mod scheduler;
pub mod sync;
pub mod task;
