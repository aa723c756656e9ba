//! Message passing between tasks.
//!
//! A [`Channel`] is a bounded queue shared by any number of senders and receivers. Operations
//! that can't complete right away suspend the calling task instead of blocking its thread.
//!
//! # Examples
//!
//! A producer and a consumer connected by a channel with room for two values:
//!
//! ```
//! use coop_rt::sync::Channel;
//! use coop_rt::task::{self, Task};
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
//! producer.resume();
//!
//! let received = task::block_on(async {
//!     let mut v = Vec::new();
//!     while let Ok(x) = ch.recv().await {
//!         v.push(x);
//!     }
//!     v
//! });
//! assert_eq!(received, vec![0, 1, 2, 3, 4]);
//! ```
//!
//! [`Channel`]: struct.Channel.html

pub use channel::{Channel, Recv, Send};
pub use error::{RecvError, SendError, TryRecvError, TrySendError};

mod channel;
mod error;
