use std::task::Waker;

use super::{Awaitable, Suspend};

/// Resolves to the provided value.
///
/// # Examples
///
/// ```
/// use coop_rt::future;
/// use coop_rt::task;
///
/// assert_eq!(task::block_on(future::suspend(future::ready(10))), 10);
/// ```
pub fn ready<T>(val: T) -> Ready<T> {
    Ready(Some(val))
}

/// An awaitable whose result is known up front.
///
/// This is constructed by the [`ready`] function.
///
/// # Panics
///
/// The value can be taken once. Calling [`take_result`] a second time panics.
///
/// [`take_result`]: trait.Awaitable.html#tymethod.take_result
/// [`ready`]: fn.ready.html
#[derive(Debug)]
pub struct Ready<T>(Option<T>);

impl<T> Unpin for Ready<T> {}

impl<T> Awaitable for Ready<T> {
    type Output = T;

    fn is_ready(&self) -> bool {
        true
    }

    fn begin_suspend(&mut self, _: Waker) -> Suspend {
        Suspend::Resumed
    }

    fn take_result(&mut self) -> T {
        self.0.take().expect("`Ready` result taken twice")
    }
}
