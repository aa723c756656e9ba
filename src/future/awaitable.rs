use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use futures_core::future::FusedFuture;

/// Outcome of [`Awaitable::begin_suspend`].
///
/// [`Awaitable::begin_suspend`]: trait.Awaitable.html#tymethod.begin_suspend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suspend {
    /// The result became available while registering; the waker won't be used.
    Resumed,

    /// The waker was registered and will be woken once the result is available.
    Suspended,
}

/// An operation a task can wait on.
///
/// This is the integration seam for anything that completes later: timers, blocking calls, I/O
/// wrappers, or other tasks. An implementor only has to say whether its result is ready, accept a
/// waker to wake once it is, and hand over the result. [`suspend`] turns any `Awaitable` into a
/// future that can be `.await`ed inside a task.
///
/// [`suspend`]: fn.suspend.html
///
/// # Examples
///
/// ```
/// use std::task::Waker;
///
/// use coop_rt::future::{self, Awaitable, Suspend};
/// use coop_rt::task;
///
/// /// Completes immediately with the answer.
/// struct Answer;
///
/// impl Awaitable for Answer {
///     type Output = u32;
///
///     fn is_ready(&self) -> bool {
///         true
///     }
///
///     fn begin_suspend(&mut self, _: Waker) -> Suspend {
///         Suspend::Resumed
///     }
///
///     fn take_result(&mut self) -> u32 {
///         42
///     }
/// }
///
/// assert_eq!(task::block_on(future::suspend(Answer)), 42);
/// ```
pub trait Awaitable {
    /// The result of the operation.
    type Output;

    /// Returns `true` if the result is available without waiting.
    fn is_ready(&self) -> bool;

    /// Registers `waker` to be woken once the result is available.
    ///
    /// Returns [`Suspend::Resumed`] if the result turned out to be available already, in which
    /// case the waker may be dropped without being woken. Registering again replaces the previous
    /// waker.
    ///
    /// [`Suspend::Resumed`]: enum.Suspend.html#variant.Resumed
    fn begin_suspend(&mut self, waker: Waker) -> Suspend;

    /// Retrieves the result.
    ///
    /// Called once, after [`is_ready`] returned `true` or [`begin_suspend`] resumed.
    ///
    /// [`is_ready`]: #tymethod.is_ready
    /// [`begin_suspend`]: #tymethod.begin_suspend
    fn take_result(&mut self) -> Self::Output;
}

/// Turns an [`Awaitable`] into a future.
///
/// [`Awaitable`]: trait.Awaitable.html
pub fn suspend<A: Awaitable>(awaitable: A) -> Suspended<A> {
    Suspended {
        awaitable,
        done: false,
    }
}

/// Future returned by [`suspend`].
///
/// [`suspend`]: fn.suspend.html
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Suspended<A> {
    awaitable: A,
    done: bool,
}

impl<A> Suspended<A> {
    /// Returns the wrapped awaitable.
    pub fn into_inner(self) -> A {
        self.awaitable
    }
}

// The awaitable is only ever reached through `&mut`, it is never pinned.
impl<A> Unpin for Suspended<A> {}

impl<A: Awaitable> Future for Suspended<A> {
    type Output = A::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<A::Output> {
        let this = self.get_mut();
        assert!(!this.done, "`Suspended` polled after completion");

        if !this.awaitable.is_ready() {
            if let Suspend::Suspended = this.awaitable.begin_suspend(cx.waker().clone()) {
                return Poll::Pending;
            }
        }

        this.done = true;
        Poll::Ready(this.awaitable.take_result())
    }
}

impl<A: Awaitable> FusedFuture for Suspended<A> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
