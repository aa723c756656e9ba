use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use super::{Awaitable, Suspend};

/// An awaitable that completes after a duration.
///
/// The timer starts when the `Delay` is created. Once it fires, the waiting party is resumed from
/// the timer thread, or from its scheduler if the waiting task is bound to one.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use coop_rt::future::{self, Delay};
/// use coop_rt::task;
///
/// let start = Instant::now();
/// task::block_on(future::suspend(Delay::new(Duration::from_millis(10))));
/// assert!(start.elapsed() >= Duration::from_millis(10));
/// ```
pub struct Delay {
    timer: futures_timer::Delay,
    deadline: Instant,
    fired: bool,
}

impl Delay {
    /// Creates a delay that completes after `dur`.
    pub fn new(dur: Duration) -> Delay {
        Delay {
            timer: futures_timer::Delay::new(dur),
            deadline: Instant::now() + dur,
            fired: false,
        }
    }

    /// Returns the instant the delay completes at.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl Awaitable for Delay {
    type Output = ();

    fn is_ready(&self) -> bool {
        self.fired || Instant::now() >= self.deadline
    }

    fn begin_suspend(&mut self, waker: Waker) -> Suspend {
        let cx = &mut Context::from_waker(&waker);
        match Pin::new(&mut self.timer).poll(cx) {
            Poll::Ready(()) => {
                self.fired = true;
                Suspend::Resumed
            }
            Poll::Pending => Suspend::Suspended,
        }
    }

    fn take_result(&mut self) {}
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delay")
            .field("deadline", &self.deadline)
            .field("fired", &self.fired)
            .finish()
    }
}
