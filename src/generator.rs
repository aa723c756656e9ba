//! Lazy sequences produced by an async body.
//!
//! A [`Generator`] runs its body on the thread that iterates it. Every
//! [`Yielder::yield_`] hands one item to the iterator and suspends the body until the next call to
//! `next()`. The body may also await tasks, channels, or timers in between; the iterating thread
//! parks until they are ready.
//!
//! An error returned by the body ends the sequence after being yielded once. A panic in the body
//! unwinds out of `next()` and also ends it.
//!
//! # Examples
//!
//! ```
//! use coop_rt::generator::Generator;
//!
//! let fib = Generator::new(|y| async move {
//!     let (mut a, mut b) = (0u64, 1u64);
//!     loop {
//!         y.yield_(a).await;
//!         let next = a + b;
//!         a = b;
//!         b = next;
//!     }
//! });
//!
//! let first: Vec<u64> = fib.values().take(8).collect();
//! assert_eq!(first, vec![0, 1, 1, 2, 3, 5, 8, 13]);
//! ```
//!
//! [`Generator`]: struct.Generator.html
//! [`Yielder::yield_`]: struct.Yielder.html#method.yield_

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use crate::task::Parking;
use crate::utils::lock;

type Body<E> = Pin<Box<dyn Future<Output = Result<(), E>> + 'static>>;

type Start<T, E> = Box<dyn FnOnce(Yielder<T>) -> Body<E> + 'static>;

/// An iterator over the items yielded by an async body.
///
/// Created with [`Generator::new`] for bodies that can't fail, or [`Generator::fallible`] for
/// bodies returning a `Result`. The body doesn't start until the first call to `next()`.
///
/// A panic inside the body propagates out of `next()` and ends the sequence: later calls return
/// `None`.
///
/// [`Generator::new`]: #method.new
/// [`Generator::fallible`]: #method.fallible
pub struct Generator<T, E = Infallible> {
    slot: Arc<Mutex<Option<T>>>,
    start: Option<Start<T, E>>,
    body: Option<Body<E>>,
    parking: Option<Parking>,
}

impl<T: 'static> Generator<T> {
    /// Creates a generator from a body that can't fail.
    pub fn new<F, Fut>(f: F) -> Generator<T>
    where
        F: FnOnce(Yielder<T>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Generator::fallible(move |y| async move {
            f(y).await;
            Ok(())
        })
    }

    /// Returns an iterator over the plain items.
    pub fn values(self) -> impl Iterator<Item = T> {
        self.map(|item| match item {
            Ok(v) => v,
            Err(never) => match never {},
        })
    }
}

impl<T: 'static, E: 'static> Generator<T, E> {
    /// Creates a generator from a body that may fail.
    ///
    /// If the body returns `Err(e)`, the generator yields `Some(Err(e))` once and then ends.
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_rt::generator::Generator;
    ///
    /// let mut g = Generator::fallible(|y| async move {
    ///     y.yield_(1).await;
    ///     Err("out of numbers")
    /// });
    ///
    /// assert_eq!(g.next(), Some(Ok(1)));
    /// assert_eq!(g.next(), Some(Err("out of numbers")));
    /// assert_eq!(g.next(), None);
    /// ```
    pub fn fallible<F, Fut>(f: F) -> Generator<T, E>
    where
        F: FnOnce(Yielder<T>) -> Fut + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
    {
        Generator {
            slot: Arc::new(Mutex::new(None)),
            start: Some(Box::new(move |y| Box::pin(f(y)))),
            body: None,
            parking: None,
        }
    }
}

impl<T, E> Iterator for Generator<T, E> {
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.body.is_none() {
            let start = self.start.take()?;
            self.body = Some(start(Yielder {
                slot: self.slot.clone(),
            }));
        }

        let parking = self.parking.get_or_insert_with(Parking::new);
        let cx = &mut Context::from_waker(&parking.waker);

        loop {
            let body = self.body.as_mut()?;

            let polled = panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(cx)));
            let poll = match polled {
                Ok(poll) => poll,
                Err(payload) => {
                    self.body = None;
                    lock(&self.slot).take();
                    panic::resume_unwind(payload);
                }
            };

            match poll {
                Poll::Ready(res) => {
                    self.body = None;
                    return res.err().map(Err);
                }
                Poll::Pending => {
                    let item = lock(&self.slot).take();
                    match item {
                        Some(v) => return Some(Ok(v)),
                        None => parking.parker.park(),
                    }
                }
            }
        }
    }
}

impl<T, E> fmt::Debug for Generator<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("started", &self.start.is_none())
            .field("finished", &(self.start.is_none() && self.body.is_none()))
            .finish()
    }
}

/// The handle a generator body yields items through.
pub struct Yielder<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Yielder<T> {
    /// Hands `value` to the iterator and suspends until the next item is requested.
    pub fn yield_(&self, value: T) -> Yield<'_, T> {
        Yield {
            yielder: self,
            value: Some(value),
        }
    }
}

impl<T> fmt::Debug for Yielder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Yielder { .. }")
    }
}

/// Future returned by [`Yielder::yield_`].
///
/// [`Yielder::yield_`]: struct.Yielder.html#method.yield_
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Yield<'a, T> {
    yielder: &'a Yielder<T>,
    value: Option<T>,
}

impl<T> Unpin for Yield<'_, T> {}

impl<T> Future for Yield<'_, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match this.value.take() {
            // The iterator picks the value up and polls again on the next `next()`.
            Some(v) => {
                *lock(&this.yielder.slot) = Some(v);
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

impl<T> fmt::Debug for Yield<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Yield { .. }")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn body_is_lazy() {
        let started = Rc::new(Cell::new(false));
        let flag = started.clone();

        let mut g = Generator::new(move |y| async move {
            flag.set(true);
            y.yield_(1).await;
        });

        assert!(!started.get());
        assert_eq!(g.next(), Some(Ok(1)));
        assert!(started.get());
        assert_eq!(g.next(), None);
        assert_eq!(g.next(), None);
    }

    #[test]
    fn empty_body() {
        let mut g = Generator::<u8>::new(|_| async {});
        assert_eq!(g.next(), None);
    }

    #[test]
    fn panic_ends_the_sequence() {
        let mut g = Generator::new(|y| async move {
            y.yield_(1).await;
            panic!("body failed");
        });

        assert_eq!(g.next(), Some(Ok(1)));

        let payload = panic::catch_unwind(AssertUnwindSafe(|| g.next())).unwrap_err();
        assert_eq!(crate::utils::panic_message(&*payload), "body failed");

        assert_eq!(g.next(), None);
        assert_eq!(g.next(), None);
    }

    #[test]
    fn error_ends_the_sequence() {
        let g = Generator::fallible(|y| async move {
            for i in 0..3 {
                y.yield_(i).await;
            }
            Err::<(), _>("stop")
        });

        let items: Vec<_> = g.collect();
        assert_eq!(items, vec![Ok(0), Ok(1), Ok(2), Err("stop")]);
    }
}
