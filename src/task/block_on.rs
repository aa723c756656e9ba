use std::cell::Cell;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use crossbeam_utils::sync::{Parker, Unparker};
use kv_log_macro::trace;

use super::current_id;

/// Blocks the current thread on a future, usually a [`Task`].
///
/// The future is polled on the calling thread. Between polls the thread parks until something
/// wakes the future. Any task that ends up running inline because of this, such as a task the
/// future awaits, runs on the calling thread too.
///
/// If the future panics, the panic is propagated to the caller. A [`Task`] never panics when
/// awaited; it returns the captured panic as a [`TaskError`] instead.
///
/// [`Task`]: struct.Task.html
/// [`TaskError`]: enum.TaskError.html
///
/// # Examples
///
/// ```
/// use coop_rt::task;
///
/// let res = task::block_on(async { 1 + 2 });
/// assert_eq!(res, 3);
/// ```
pub fn block_on<F, T>(future: F) -> T
where
    F: Future<Output = T>,
{
    thread_local! {
        // May hold a pre-allocated parker that can be reused for efficiency.
        //
        // Each invocation of `block_on` needs its own parker. If `block_on` recursively calls
        // itself, the recursive call finds the cache empty and creates a distinct parker.
        static CACHE: Cell<Option<Parking>> = Cell::new(None);
    }

    trace!("block_on", {
        parent_task_id: current_id().map_or(0, |id| id.0),
    });

    pin_utils::pin_mut!(future);

    let parking = CACHE.with(|cache| cache.take()).unwrap_or_else(Parking::new);
    let cx = &mut Context::from_waker(&parking.waker);

    loop {
        if let Poll::Ready(t) = future.as_mut().poll(cx) {
            // Save the parker for the next invocation of `block_on`.
            let _ = CACHE.try_with(|cache| cache.set(Some(parking)));
            return t;
        }
        parking.parker.park();
    }
}

/// A parker paired with a waker that unparks it.
pub(crate) struct Parking {
    pub(crate) parker: Parker,
    pub(crate) waker: Waker,
}

impl Parking {
    pub(crate) fn new() -> Parking {
        let parker = Parker::new();
        let waker = Waker::from(Arc::new(Unpark(parker.unparker().clone())));
        Parking { parker, waker }
    }
}

struct Unpark(Unparker);

impl Wake for Unpark {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}
