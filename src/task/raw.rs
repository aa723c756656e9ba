use std::cell::Cell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

use kv_log_macro::trace;
use pin_project_lite::pin_project;

use super::state::*;
use super::{TaskError, TaskId};
use crate::scheduler::Handle;
use crate::utils::{abort_on_panic, lock};

/// The body of a task after it has been made infallible and panic-safe.
pub(crate) type Body<T> = Pin<Box<dyn Future<Output = Result<T, TaskError>> + Send + 'static>>;

thread_local! {
    /// The task whose body is being polled on this thread.
    static CURRENT: Cell<Option<TaskId>> = Cell::new(None);
}

/// Returns the id of the task running on the current thread, if any.
pub fn current_id() -> Option<TaskId> {
    CURRENT.try_with(|c| c.get()).ok().flatten()
}

/// Sets the current task for the duration of `f`, restoring the previous one afterwards.
fn set_current<F, R>(id: TaskId, f: F) -> R
where
    F: FnOnce() -> R,
{
    struct Reset(Option<TaskId>);

    impl Drop for Reset {
        fn drop(&mut self) {
            let _ = CURRENT.try_with(|c| c.set(self.0));
        }
    }

    let _reset = Reset(CURRENT.with(|c| c.replace(Some(id))));
    f()
}

/// Where the continuation of a task goes once the task is woken or finishes.
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) handle: Handle,
    pub(crate) priority: i32,
}

/// The shared core of a task.
///
/// The core is reference-counted. The `Task` handle holds one reference and every waker handed
/// out to the body holds another, so dropping the handle never frees state a worker or a channel
/// still points at.
pub(crate) struct Core<T> {
    pub(crate) id: TaskId,

    /// Flags from `state.rs`.
    state: AtomicUsize,

    /// The body. `None` once the task has completed.
    body: Mutex<Option<Body<T>>>,

    /// The result slot, written exactly once on completion.
    output: Mutex<Option<Result<T, TaskError>>>,

    /// The party waiting on this task's completion.
    awaiter: Mutex<Option<Waker>>,

    /// The scheduler resumptions are handed to, if any.
    binding: Mutex<Option<Binding>>,
}

impl<T: Send + 'static> Core<T> {
    pub(crate) fn new(body: Body<T>) -> Arc<Core<T>> {
        Arc::new(Core {
            id: TaskId::generate(),
            state: AtomicUsize::new(0),
            body: Mutex::new(Some(body)),
            output: Mutex::new(None),
            awaiter: Mutex::new(None),
            binding: Mutex::new(None),
        })
    }

    #[inline]
    pub(crate) fn state(&self) -> usize {
        self.state.load(Ordering::Acquire)
    }

    pub(crate) fn task_state(&self) -> TaskState {
        let failed = lock(&self.output).as_ref().map_or(false, |o| o.is_err());
        TaskState::from_bits(self.state(), failed)
    }

    pub(crate) fn bind(&self, binding: Binding) {
        *lock(&self.binding) = Some(binding);
    }

    fn binding(&self) -> Option<Binding> {
        lock(&self.binding).clone()
    }

    /// Requests a resumption of the task.
    ///
    /// If the task is idle it gets dispatched right away. If it is running, the running thread
    /// is asked to poll again. If a resumption is already pending or the task is done, nothing
    /// happens.
    pub(crate) fn notify(self: &Arc<Self>) {
        let mut state = self.state();

        loop {
            if state & (COMPLETED | SCHEDULED) != 0 {
                return;
            }

            match self.state.compare_exchange_weak(
                state,
                state | SCHEDULED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if state & RUNNING == 0 {
                        self.dispatch();
                    }
                    return;
                }
                Err(s) => state = s,
            }
        }
    }

    /// Hands a pending resumption to the bound scheduler, or runs it inline.
    fn dispatch(self: &Arc<Self>) {
        match self.binding() {
            Some(Binding { handle, priority }) => {
                let core = self.clone();
                handle.schedule(move || core.run(), priority);
            }
            None => self.run(),
        }
    }

    /// Resumes the body on the current thread until it suspends or completes.
    pub(crate) fn run(self: &Arc<Self>) {
        let mut state = self.state();

        // Acquire the running flag.
        loop {
            if state & COMPLETED != 0 {
                return;
            }

            if state & RUNNING != 0 {
                // Somebody else is polling, possibly further up this very stack. Ask them to
                // poll once more instead of polling concurrently.
                match self.state.compare_exchange_weak(
                    state,
                    state | SCHEDULED,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return,
                    Err(s) => state = s,
                }
                continue;
            }

            match self.state.compare_exchange_weak(
                state,
                (state & !SCHEDULED) | RUNNING | STARTED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(s) => state = s,
            }
        }

        if state & STARTED == 0 {
            trace!("task started", {
                task_id: self.id.0,
            });
        }

        let waker = Waker::from(self.clone());
        let cx = &mut Context::from_waker(&waker);

        loop {
            let poll = set_current(self.id, || {
                let mut body = lock(&self.body);
                match body.as_mut() {
                    Some(future) => future.as_mut().poll(cx),
                    None => Poll::Pending,
                }
            });

            match poll {
                Poll::Ready(output) => return self.complete(output),
                Poll::Pending => {
                    if !self.suspend() {
                        return;
                    }
                }
            }
        }
    }

    /// Releases the running flag after a pending poll.
    ///
    /// Returns `true` if the task was woken while it was being polled and the caller should poll
    /// it again on this thread.
    fn suspend(self: &Arc<Self>) -> bool {
        let binding = self.binding().filter(|b| b.handle.is_running());
        let mut state = self.state();

        loop {
            if state & SCHEDULED == 0 {
                match self.state.compare_exchange_weak(
                    state,
                    state & !RUNNING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return false,
                    Err(s) => state = s,
                }
            } else if let Some(Binding { handle, priority }) = &binding {
                // Keep the scheduled flag: the resumption now sits in the ready queue.
                match self.state.compare_exchange_weak(
                    state,
                    state & !RUNNING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        let core = self.clone();
                        handle.schedule(move || core.run(), *priority);
                        return false;
                    }
                    Err(s) => state = s,
                }
            } else {
                match self.state.compare_exchange_weak(
                    state,
                    state & !SCHEDULED,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return true,
                    Err(s) => state = s,
                }
            }
        }
    }

    /// Stores the outcome and resumes the continuation.
    fn complete(self: &Arc<Self>, output: Result<T, TaskError>) {
        let failed = output.is_err();

        // Drop the body outside of any lock: its destructors may touch other tasks or channels.
        let body = lock(&self.body).take();
        abort_on_panic(|| drop(body));

        *lock(&self.output) = Some(output);

        let mut state = self.state();
        loop {
            match self.state.compare_exchange_weak(
                state,
                (state & !RUNNING & !SCHEDULED) | COMPLETED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(s) => state = s,
            }
        }

        trace!("task completed", {
            task_id: self.id.0,
            failed: failed,
        });

        let awaiter = lock(&self.awaiter).take();
        if let Some(waker) = awaiter {
            match self.binding() {
                Some(Binding { handle, priority }) => {
                    handle.schedule(move || waker.wake(), priority);
                }
                None => abort_on_panic(|| waker.wake()),
            }
        }
    }

    /// Registers the party awaiting this task.
    ///
    /// The same awaiter may re-register with a fresher waker; the slot keeps the latest one.
    pub(crate) fn register(&self, waker: &Waker) {
        let mut awaiter = lock(&self.awaiter);
        match &*awaiter {
            Some(w) if w.will_wake(waker) => {}
            _ => *awaiter = Some(waker.clone()),
        }
    }

    /// Forgets the registered awaiter.
    pub(crate) fn unregister(&self) {
        let awaiter = lock(&self.awaiter).take();
        drop(awaiter);
    }

    /// Takes the outcome out of the result slot.
    pub(crate) fn take_output(&self) -> Result<T, TaskError> {
        let mut state = self.state();

        loop {
            if state & COMPLETED == 0 {
                return Err(TaskError::Incomplete);
            }
            if state & TAKEN != 0 {
                return Err(TaskError::Consumed);
            }

            match self.state.compare_exchange_weak(
                state,
                state | TAKEN,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(s) => state = s,
            }
        }

        lock(&self.output).take().unwrap_or(Err(TaskError::Consumed))
    }
}

impl<T: Send + 'static> Wake for Core<T> {
    fn wake(self: Arc<Self>) {
        self.notify();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.notify();
    }
}

pin_project! {
    /// Polls a task body, turning a panic into a stored failure.
    pub(crate) struct CatchUnwind<F> {
        #[pin]
        future: F,
    }
}

impl<F> CatchUnwind<F> {
    pub(crate) fn new(future: F) -> CatchUnwind<F> {
        CatchUnwind { future }
    }
}

impl<F, T> Future for CatchUnwind<F>
where
    F: Future<Output = Result<T, TaskError>>,
{
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let future = self.project().future;
        match panic::catch_unwind(AssertUnwindSafe(|| future.poll(cx))) {
            Ok(poll) => poll,
            Err(payload) => Poll::Ready(Err(TaskError::Panicked(payload))),
        }
    }
}
