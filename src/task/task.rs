use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures_core::future::FusedFuture;
use kv_log_macro::trace;

use super::raw::{Binding, CatchUnwind, Core};
use super::state::{TaskState, COMPLETED, STARTED, TAKEN};
use super::{current_id, BoxError, TaskError, TaskId};
use crate::future::{Awaitable, Suspend};
use crate::scheduler::Scheduler;

/// A lazy, suspendable unit of work with a single result slot.
///
/// Creating a task does not run anything. The body starts when the task is first [awaited],
/// [resumed], or [started]. From then on the body runs until it reaches a point where it has to
/// wait (on another task, a [`Channel`], or any other future), and is resumed once that wait is
/// over.
///
/// When the body finishes, its outcome is stored in the task and the party awaiting the task is
/// resumed. If the task is bound to a [`Scheduler`], that resumption goes through the
/// scheduler's ready queue at the task's priority; otherwise it happens inline on the thread that
/// finished the task.
///
/// # Errors
///
/// A body created with [`Task::fallible`] can return an error, and any body can panic. Both are
/// caught and stored as a [`TaskError`], and only surface when the result is retrieved. A task
/// whose result is never retrieved silently discards its error.
///
/// # Dropping
///
/// Dropping the handle of a task that never started drops its body without running it. Dropping
/// the handle of a suspended task only releases the handle: the body keeps running whenever it is
/// woken and its result is discarded.
///
/// [awaited]: #impl-Future
/// [resumed]: #method.resume
/// [started]: #method.start
/// [`Channel`]: ../sync/struct.Channel.html
/// [`Scheduler`]: ../scheduler/struct.Scheduler.html
/// [`TaskError`]: enum.TaskError.html
/// [`Task::fallible`]: #method.fallible
///
/// # Examples
///
/// ```
/// use coop_rt::task::{self, Task};
///
/// let inner = Task::new(async { 20 });
/// let outer = Task::new(async move {
///     let x = inner.await.unwrap();
///     x + 1
/// });
///
/// assert_eq!(task::block_on(outer).unwrap(), 21);
/// ```
pub struct Task<T> {
    core: Arc<Core<T>>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a task from a body that produces a value.
    ///
    /// The body only fails if it panics.
    pub fn new<F>(future: F) -> Task<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        Task::from_body(async move { Ok(future.await) })
    }

    /// Creates a task from a body that may return an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_rt::task::{self, Task};
    ///
    /// let t = Task::<u32>::fallible(async { Err("no luck") });
    /// let err = task::block_on(t).unwrap_err();
    /// assert_eq!(err.to_string(), "task failed: no luck");
    /// ```
    pub fn fallible<F, E>(future: F) -> Task<T>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Task::from_body(async move { future.await.map_err(|e| TaskError::Failed(e.into())) })
    }

    fn from_body<F>(body: F) -> Task<T>
    where
        F: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let core = Core::new(Box::pin(CatchUnwind::new(body)));

        trace!("task created", {
            task_id: core.id.0,
            parent_task_id: current_id().map_or(0, |id| id.0),
        });

        Task { core }
    }

    /// Returns the task's unique identifier.
    pub fn id(&self) -> TaskId {
        self.core.id
    }

    /// Returns `true` if the body has returned, failed, or panicked.
    ///
    /// This has no side effects.
    pub fn done(&self) -> bool {
        self.core.state() & COMPLETED != 0
    }

    /// Returns the current lifecycle stage of the task.
    pub fn state(&self) -> TaskState {
        self.core.task_state()
    }

    /// Resumes the body on the current thread until it next suspends or completes.
    ///
    /// This ignores any scheduler the task is bound to. It is a no-op if the task is done, and if
    /// the body is being polled by another thread at the same moment, that thread is asked to
    /// poll once more instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_rt::task::Task;
    ///
    /// let t = Task::new(async { 7 });
    /// assert!(!t.done());
    /// t.resume();
    /// assert!(t.done());
    /// ```
    pub fn resume(&self) {
        if !self.done() {
            self.core.run();
        }
    }

    /// Binds the task to a scheduler.
    ///
    /// From now on, every resumption of the body and the resumption of whoever awaits it are
    /// handed to `scheduler` with the given `priority` (higher runs first) instead of running
    /// inline.
    pub fn set_scheduler(&self, scheduler: &Scheduler, priority: i32) {
        self.core.bind(Binding {
            handle: scheduler.handle(),
            priority,
        });
    }

    /// Starts the task without awaiting it.
    ///
    /// With a scheduler, the task is bound to it and its first resumption is queued. Without one,
    /// the body starts running on the current thread. Starting a task that already started does
    /// nothing.
    pub fn start(&self, scheduler: Option<&Scheduler>, priority: i32) {
        if let Some(scheduler) = scheduler {
            self.set_scheduler(scheduler, priority);
        }
        self.kick();
    }

    /// Retrieves the outcome of a finished task without awaiting it.
    ///
    /// Returns [`TaskError::Incomplete`] if the task isn't done yet and [`TaskError::Consumed`]
    /// if the outcome was already retrieved.
    ///
    /// [`TaskError::Incomplete`]: enum.TaskError.html#variant.Incomplete
    /// [`TaskError::Consumed`]: enum.TaskError.html#variant.Consumed
    pub fn take_result(&mut self) -> Result<T, TaskError> {
        self.core.take_output()
    }

    /// Triggers the first resumption if the body has never run.
    fn kick(&self) {
        if self.core.state() & STARTED == 0 {
            self.core.notify();
        }
    }
}

impl<T> Unpin for Task<T> {}

impl<T: Send + 'static> Future for Task<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let core = &self.core;

        if core.state() & COMPLETED != 0 {
            return Poll::Ready(core.take_output());
        }

        // Register first, then start: the body may finish inline before `notify` returns.
        core.register(cx.waker());
        self.kick();

        if core.state() & COMPLETED != 0 {
            core.unregister();
            return Poll::Ready(core.take_output());
        }

        Poll::Pending
    }
}

impl<T: Send + 'static> FusedFuture for Task<T> {
    fn is_terminated(&self) -> bool {
        self.core.state() & TAKEN != 0
    }
}

impl<T: Send + 'static> Awaitable for Task<T> {
    type Output = Result<T, TaskError>;

    fn is_ready(&self) -> bool {
        self.done()
    }

    fn begin_suspend(&mut self, waker: Waker) -> Suspend {
        self.core.register(&waker);
        self.kick();

        if self.done() {
            self.core.unregister();
            Suspend::Resumed
        } else {
            Suspend::Suspended
        }
    }

    fn take_result(&mut self) -> Self::Output {
        self.core.take_output()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.core.id)
            .finish()
    }
}
