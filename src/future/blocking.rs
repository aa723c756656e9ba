use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::task::Waker;
use std::thread;

use kv_log_macro::trace;

use super::{Awaitable, Suspend};
use crate::task::TaskError;
use crate::utils::lock;

/// Runs a blocking closure on a background thread.
///
/// The closure starts right away, on a dedicated thread, so it never holds up a scheduler worker.
/// See [`Blocking`].
///
/// [`Blocking`]: struct.Blocking.html
///
/// # Examples
///
/// ```
/// use coop_rt::future;
/// use coop_rt::task::{self, Task};
///
/// let t = Task::new(async {
///     let n = future::suspend(future::blocking(|| (1..=10).sum::<u32>())).await;
///     n.unwrap()
/// });
/// assert_eq!(task::block_on(t).unwrap(), 55);
/// ```
pub fn blocking<F, T>(f: F) -> Blocking<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Blocking::new(f)
}

struct State<T> {
    result: Option<Result<T, TaskError>>,
    waker: Option<Waker>,
    taken: bool,
}

/// An awaitable running a closure on its own thread.
///
/// If the closure panics, the panic is captured and the result is [`TaskError::Panicked`]. If the
/// thread can't be spawned, the result is a [`TaskError::Failed`] carrying the I/O error.
///
/// [`TaskError::Panicked`]: ../task/enum.TaskError.html#variant.Panicked
/// [`TaskError::Failed`]: ../task/enum.TaskError.html#variant.Failed
pub struct Blocking<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Send + 'static> Blocking<T> {
    /// Starts running `f` on a new thread.
    pub fn new<F>(f: F) -> Blocking<T>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let state = Arc::new(Mutex::new(State {
            result: None,
            waker: None,
            taken: false,
        }));

        let shared = state.clone();
        let spawned = thread::Builder::new()
            .name("coop-rt/blocking".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(f)).map_err(TaskError::Panicked);
                Blocking::finish(&shared, result);
            });

        if let Err(err) = spawned {
            trace!("blocking spawn failed", {
                error: err.to_string(),
            });
            Blocking::finish(&state, Err(TaskError::Failed(Box::new(err))));
        }

        Blocking { state }
    }

    fn finish(state: &Mutex<State<T>>, result: Result<T, TaskError>) {
        let waker = {
            let mut state = lock(state);
            state.result = Some(result);
            state.waker.take()
        };

        if let Some(w) = waker {
            w.wake();
        }
    }
}

impl<T: Send + 'static> Awaitable for Blocking<T> {
    type Output = Result<T, TaskError>;

    fn is_ready(&self) -> bool {
        lock(&self.state).result.is_some()
    }

    fn begin_suspend(&mut self, waker: Waker) -> Suspend {
        let mut state = lock(&self.state);
        if state.result.is_some() || state.taken {
            return Suspend::Resumed;
        }
        state.waker = Some(waker);
        Suspend::Suspended
    }

    fn take_result(&mut self) -> Self::Output {
        let mut state = lock(&self.state);
        match state.result.take() {
            Some(result) => {
                state.taken = true;
                result
            }
            None if state.taken => Err(TaskError::Consumed),
            None => Err(TaskError::Incomplete),
        }
    }
}

impl<T> fmt::Debug for Blocking<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Blocking")
            .field("ready", &state.result.is_some())
            .field("taken", &state.taken)
            .finish()
    }
}
