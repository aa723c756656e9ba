/// Set if a resumption of the task has been requested but hasn't started yet.
///
/// The flag is set by whoever wakes the task. If the task isn't running at that moment, the waker
/// is also responsible for dispatching it, either inline or by handing it to the bound scheduler.
/// If the task is running, the flag tells the running thread to poll the body once more before
/// letting go.
pub(crate) const SCHEDULED: usize = 1 << 0;

/// Set while the body is being polled.
///
/// Only one thread can hold this flag, which is what keeps a task from being resumed
/// concurrently with itself.
pub(crate) const RUNNING: usize = 1 << 1;

/// Set the first time the body is polled. A task without this flag is still lazy.
pub(crate) const STARTED: usize = 1 << 2;

/// Set once the body has returned or panicked and its outcome sits in the result slot.
///
/// This flag can't be unset, and once it is set the task can't be scheduled anymore.
pub(crate) const COMPLETED: usize = 1 << 3;

/// Set once the result has been taken out of the slot.
pub(crate) const TAKEN: usize = 1 << 4;

/// The observable lifecycle stage of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created but never resumed. The body hasn't run at all.
    Created,
    /// The body is being polled right now.
    Running,
    /// The body ran at least once and is parked on something it awaits.
    Suspended,
    /// The body returned a value that hasn't been retrieved yet.
    Completed,
    /// The body failed or panicked and the error hasn't been retrieved yet.
    Failed,
    /// The outcome has been retrieved.
    Consumed,
}

impl TaskState {
    /// Decodes a state word. `failed` tells whether a stored outcome is an error.
    pub(crate) fn from_bits(state: usize, failed: bool) -> TaskState {
        if state & TAKEN != 0 {
            TaskState::Consumed
        } else if state & COMPLETED != 0 {
            if failed {
                TaskState::Failed
            } else {
                TaskState::Completed
            }
        } else if state & RUNNING != 0 {
            TaskState::Running
        } else if state & STARTED != 0 {
            TaskState::Suspended
        } else {
            TaskState::Created
        }
    }

    /// Returns `true` for `Completed`, `Failed`, and `Consumed`.
    pub fn is_done(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Consumed
        )
    }
}
