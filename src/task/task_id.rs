use std::fmt;

use crossbeam_utils::atomic::AtomicCell;

/// A unique identifier for a task.
///
/// # Examples
///
/// ```
/// use coop_rt::task::Task;
///
/// let a = Task::new(async { 1 });
/// let b = Task::new(async { 2 });
/// assert_ne!(a.id(), b.id());
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Generates a new `TaskId`.
    pub(crate) fn generate() -> TaskId {
        static COUNTER: AtomicCell<u64> = AtomicCell::new(1u64);

        let id = COUNTER.fetch_add(1);
        if id > u64::max_value() / 2 {
            std::process::abort();
        }
        TaskId(id)
    }

    /// Returns the identifier as a plain integer.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
