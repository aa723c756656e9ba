use std::any::Any;
use std::mem;
use std::process;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Calls a function and aborts if it panics.
///
/// This is useful in code where we can't recover from panics, like waking a foreign waker while
/// a task's state is half-updated.
#[inline]
pub(crate) fn abort_on_panic<T>(f: impl FnOnce() -> T) -> T {
    struct Bomb;

    impl Drop for Bomb {
        fn drop(&mut self) {
            process::abort();
        }
    }

    let bomb = Bomb;
    let t = f();
    mem::forget(bomb);
    t
}

/// Locks a mutex, recovering the guard if a previous holder panicked.
///
/// Every critical section in this crate leaves its state consistent before it can unwind, so a
/// poisoned lock carries no broken invariant.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}
