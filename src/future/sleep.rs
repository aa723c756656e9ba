use std::time::Duration;

use futures_timer::Delay;

/// Sleeps for the specified amount of time.
///
/// This function might sleep for slightly longer than the specified duration but never less.
///
/// This function is an async version of [`std::thread::sleep`]: it suspends the calling task
/// instead of blocking its thread.
///
/// [`std::thread::sleep`]: https://doc.rust-lang.org/std/thread/fn.sleep.html
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use coop_rt::future;
/// use coop_rt::task;
///
/// task::block_on(future::sleep(Duration::from_millis(10)));
/// ```
pub async fn sleep(dur: Duration) {
    Delay::new(dur).await
}
