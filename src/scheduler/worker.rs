use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use kv_log_macro::{debug, trace};

use super::Shared;
use crate::utils::{lock, panic_message};

/// Main loop running a worker thread.
///
/// The worker sleeps until the ready queue has an entry, pops the most urgent one, and runs it.
/// It exits as soon as the scheduler is stopped, even if entries are left in the queue.
pub(crate) fn main_loop(shared: Arc<Shared>, index: usize, generation: u64) {
    loop {
        let runnable = {
            let mut state = lock(&shared.state);
            loop {
                if state.generation != generation {
                    trace!("worker exit", {
                        index: index,
                    });
                    return;
                }
                if let Some(r) = state.ready.pop() {
                    state.active += 1;
                    break r;
                }
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(|e| e.into_inner());
            }
        };

        // A panic escaping a continuation must not take the worker down with it.
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| runnable.run())) {
            debug!("continuation panicked", {
                index: index,
                message: panic_message(&*payload),
            });
        }

        let mut state = lock(&shared.state);
        state.active -= 1;
        if state.ready.is_empty() && state.active == 0 {
            shared.idle.notify_all();
        }
    }
}
