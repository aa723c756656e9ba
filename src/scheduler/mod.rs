//! A priority thread pool that resumes suspended work.
//!
//! A [`Scheduler`] owns a fixed number of worker threads draining one shared ready queue. Each
//! entry carries an integer priority: higher priorities run first, and entries of equal priority
//! run in the order they were submitted.
//!
//! Tasks bound to a scheduler (see [`Task::set_scheduler`]) hand every resumption to it, so a
//! computation may start on one worker and continue on another after an `.await`.
//!
//! A stopped scheduler never loses work. Scheduling on it runs the closure inline on the caller's
//! thread, and stopping it runs whatever was still queued on the stopping thread.
//!
//! # Examples
//!
//! ```
//! use std::sync::mpsc;
//!
//! use coop_rt::scheduler::Scheduler;
//!
//! let scheduler = Scheduler::new(2);
//! scheduler.start().unwrap();
//!
//! let (tx, rx) = mpsc::channel();
//! scheduler.schedule(move || tx.send("done").unwrap(), 0);
//! assert_eq!(rx.recv().unwrap(), "done");
//!
//! scheduler.stop();
//! ```
//!
//! [`Scheduler`]: struct.Scheduler.html
//! [`Task::set_scheduler`]: ../task/struct.Task.html#method.set_scheduler

use std::fmt;
use std::io;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use kv_log_macro::{debug, trace};

use crate::utils::{lock, panic_message};

pub use builder::Builder;

use queue::{ReadyQueue, Runnable};

mod builder;
mod queue;
mod worker;

/// The lifecycle and queue of a scheduler, guarded by one lock.
struct State {
    ready: ReadyQueue,
    running: bool,

    /// Bumped on every stop. A worker exits once this no longer matches the value it was
    /// spawned with.
    generation: u64,

    /// Number of workers currently running a continuation.
    active: usize,

    workers: Vec<JoinHandle<()>>,
}

/// State shared between a scheduler, its handles, and its workers.
pub(crate) struct Shared {
    state: Mutex<State>,

    /// Signalled when an entry is queued or the scheduler stops.
    available: Condvar,

    /// Signalled when the queue drains with no worker busy, or the scheduler stops.
    idle: Condvar,
}

/// A pool of worker threads resuming work in priority order.
///
/// A new scheduler is stopped. Call [`start`] to spawn its workers. Dropping a scheduler stops
/// it.
///
/// [`start`]: #method.start
pub struct Scheduler {
    shared: Arc<Shared>,
    num_threads: usize,
    name: String,
}

impl Scheduler {
    /// Creates a stopped scheduler with `num_threads` workers.
    ///
    /// Zero is treated as one.
    pub fn new(num_threads: usize) -> Scheduler {
        Builder::new().num_threads(num_threads).build()
    }

    /// Returns a builder for configuring a scheduler.
    pub fn builder() -> Builder {
        Builder::new()
    }

    fn from_builder(num_threads: usize, name: String) -> Scheduler {
        Scheduler {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    ready: ReadyQueue::default(),
                    running: false,
                    generation: 0,
                    active: 0,
                    workers: Vec::new(),
                }),
                available: Condvar::new(),
                idle: Condvar::new(),
            }),
            num_threads: num_threads.max(1),
            name,
        }
    }

    /// Returns a cloneable handle for submitting work to this scheduler.
    pub fn handle(&self) -> Handle {
        Handle {
            shared: self.shared.clone(),
        }
    }

    /// Returns the number of workers the scheduler runs while started.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Spawns the worker threads.
    ///
    /// Does nothing if the scheduler is already running. A stopped scheduler can be started again.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread can't be spawned. Workers spawned before the failure
    /// are shut down again and the scheduler stays stopped.
    pub fn start(&self) -> io::Result<()> {
        let mut state = lock(&self.shared.state);
        if state.running {
            return Ok(());
        }

        state.running = true;
        let generation = state.generation;

        for index in 0..self.num_threads {
            let shared = self.shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", self.name, index))
                .spawn(move || worker::main_loop(shared, index, generation));

            match spawned {
                Ok(handle) => state.workers.push(handle),
                Err(err) => {
                    drop(state);
                    self.stop();
                    return Err(err);
                }
            }
        }

        trace!("scheduler started", {
            num_threads: self.num_threads,
        });

        Ok(())
    }

    /// Stops the workers and waits for them to exit.
    ///
    /// Calling this more than once, or on a scheduler that never started, does nothing. It may be
    /// called from any thread, including one of the scheduler's own workers, which is then left
    /// to exit on its own instead of being joined.
    ///
    /// A worker finishes the continuation it is running before it exits. Entries still queued
    /// after that are run on the current thread, highest priority first.
    pub fn stop(&self) {
        let (generation, workers) = {
            let mut state = lock(&self.shared.state);
            if !state.running {
                return;
            }
            state.running = false;
            state.generation = state.generation.wrapping_add(1);
            (state.generation, mem::take(&mut state.workers))
        };

        self.shared.available.notify_all();
        self.shared.idle.notify_all();

        let current = thread::current().id();
        for handle in workers {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }

        let leftover = self.take_leftovers(generation);

        trace!("scheduler stopped", {
            leftover: leftover.len(),
        });

        for runnable in leftover {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| runnable.run())) {
                debug!("continuation panicked", {
                    message: panic_message(&*payload),
                });
            }
        }
    }

    /// Drains the queue left behind by the stop that bumped the generation to `generation`.
    ///
    /// If the scheduler was restarted since, the queue belongs to the new workers and is left
    /// alone.
    fn take_leftovers(&self, generation: u64) -> Vec<Runnable> {
        let mut state = lock(&self.shared.state);
        if state.running || state.generation != generation {
            return Vec::new();
        }
        state.ready.take_all()
    }

    /// Queues `f` to run on a worker with the given priority.
    ///
    /// See [`Handle::schedule`].
    ///
    /// [`Handle::schedule`]: struct.Handle.html#method.schedule
    pub fn schedule<F>(&self, f: F, priority: i32)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle().schedule(f, priority)
    }

    /// Queues every closure at priority 0 and wakes all workers.
    ///
    /// If the scheduler is stopped, the closures run inline in iteration order.
    pub fn schedule_batch<I, F>(&self, batch: I)
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() + Send + 'static,
    {
        let runnables: Vec<Runnable> = batch.into_iter().map(Runnable::new).collect();

        let mut state = lock(&self.shared.state);
        if !state.running {
            drop(state);
            for runnable in runnables {
                runnable.run();
            }
            return;
        }

        for runnable in runnables {
            state.ready.push(runnable, 0);
        }
        drop(state);
        self.shared.available.notify_all();
    }

    /// Returns the number of entries waiting in the ready queue.
    ///
    /// The value may be stale by the time it is returned; use it for observation only.
    pub fn queue_size(&self) -> usize {
        lock(&self.shared.state).ready.len()
    }

    /// Returns `true` between a successful [`start`] and the next [`stop`].
    ///
    /// [`start`]: #method.start
    /// [`stop`]: #method.stop
    pub fn is_running(&self) -> bool {
        self.handle().is_running()
    }

    /// Blocks until the ready queue is empty and no worker is running a continuation.
    ///
    /// Returns immediately if the scheduler is stopped, and returns early if it gets stopped while
    /// waiting. Calling this from one of the scheduler's own workers would wait on itself and
    /// never return.
    pub fn wait_for_all(&self) {
        let mut state = lock(&self.shared.state);
        while state.running && (!state.ready.is_empty() || state.active > 0) {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }
}

impl Default for Scheduler {
    /// Creates a stopped scheduler with the default number of workers.
    fn default() -> Scheduler {
        Builder::new().build()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("num_threads", &self.num_threads)
            .field("running", &self.is_running())
            .finish()
    }
}

/// A cheap reference to a scheduler for submitting work.
///
/// A handle does not keep the workers alive: once its [`Scheduler`] is stopped or dropped,
/// everything submitted through the handle runs inline.
///
/// [`Scheduler`]: struct.Scheduler.html
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Shared>,
}

impl Handle {
    /// Queues `f` to run on a worker with the given priority.
    ///
    /// Higher priorities run first; equal priorities run in submission order. One idle worker is
    /// woken.
    ///
    /// If the scheduler is stopped, `f` runs right away on the current thread instead, and a
    /// panic inside it propagates to the caller.
    pub fn schedule<F>(&self, f: F, priority: i32)
    where
        F: FnOnce() + Send + 'static,
    {
        let runnable = Runnable::new(f);

        let mut state = lock(&self.shared.state);
        if !state.running {
            drop(state);
            runnable.run();
            return;
        }

        state.ready.push(runnable, priority);
        drop(state);
        self.shared.available.notify_one();
    }

    /// Returns `true` if the scheduler is running.
    pub fn is_running(&self) -> bool {
        lock(&self.shared.state).running
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("running", &self.is_running())
            .finish()
    }
}
