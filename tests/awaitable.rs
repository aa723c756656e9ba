use std::sync::{Arc, Mutex};
use std::task::Waker;
use std::thread;
use std::time::{Duration, Instant};

use coop_rt::future::{self, Awaitable, Blocking, Delay, Suspend};
use coop_rt::scheduler::Scheduler;
use coop_rt::task::{self, Task, TaskError};

/// A hand-rolled collaborator completed from another thread.
#[derive(Clone, Default)]
struct Manual {
    inner: Arc<Mutex<(Option<u32>, Option<Waker>)>>,
}

impl Manual {
    fn complete(&self, v: u32) {
        let waker = {
            let mut inner = self.inner.lock().unwrap();
            inner.0 = Some(v);
            inner.1.take()
        };
        if let Some(w) = waker {
            w.wake();
        }
    }
}

impl Awaitable for Manual {
    type Output = u32;

    fn is_ready(&self) -> bool {
        self.inner.lock().unwrap().0.is_some()
    }

    fn begin_suspend(&mut self, waker: Waker) -> Suspend {
        let mut inner = self.inner.lock().unwrap();
        if inner.0.is_some() {
            return Suspend::Resumed;
        }
        inner.1 = Some(waker);
        Suspend::Suspended
    }

    fn take_result(&mut self) -> u32 {
        self.inner.lock().unwrap().0.take().unwrap()
    }
}

#[test]
fn custom_awaitable_inside_a_task() {
    let op = Manual::default();
    let handle = op.clone();

    let mut t = Task::new(async move { future::suspend(op).await + 1 });
    t.resume();
    assert!(!t.done());

    thread::spawn(move || handle.complete(41)).join().unwrap();

    assert!(t.done());
    assert_eq!(t.take_result().unwrap(), 42);
}

#[test]
fn ready_short_circuits() {
    let r = future::ready("now");
    assert!(r.is_ready());
    assert_eq!(task::block_on(future::suspend(r)), "now");

    let mut r = future::ready(1);
    assert_eq!(r.begin_suspend(futures::task::noop_waker()), Suspend::Resumed);
    assert_eq!(r.take_result(), 1);
}

#[test]
#[should_panic(expected = "taken twice")]
fn ready_result_taken_twice_panics() {
    let mut r = future::ready(1);
    assert_eq!(r.take_result(), 1);
    r.take_result();
}

#[test]
fn delay_waits_at_least_its_duration() {
    let dur = Duration::from_millis(30);
    let start = Instant::now();

    let d = Delay::new(dur);
    assert!(!d.is_ready());
    assert!(d.deadline() >= start + dur);

    task::block_on(future::suspend(d));
    assert!(start.elapsed() >= dur);
}

#[test]
fn blocking_runs_off_thread() {
    let caller = thread::current().id();

    let r = task::block_on(future::suspend(future::blocking(move || {
        thread::current().id() != caller
    })));
    assert!(r.unwrap());
}

#[test]
fn blocking_panic_becomes_task_error() {
    let err = task::block_on(future::suspend(Blocking::<()>::new(|| panic!("blocked"))))
        .unwrap_err();
    assert!(err.is_panic());
    assert_eq!(err.panic_message(), Some("blocked"));
}

#[test]
fn blocking_result_is_taken_once() {
    let mut b = future::blocking(|| 5);
    while !b.is_ready() {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(b.take_result().unwrap(), 5);
    assert!(matches!(b.take_result(), Err(TaskError::Consumed)));
}

#[test]
fn task_is_awaitable() {
    let mut t = Task::new(async { 3 });
    assert!(!t.is_ready());
    assert_eq!(t.begin_suspend(futures::task::noop_waker()), Suspend::Resumed);
    assert!(t.is_ready());
    assert_eq!(Awaitable::take_result(&mut t).unwrap(), 3);
}

#[test]
fn awaitables_on_a_scheduler() {
    let scheduler = Scheduler::new(2);
    scheduler.start().unwrap();

    let t = Task::new(async {
        future::suspend(Delay::new(Duration::from_millis(5))).await;
        let a = future::suspend(future::blocking(|| 20)).await.unwrap();
        let b = future::suspend(future::ready(22)).await;
        a + b
    });
    t.set_scheduler(&scheduler, 1);

    assert_eq!(task::block_on(t).unwrap(), 42);
}
