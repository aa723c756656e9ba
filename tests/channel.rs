use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use coop_rt::future;
use coop_rt::scheduler::Scheduler;
use coop_rt::sync::{Channel, RecvError, TryRecvError, TrySendError};
use coop_rt::task::{self, Task};
use rand::{thread_rng, Rng};

fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn spawn<F, T>(scheduler: &Scheduler, future: F) -> Task<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let t = Task::new(future);
    t.start(Some(scheduler), 0);
    t
}

fn pool() -> Scheduler {
    let scheduler = Scheduler::new(4);
    scheduler.start().unwrap();
    scheduler
}

#[test]
fn smoke() {
    task::block_on(async {
        let ch = Channel::new(1);

        ch.send(7).await.unwrap();
        assert_eq!(ch.recv().await.unwrap(), 7);

        ch.send(8).await.unwrap();
        assert_eq!(ch.recv().await.unwrap(), 8);

        ch.close();
        assert!(ch.recv().await.is_err());
    });
}

#[test]
fn capacity() {
    for i in 0..10 {
        let ch = Channel::<()>::new(i);
        assert_eq!(ch.capacity(), i);
    }
}

#[test]
fn len_empty_full() {
    task::block_on(async {
        let ch = Channel::new(2);

        assert_eq!(ch.len(), 0);
        assert!(ch.is_empty());
        assert!(!ch.is_full());

        ch.send(()).await.unwrap();

        assert_eq!(ch.len(), 1);
        assert!(!ch.is_empty());
        assert!(!ch.is_full());

        ch.send(()).await.unwrap();

        assert_eq!(ch.len(), 2);
        assert!(!ch.is_empty());
        assert!(ch.is_full());

        let _ = ch.recv().await;

        assert_eq!(ch.len(), 1);
        assert!(!ch.is_empty());
        assert!(!ch.is_full());
    })
}

#[test]
fn third_send_waits_for_first_recv() {
    let ch = Channel::new(2);
    let sent = Arc::new(AtomicUsize::new(0));

    let mut producer = Task::new({
        let ch = ch.clone();
        let sent = sent.clone();
        async move {
            for i in 1..=3 {
                ch.send(i).await.unwrap();
                sent.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    producer.resume();
    assert_eq!(sent.load(Ordering::SeqCst), 2);
    assert!(!producer.done());
    assert_eq!(ch.len(), 2);

    // Freeing a slot lets the waiting sender in.
    assert_eq!(ch.try_recv(), Ok(1));
    assert_eq!(sent.load(Ordering::SeqCst), 3);
    assert!(producer.done());
    producer.take_result().unwrap();

    assert_eq!(ch.try_recv(), Ok(2));
    assert_eq!(ch.try_recv(), Ok(3));
    assert_eq!(ch.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn close_keeps_buffered_values() {
    task::block_on(async {
        let ch = Channel::new(1);
        ch.send(1).await.unwrap();
        assert!(ch.close());

        assert!(ch.is_closed());
        assert_eq!(ch.recv().await, Ok(1));
        assert_eq!(ch.recv().await, Err(RecvError));
        assert_eq!(ch.recv().await, Err(RecvError));
    })
}

#[test]
fn close_is_idempotent() {
    let ch = Channel::<u8>::new(3);
    assert!(ch.close());
    assert!(!ch.close());
    assert!(!ch.close());
    assert!(ch.is_closed());
}

#[test]
fn send_after_close_returns_value() {
    let ch = Channel::new(4);
    ch.close();

    let err = task::block_on(ch.send(String::from("lost?"))).unwrap_err();
    assert_eq!(err.into_inner(), "lost?");
    assert_eq!(ch.try_send(5.to_string()), Err(TrySendError::Closed("5".into())));
}

#[test]
fn rendezvous() {
    let ch = Channel::new(0);

    let mut sender = Task::new({
        let ch = ch.clone();
        async move { ch.send("hi").await }
    });

    sender.resume();
    assert!(!sender.done());
    assert!(ch.is_empty());

    assert_eq!(task::block_on(ch.recv()), Ok("hi"));
    assert!(sender.done());
    assert_eq!(sender.take_result().unwrap(), Ok(()));
}

#[test]
fn rendezvous_receiver_first() {
    let ch = Channel::new(0);

    let mut receiver = Task::new({
        let ch = ch.clone();
        async move { ch.recv().await }
    });
    receiver.resume();
    assert!(!receiver.done());

    assert_eq!(ch.try_send(9), Ok(()));
    assert!(receiver.done());
    assert_eq!(receiver.take_result().unwrap(), Ok(9));
}

#[test]
fn close_wakes_waiters() {
    let full = Channel::new(1);
    full.try_send(0).unwrap();
    let empty = Channel::<i32>::new(1);

    let mut sender = Task::new({
        let full = full.clone();
        async move { full.send(1).await.map_err(|e| e.into_inner()) }
    });
    let mut receiver = Task::new({
        let empty = empty.clone();
        async move { empty.recv().await }
    });

    sender.resume();
    receiver.resume();
    assert!(!sender.done());
    assert!(!receiver.done());

    full.close();
    empty.close();

    assert_eq!(sender.take_result().unwrap(), Err(1));
    assert_eq!(receiver.take_result().unwrap(), Err(RecvError));

    // The value that was already buffered is still there.
    assert_eq!(full.try_recv(), Ok(0));
    assert_eq!(full.try_recv(), Err(TryRecvError::Closed));
}

#[test]
fn waiting_senders_are_fifo() {
    let ch = Channel::new(1);
    ch.try_send(0).unwrap();

    let senders: Vec<_> = (1..=3)
        .map(|i| {
            let ch = ch.clone();
            let t = Task::new(async move { ch.send(i).await.unwrap() });
            t.resume();
            t
        })
        .collect();

    for i in 0..=3 {
        assert_eq!(ch.try_recv(), Ok(i));
    }
    assert!(senders.iter().all(|t| t.done()));
}

#[test]
fn waiting_receivers_are_fifo() {
    let ch = Channel::new(0);

    let mut receivers: Vec<_> = (0..3)
        .map(|_| {
            let ch = ch.clone();
            let t = Task::new(async move { ch.recv().await.unwrap() });
            t.resume();
            t
        })
        .collect();

    for i in 0..3 {
        ch.try_send(i).unwrap();
    }

    for (i, t) in receivers.iter_mut().enumerate() {
        assert_eq!(t.take_result().unwrap(), i);
    }
}

#[test]
fn recv_with_delays() {
    let scheduler = pool();

    task::block_on(async {
        let ch = Channel::new(100);

        let child = spawn(&scheduler, {
            let ch = ch.clone();
            async move {
                assert_eq!(ch.recv().await.unwrap(), 7);
                future::sleep(ms(100)).await;
                assert_eq!(ch.recv().await.unwrap(), 8);
                future::sleep(ms(100)).await;
                assert_eq!(ch.recv().await.unwrap(), 9);
                assert!(ch.recv().await.is_err());
            }
        });

        future::sleep(ms(150)).await;
        ch.send(7).await.unwrap();
        ch.send(8).await.unwrap();
        ch.send(9).await.unwrap();
        ch.close();

        child.await.unwrap();
    })
}

#[test]
fn spsc() {
    const COUNT: usize = 20_000;

    let scheduler = pool();

    task::block_on(async {
        let ch = Channel::new(3);

        let child = spawn(&scheduler, {
            let ch = ch.clone();
            async move {
                for i in 0..COUNT {
                    assert_eq!(ch.recv().await.unwrap(), i);
                }
                assert!(ch.recv().await.is_err());
            }
        });

        for i in 0..COUNT {
            ch.send(i).await.unwrap();
        }
        ch.close();

        child.await.unwrap();
    })
}

#[test]
fn mpmc() {
    const COUNT: usize = 5_000;
    const TASKS: usize = 4;

    let scheduler = pool();

    task::block_on(async {
        let ch = Channel::<usize>::new(3);
        let v = (0..COUNT).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>();
        let v = Arc::new(v);

        let mut tasks = Vec::new();

        for _ in 0..TASKS {
            let ch = ch.clone();
            let v = v.clone();
            tasks.push(spawn(&scheduler, async move {
                for _ in 0..COUNT {
                    let n = ch.recv().await.unwrap();
                    v[n].fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        for _ in 0..TASKS {
            let ch = ch.clone();
            tasks.push(spawn(&scheduler, async move {
                for i in 0..COUNT {
                    ch.send(i).await.unwrap();
                }
            }));
        }

        for t in tasks {
            t.await.unwrap();
        }

        for c in v.iter() {
            assert_eq!(c.load(Ordering::SeqCst), TASKS);
        }
    });
}

#[test]
fn oneshot() {
    const COUNT: usize = 2_000;

    let scheduler = pool();

    task::block_on(async {
        for _ in 0..COUNT {
            let ch = Channel::new(0);

            let c1 = spawn(&scheduler, {
                let ch = ch.clone();
                async move { ch.recv().await.unwrap() }
            });
            let c2 = spawn(&scheduler, async move { ch.send(0).await.unwrap() });

            assert_eq!(c1.await.unwrap(), 0);
            c2.await.unwrap();
        }
    })
}

#[test]
fn drops() {
    const RUNS: usize = 50;

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug, PartialEq)]
    struct DropCounter;

    impl Drop for DropCounter {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }

    let scheduler = pool();
    let mut rng = thread_rng();

    for _ in 0..RUNS {
        let steps = rng.gen_range(0..2_000);
        let additional = rng.gen_range(0..50);

        task::block_on(async {
            DROPS.store(0, Ordering::SeqCst);
            let ch = Channel::<DropCounter>::new(50);

            let child = spawn(&scheduler, {
                let ch = ch.clone();
                async move {
                    for _ in 0..steps {
                        ch.recv().await.unwrap();
                    }
                }
            });

            for _ in 0..steps {
                ch.send(DropCounter).await.unwrap();
            }

            child.await.unwrap();

            for _ in 0..additional {
                ch.send(DropCounter).await.unwrap();
            }

            assert_eq!(DROPS.load(Ordering::SeqCst), steps);
            drop(ch);
            assert_eq!(DROPS.load(Ordering::SeqCst), steps + additional);
        })
    }
}
