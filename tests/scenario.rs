//! A producer and a consumer connected by a small channel, end to end.

use std::sync::{Arc, Mutex};

use coop_rt::scheduler::Scheduler;
use coop_rt::sync::{Channel, RecvError};
use coop_rt::task::{self, Task};

fn producer(ch: Channel<i32>) -> Task<()> {
    Task::new(async move {
        for i in 0..=4 {
            ch.send(i).await.unwrap();
        }
        ch.close();
    })
}

fn consumer(ch: Channel<i32>, log: Arc<Mutex<Vec<i32>>>) -> Task<RecvError> {
    Task::new(async move {
        loop {
            match ch.recv().await {
                Ok(v) => log.lock().unwrap().push(v),
                Err(e) => return e,
            }
        }
    })
}

#[test]
fn inline_producer_consumer() {
    let ch = Channel::new(2);
    let log = Arc::new(Mutex::new(Vec::new()));

    let p = producer(ch.clone());
    let c = consumer(ch, log.clone());

    p.resume();
    let closed = task::block_on(c).unwrap();

    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(closed, RecvError);
    assert!(p.done());
}

#[test]
fn consumer_first() {
    let ch = Channel::new(2);
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut c = consumer(ch.clone(), log.clone());
    c.resume();
    assert!(!c.done());

    task::block_on(producer(ch)).unwrap();

    assert!(c.done());
    assert_eq!(c.take_result().unwrap(), RecvError);
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn scheduled_producer_consumer() {
    for _ in 0..50 {
        let scheduler = Scheduler::new(3);
        scheduler.start().unwrap();

        let ch = Channel::new(2);
        let log = Arc::new(Mutex::new(Vec::new()));

        let p = producer(ch.clone());
        let c = consumer(ch, log.clone());
        c.start(Some(&scheduler), 1);
        p.start(Some(&scheduler), 0);

        assert_eq!(task::block_on(c).unwrap(), RecvError);
        task::block_on(p).unwrap();

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
