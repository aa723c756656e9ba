use std::time::Duration;

use coop_rt::future;
use coop_rt::generator::Generator;
use coop_rt::scheduler::Scheduler;
use coop_rt::sync::Channel;
use coop_rt::task::Task;

#[test]
fn counts() {
    let g = Generator::new(|y| async move {
        for i in 0..5 {
            y.yield_(i).await;
        }
    });

    assert_eq!(g.values().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn error_is_yielded_once() {
    let mut g = Generator::fallible(|y| async move {
        y.yield_('a').await;
        y.yield_('b').await;
        Err(String::from("broken"))
    });

    assert_eq!(g.next(), Some(Ok('a')));
    assert_eq!(g.next(), Some(Ok('b')));
    assert_eq!(g.next(), Some(Err(String::from("broken"))));
    assert_eq!(g.next(), None);
    assert_eq!(g.next(), None);
}

#[test]
fn body_may_await_timers() {
    let g = Generator::new(|y| async move {
        for i in 0..3 {
            future::sleep(Duration::from_millis(5)).await;
            y.yield_(i).await;
        }
    });

    assert_eq!(g.values().sum::<i32>(), 3);
}

#[test]
fn body_may_await_tasks_on_a_scheduler() {
    let scheduler = Scheduler::new(2);
    scheduler.start().unwrap();

    let ch = Channel::new(1);
    let producer = Task::new({
        let ch = ch.clone();
        async move {
            for word in vec!["alpha", "beta", "gamma"] {
                ch.send(word).await.unwrap();
            }
            ch.close();
        }
    });
    producer.start(Some(&scheduler), 0);

    let g = Generator::new(move |y| async move {
        while let Ok(word) = ch.recv().await {
            y.yield_(word.len()).await;
        }
    });

    assert_eq!(g.values().collect::<Vec<_>>(), vec![5, 4, 5]);
}

#[test]
fn dropped_early() {
    let mut g = Generator::new(|y| async move {
        let mut i = 0u64;
        loop {
            y.yield_(i).await;
            i += 1;
        }
    });

    assert_eq!(g.next(), Some(Ok(0)));
    assert_eq!(g.next(), Some(Ok(1)));
    drop(g);
}
