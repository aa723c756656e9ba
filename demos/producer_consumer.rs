//! A producer and two consumers sharing a small channel, on a scheduler.
//!
//! Run with `cargo run --example producer-consumer`. The runtime's trace log is printed too.

use std::time::Duration;

use coop_rt::future;
use coop_rt::scheduler::Scheduler;
use coop_rt::sync::Channel;
use coop_rt::task::{self, Task};

fn main() -> std::io::Result<()> {
    femme::with_level(log::LevelFilter::Trace);

    let scheduler = Scheduler::new(2);
    scheduler.start()?;

    let ch = Channel::new(2);

    let producer = Task::new({
        let ch = ch.clone();
        async move {
            for i in 0..10 {
                ch.send(i).await.unwrap();
                log::info!("produced {}", i);
                future::sleep(Duration::from_millis(20)).await;
            }
            ch.close();
        }
    });

    let consumers: Vec<_> = (0..2)
        .map(|id| {
            let ch = ch.clone();
            let t = Task::new(async move {
                let mut count = 0usize;
                while let Ok(v) = ch.recv().await {
                    log::info!("consumer {} got {}", id, v);
                    count += 1;
                }
                count
            });
            t.start(Some(&scheduler), 1);
            t
        })
        .collect();

    producer.start(Some(&scheduler), 0);

    let total: usize = task::block_on(async {
        let mut total = 0;
        for c in consumers {
            total += c.await.unwrap_or(0);
        }
        total
    });

    log::info!("received {} values", total);
    scheduler.stop();
    Ok(())
}
