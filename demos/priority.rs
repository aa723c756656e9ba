//! Shows the order a single worker picks work in.
//!
//! Run with `cargo run --example priority`.

use std::sync::mpsc;

use coop_rt::scheduler::Scheduler;

fn main() -> std::io::Result<()> {
    femme::with_level(log::LevelFilter::Debug);

    let scheduler = Scheduler::builder()
        .num_threads(1)
        .name("demo".to_string())
        .build();
    scheduler.start()?;

    // Keep the only worker busy while the queue fills up.
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel();
    scheduler.schedule(
        move || {
            let _ = started_tx.send(());
            let _ = gate_rx.recv();
        },
        i32::MAX,
    );
    let _ = started_rx.recv();

    for &(name, priority) in &[("low", 1), ("high", 10), ("medium", 5), ("also low", 1)] {
        scheduler.schedule(move || log::info!("{} (priority {})", name, priority), priority);
    }
    scheduler.schedule(|| panic!("this panic is swallowed by the worker"), 3);

    log::info!("{} entries queued", scheduler.queue_size());
    drop(gate_tx);
    scheduler.wait_for_all();

    scheduler.stop();
    scheduler.schedule(|| log::info!("stopped: this runs inline"), 0);
    Ok(())
}
