use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::iter;

/// A resumable unit of work waiting in the ready queue.
pub struct Runnable(Box<dyn FnOnce() + Send + 'static>);

impl Runnable {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Runnable
    where
        F: FnOnce() + Send + 'static,
    {
        Runnable(Box::new(f))
    }

    /// Runs the closure on the current thread.
    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Runnable { .. }")
    }
}

/// An entry of the ready queue.
///
/// Entries order by priority first. Among equal priorities the one submitted earlier is greater,
/// so the max-heap pops them in submission order.
struct Entry {
    priority: i32,
    seq: u64,
    runnable: Runnable,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Entry) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Entry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Entry) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A priority queue of runnables, FIFO within a priority.
#[derive(Default)]
pub(crate) struct ReadyQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl ReadyQueue {
    pub(crate) fn push(&mut self, runnable: Runnable, priority: i32) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Entry {
            priority,
            seq,
            runnable,
        });
    }

    pub(crate) fn pop(&mut self) -> Option<Runnable> {
        self.heap.pop().map(|e| e.runnable)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Removes every entry, in the order they would have been popped.
    pub(crate) fn take_all(&mut self) -> Vec<Runnable> {
        iter::from_fn(|| self.pop()).collect()
    }
}
