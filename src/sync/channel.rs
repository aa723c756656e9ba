use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use futures_core::future::FusedFuture;
use slab::Slab;

use super::{RecvError, SendError, TryRecvError, TrySendError};
use crate::utils::lock;

/// A bounded multi-producer multi-consumer channel.
///
/// The channel buffers at most `capacity` values. A capacity of zero makes it a rendezvous
/// channel: every [`send`] waits until a receiver takes the value directly.
///
/// Senders and receivers that can't make progress wait in two FIFO queues. A value goes to the
/// longest-waiting receiver before it is considered for the buffer, and a slot freed in the buffer
/// goes to the longest-waiting sender before any new value.
///
/// The channel stays open until [`close`] is called. Closing wakes every waiting sender and
/// receiver with an error, but keeps buffered values around so receivers can drain them.
///
/// Cloning a `Channel` creates another handle to the same channel.
///
/// [`send`]: #method.send
/// [`close`]: #method.close
///
/// # Examples
///
/// ```
/// use coop_rt::sync::Channel;
/// use coop_rt::task::{self, Task};
///
/// let ch = Channel::new(1);
///
/// let producer = {
///     let ch = ch.clone();
///     Task::new(async move {
///         for i in 0..3 {
///             ch.send(i).await.unwrap();
///         }
///         ch.close();
///     })
/// };
///
/// let consumer = Task::new(async move {
///     let mut got = Vec::new();
///     while let Ok(v) = ch.recv().await {
///         got.push(v);
///     }
///     got
/// });
///
/// producer.resume();
/// assert_eq!(task::block_on(consumer).unwrap(), vec![0, 1, 2]);
/// ```
pub struct Channel<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    capacity: usize,
    state: Mutex<State<T>>,
}

/// A waiting sender's slot.
enum SendSlot<T> {
    /// Parked with its value.
    Waiting(T, Waker),

    /// The value was taken by a receiver or moved into the buffer.
    Sent,

    /// The channel closed first; the value is handed back.
    Closed(T),
}

/// A waiting receiver's slot.
enum RecvSlot<T> {
    Waiting(Waker),
    Received(T),
    Closed,
}

struct State<T> {
    buffer: VecDeque<T>,

    /// Keys into `send_slots` in arrival order.
    senders: VecDeque<usize>,

    /// Keys into `recv_slots` in arrival order.
    receivers: VecDeque<usize>,

    send_slots: Slab<SendSlot<T>>,
    recv_slots: Slab<RecvSlot<T>>,
    closed: bool,
}

impl<T> State<T> {
    /// Takes the value a receiver should get next, if one is available.
    ///
    /// Buffered values come first. Taking one lets the longest-waiting sender move its value into
    /// the freed slot. With an empty buffer, the value comes straight from a waiting sender.
    fn take(&mut self, capacity: usize) -> Option<(T, Option<Waker>)> {
        match self.buffer.pop_front() {
            Some(value) if self.buffer.len() < capacity => {
                let waker = self.take_from_sender().map(|(refill, waker)| {
                    self.buffer.push_back(refill);
                    waker
                });
                Some((value, waker))
            }
            Some(value) => Some((value, None)),
            None => self
                .take_from_sender()
                .map(|(value, waker)| (value, Some(waker))),
        }
    }

    fn take_from_sender(&mut self) -> Option<(T, Waker)> {
        while let Some(key) = self.senders.pop_front() {
            match mem::replace(&mut self.send_slots[key], SendSlot::Sent) {
                SendSlot::Waiting(value, waker) => return Some((value, waker)),
                other => self.send_slots[key] = other,
            }
        }
        None
    }

    /// Hands a value to the longest-waiting receiver, or buffers it if there is room.
    ///
    /// Gives the value back if neither is possible.
    fn offer(&mut self, value: T, capacity: usize) -> Result<Option<Waker>, T> {
        if let Some(key) = self.receivers.pop_front() {
            let waker = match mem::replace(&mut self.recv_slots[key], RecvSlot::Received(value)) {
                RecvSlot::Waiting(waker) => Some(waker),
                _ => None,
            };
            return Ok(waker);
        }

        if self.buffer.len() < capacity {
            self.buffer.push_back(value);
            return Ok(None);
        }

        Err(value)
    }

    /// Puts back a value whose receiver went away before observing it.
    fn forward(&mut self, value: T) -> Option<Waker> {
        if let Some(key) = self.receivers.pop_front() {
            return match mem::replace(&mut self.recv_slots[key], RecvSlot::Received(value)) {
                RecvSlot::Waiting(waker) => Some(waker),
                _ => None,
            };
        }

        // This may briefly push the buffer one past its capacity.
        self.buffer.push_front(value);
        None
    }
}

impl<T> Channel<T> {
    /// Creates a channel that buffers up to `capacity` values.
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_rt::sync::Channel;
    ///
    /// let ch = Channel::<i32>::new(4);
    /// assert_eq!(ch.capacity(), 4);
    /// assert!(ch.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Channel<T> {
        Channel {
            inner: Arc::new(Inner {
                capacity,
                state: Mutex::new(State {
                    buffer: VecDeque::with_capacity(capacity),
                    senders: VecDeque::new(),
                    receivers: VecDeque::new(),
                    send_slots: Slab::new(),
                    recv_slots: Slab::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Sends a value into the channel.
    ///
    /// The returned future completes right away if a receiver is waiting or the buffer has room.
    /// Otherwise it waits in line behind earlier senders until a slot frees up or a receiver
    /// arrives.
    ///
    /// # Errors
    ///
    /// Fails with the value handed back if the channel is closed when the send starts, or gets
    /// closed while the send is waiting.
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_rt::sync::Channel;
    /// use coop_rt::task;
    ///
    /// let ch = Channel::new(1);
    /// task::block_on(ch.send("hello")).unwrap();
    ///
    /// ch.close();
    /// let err = task::block_on(ch.send("world")).unwrap_err();
    /// assert_eq!(err.into_inner(), "world");
    /// ```
    pub fn send(&self, value: T) -> Send<'_, T> {
        Send {
            channel: self,
            state: SendState::Init(value),
        }
    }

    /// Receives a value from the channel.
    ///
    /// The returned future completes right away if a value is buffered or a sender is waiting.
    /// Otherwise it waits in line behind earlier receivers.
    ///
    /// # Errors
    ///
    /// Fails once the channel is closed and there is nothing left to receive.
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_rt::sync::Channel;
    /// use coop_rt::task;
    ///
    /// let ch = Channel::new(2);
    /// task::block_on(async {
    ///     ch.send(1).await.unwrap();
    ///     ch.close();
    ///
    ///     assert_eq!(ch.recv().await, Ok(1));
    ///     assert!(ch.recv().await.is_err());
    /// });
    /// ```
    pub fn recv(&self) -> Recv<'_, T> {
        Recv {
            channel: self,
            state: RecvState::Init,
        }
    }

    /// Attempts to send a value without waiting.
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_rt::sync::{Channel, TrySendError};
    ///
    /// let ch = Channel::new(1);
    /// assert_eq!(ch.try_send(1), Ok(()));
    /// assert_eq!(ch.try_send(2), Err(TrySendError::Full(2)));
    ///
    /// ch.close();
    /// assert_eq!(ch.try_send(3), Err(TrySendError::Closed(3)));
    /// ```
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut state = lock(&self.inner.state);
        if state.closed {
            return Err(TrySendError::Closed(value));
        }

        match state.offer(value, self.inner.capacity) {
            Ok(waker) => {
                drop(state);
                if let Some(w) = waker {
                    w.wake();
                }
                Ok(())
            }
            Err(value) => Err(TrySendError::Full(value)),
        }
    }

    /// Attempts to receive a value without waiting.
    ///
    /// # Examples
    ///
    /// ```
    /// use coop_rt::sync::{Channel, TryRecvError};
    ///
    /// let ch = Channel::new(1);
    /// assert_eq!(ch.try_recv(), Err(TryRecvError::Empty));
    ///
    /// ch.try_send(5).unwrap();
    /// ch.close();
    /// assert_eq!(ch.try_recv(), Ok(5));
    /// assert_eq!(ch.try_recv(), Err(TryRecvError::Closed));
    /// ```
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let mut state = lock(&self.inner.state);

        match state.take(self.inner.capacity) {
            Some((value, waker)) => {
                drop(state);
                if let Some(w) = waker {
                    w.wake();
                }
                Ok(value)
            }
            None if state.closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Closes the channel.
    ///
    /// Every waiting sender and receiver is woken and fails. Buffered values stay available to
    /// receivers. Returns `true` if this call closed the channel and `false` if it was already
    /// closed.
    pub fn close(&self) -> bool {
        let wakers = {
            let mut state = lock(&self.inner.state);
            if state.closed {
                return false;
            }
            state.closed = true;

            let mut wakers = Vec::with_capacity(state.senders.len() + state.receivers.len());
            let State {
                senders,
                receivers,
                send_slots,
                recv_slots,
                ..
            } = &mut *state;

            for key in receivers.drain(..) {
                if let RecvSlot::Waiting(w) = mem::replace(&mut recv_slots[key], RecvSlot::Closed) {
                    wakers.push(w);
                }
            }

            for key in senders.drain(..) {
                let slot = mem::replace(&mut send_slots[key], SendSlot::Sent);
                if let SendSlot::Waiting(value, w) = slot {
                    send_slots[key] = SendSlot::Closed(value);
                    wakers.push(w);
                }
            }

            wakers
        };

        for w in wakers {
            w.wake();
        }
        true
    }

    /// Returns `true` if the channel is closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.inner.state).closed
    }

    /// Returns the number of buffered values.
    pub fn len(&self) -> usize {
        lock(&self.inner.state).buffer.len()
    }

    /// Returns `true` if no value is buffered.
    pub fn is_empty(&self) -> bool {
        lock(&self.inner.state).buffer.is_empty()
    }

    /// Returns `true` if the buffer has no room left.
    ///
    /// A rendezvous channel is always full.
    pub fn is_full(&self) -> bool {
        lock(&self.inner.state).buffer.len() >= self.inner.capacity
    }

    /// Returns the channel's capacity.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Channel<T> {
        Channel {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Channel")
            .field("capacity", &self.inner.capacity)
            .field("len", &state.buffer.len())
            .field("senders", &state.senders.len())
            .field("receivers", &state.receivers.len())
            .field("closed", &state.closed)
            .finish()
    }
}

enum SendState<T> {
    Init(T),
    Parked(usize),
    Done,
}

/// Future returned by [`Channel::send`].
///
/// Dropping it while it waits withdraws the send, and the value is dropped with it.
///
/// [`Channel::send`]: struct.Channel.html#method.send
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Send<'a, T> {
    channel: &'a Channel<T>,
    state: SendState<T>,
}

impl<T> Unpin for Send<'_, T> {}

impl<T> Future for Send<'_, T> {
    type Output = Result<(), SendError<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let inner = &this.channel.inner;

        match mem::replace(&mut this.state, SendState::Done) {
            SendState::Init(value) => {
                let mut state = lock(&inner.state);
                if state.closed {
                    return Poll::Ready(Err(SendError(value)));
                }

                match state.offer(value, inner.capacity) {
                    Ok(waker) => {
                        drop(state);
                        if let Some(w) = waker {
                            w.wake();
                        }
                        Poll::Ready(Ok(()))
                    }
                    Err(value) => {
                        let key = state
                            .send_slots
                            .insert(SendSlot::Waiting(value, cx.waker().clone()));
                        state.senders.push_back(key);
                        this.state = SendState::Parked(key);
                        Poll::Pending
                    }
                }
            }
            SendState::Parked(key) => {
                let mut state = lock(&inner.state);
                match mem::replace(&mut state.send_slots[key], SendSlot::Sent) {
                    SendSlot::Waiting(value, w) => {
                        let w = if w.will_wake(cx.waker()) {
                            w
                        } else {
                            cx.waker().clone()
                        };
                        state.send_slots[key] = SendSlot::Waiting(value, w);
                        this.state = SendState::Parked(key);
                        Poll::Pending
                    }
                    SendSlot::Sent => {
                        state.send_slots.remove(key);
                        Poll::Ready(Ok(()))
                    }
                    SendSlot::Closed(value) => {
                        state.send_slots.remove(key);
                        Poll::Ready(Err(SendError(value)))
                    }
                }
            }
            SendState::Done => panic!("`Send` polled after completion"),
        }
    }
}

impl<T> FusedFuture for Send<'_, T> {
    fn is_terminated(&self) -> bool {
        matches!(self.state, SendState::Done)
    }
}

impl<T> Drop for Send<'_, T> {
    fn drop(&mut self) {
        if let SendState::Parked(key) = self.state {
            let slot = {
                let mut state = lock(&self.channel.inner.state);
                let slot = state.send_slots.remove(key);
                if let SendSlot::Waiting(..) = slot {
                    state.senders.retain(|&k| k != key);
                }
                slot
            };
            // The withdrawn value is dropped outside the lock.
            drop(slot);
        }
    }
}

impl<T> fmt::Debug for Send<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Send { .. }")
    }
}

enum RecvState {
    Init,
    Parked(usize),
    Done,
}

/// Future returned by [`Channel::recv`].
///
/// If it is dropped after a value was handed to it but before it was polled again, the value is
/// passed on to the next waiting receiver, or put back at the front of the buffer.
///
/// [`Channel::recv`]: struct.Channel.html#method.recv
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Recv<'a, T> {
    channel: &'a Channel<T>,
    state: RecvState,
}

impl<T> Unpin for Recv<'_, T> {}

impl<T> Future for Recv<'_, T> {
    type Output = Result<T, RecvError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let inner = &this.channel.inner;

        match mem::replace(&mut this.state, RecvState::Done) {
            RecvState::Init => {
                let mut state = lock(&inner.state);

                if let Some((value, waker)) = state.take(inner.capacity) {
                    drop(state);
                    if let Some(w) = waker {
                        w.wake();
                    }
                    return Poll::Ready(Ok(value));
                }

                if state.closed {
                    return Poll::Ready(Err(RecvError));
                }

                let key = state
                    .recv_slots
                    .insert(RecvSlot::Waiting(cx.waker().clone()));
                state.receivers.push_back(key);
                this.state = RecvState::Parked(key);
                Poll::Pending
            }
            RecvState::Parked(key) => {
                let mut state = lock(&inner.state);
                match mem::replace(&mut state.recv_slots[key], RecvSlot::Closed) {
                    RecvSlot::Waiting(w) => {
                        let w = if w.will_wake(cx.waker()) {
                            w
                        } else {
                            cx.waker().clone()
                        };
                        state.recv_slots[key] = RecvSlot::Waiting(w);
                        this.state = RecvState::Parked(key);
                        Poll::Pending
                    }
                    RecvSlot::Received(value) => {
                        state.recv_slots.remove(key);
                        Poll::Ready(Ok(value))
                    }
                    RecvSlot::Closed => {
                        state.recv_slots.remove(key);
                        Poll::Ready(Err(RecvError))
                    }
                }
            }
            RecvState::Done => panic!("`Recv` polled after completion"),
        }
    }
}

impl<T> FusedFuture for Recv<'_, T> {
    fn is_terminated(&self) -> bool {
        matches!(self.state, RecvState::Done)
    }
}

impl<T> Drop for Recv<'_, T> {
    fn drop(&mut self) {
        if let RecvState::Parked(key) = self.state {
            let waker = {
                let mut state = lock(&self.channel.inner.state);
                match state.recv_slots.remove(key) {
                    RecvSlot::Waiting(_) => {
                        state.receivers.retain(|&k| k != key);
                        None
                    }
                    RecvSlot::Received(value) => state.forward(value),
                    RecvSlot::Closed => None,
                }
            };

            if let Some(w) = waker {
                w.wake();
            }
        }
    }
}

impl<T> fmt::Debug for Recv<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Recv { .. }")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    use super::*;

    /// Counts how often it is woken.
    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Wake for Counter {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter() -> (Arc<Counter>, Waker) {
        let c = Arc::new(Counter::default());
        (c.clone(), Waker::from(c))
    }

    fn poll<F: Future + Unpin>(f: &mut F, waker: &Waker) -> Poll<F::Output> {
        Pin::new(f).poll(&mut Context::from_waker(waker))
    }

    #[test]
    fn parked_sender_moves_into_freed_slot() {
        let ch = Channel::new(1);
        let (count, waker) = counter();

        assert_eq!(ch.try_send(1), Ok(()));
        let mut s = ch.send(2);
        assert!(poll(&mut s, &waker).is_pending());
        assert_eq!(lock(&ch.inner.state).senders.len(), 1);

        assert_eq!(ch.try_recv(), Ok(1));
        assert_eq!(count.0.load(Ordering::SeqCst), 1);
        assert_eq!(ch.len(), 1);
        assert!(ch.is_full());

        assert_eq!(poll(&mut s, &waker), Poll::Ready(Ok(())));
        assert!(s.is_terminated());
        assert_eq!(ch.try_recv(), Ok(2));
    }

    #[test]
    fn dropped_sender_is_withdrawn() {
        let ch = Channel::new(0);
        let (_count, waker) = counter();

        let mut s = ch.send(1);
        assert!(poll(&mut s, &waker).is_pending());
        drop(s);

        let state = lock(&ch.inner.state);
        assert!(state.senders.is_empty());
        assert!(state.send_slots.is_empty());
        drop(state);

        assert_eq!(ch.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn dropped_receiver_forwards_its_value() {
        let ch = Channel::new(0);
        let (first, w1) = counter();
        let (second, w2) = counter();

        let mut r1 = ch.recv();
        let mut r2 = ch.recv();
        assert!(poll(&mut r1, &w1).is_pending());
        assert!(poll(&mut r2, &w2).is_pending());

        assert_eq!(ch.try_send(7), Ok(()));
        assert_eq!(first.0.load(Ordering::SeqCst), 1);

        drop(r1);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);
        assert_eq!(poll(&mut r2, &w2), Poll::Ready(Ok(7)));
    }

    #[test]
    fn dropped_receiver_puts_value_back() {
        let ch = Channel::new(0);
        let (_count, waker) = counter();

        let mut r = ch.recv();
        assert!(poll(&mut r, &waker).is_pending());
        assert_eq!(ch.try_send(3), Ok(()));
        drop(r);

        assert_eq!(ch.try_recv(), Ok(3));
    }

    #[test]
    fn close_wakes_everyone_once() {
        let ch = Channel::<i32>::new(0);
        let (count, waker) = counter();

        let mut r = ch.recv();
        assert!(poll(&mut r, &waker).is_pending());

        assert!(ch.close());
        assert!(!ch.close());
        assert_eq!(count.0.load(Ordering::SeqCst), 1);
        assert_eq!(poll(&mut r, &waker), Poll::Ready(Err(RecvError)));
    }

    #[test]
    fn rendezvous_is_always_full() {
        let ch = Channel::new(0);
        assert!(ch.is_full());
        assert!(ch.is_empty());
        assert_eq!(ch.try_send(1), Err(TrySendError::Full(1)));
    }
}
