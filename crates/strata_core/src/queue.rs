//! # Work Queue
//!
//! Multi-producer multi-consumer queue with blocking pop and cooperative
//! shutdown, built on `crossbeam-channel`.
//!
//! Shutdown is signalled through a second channel whose only sender is
//! dropped by [`WorkQueue::shutdown`]. A disconnected channel is always ready
//! in `select!`, so every thread parked in [`WorkQueue::pop_blocking`] or
//! [`WorkQueue::push`] wakes at once.

use std::fmt;

use crossbeam_channel::{select, Receiver, Select, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use thiserror::Error;

/// Why an item could not be pushed. The item is handed back.
#[derive(Error)]
pub enum QueueError<T> {
    /// The queue is at capacity.
    #[error("queue is full")]
    Full(T),
    /// The queue has been shut down.
    #[error("queue is shut down")]
    Closed(T),
}

impl<T> QueueError<T> {
    /// Recovers the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) => item,
        }
    }

    /// Whether the queue rejected the item because it was shut down.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

impl<T> fmt::Debug for QueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

/// A thread-safe work queue.
///
/// Share it between threads behind an `Arc`. Items pushed before shutdown are
/// still handed out by [`pop_blocking`](Self::pop_blocking); it only returns
/// `None` once the queue is shut down AND empty.
pub struct WorkQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    /// Dropped on shutdown to wake every blocked thread.
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    capacity: Option<usize>,
}

impl<T> WorkQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self::from_parts(sender, receiver, Some(capacity))
    }

    /// Creates a queue without a capacity limit.
    #[must_use]
    pub fn unbounded() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self::from_parts(sender, receiver, None)
    }

    fn from_parts(sender: Sender<T>, receiver: Receiver<T>, capacity: Option<usize>) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);
        Self {
            sender,
            receiver,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            capacity,
        }
    }

    /// Pushes an item, waiting for room if the queue is full.
    ///
    /// Never call this from the main thread; use [`try_push`](Self::try_push).
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue is (or becomes) shut down
    /// before the item fits.
    pub fn push(&self, item: T) -> Result<(), QueueError<T>> {
        if self.is_shutdown() {
            return Err(QueueError::Closed(item));
        }
        // Fast path avoids building a select for the common case.
        let item = match self.sender.try_send(item) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(item)) => item,
            Err(TrySendError::Disconnected(item)) => return Err(QueueError::Closed(item)),
        };
        let mut sel = Select::new();
        let send_index = sel.send(&self.sender);
        let stop_index = sel.recv(&self.shutdown_rx);
        let oper = sel.select();
        if oper.index() == send_index {
            oper.send(&self.sender, item)
                .map_err(|e| QueueError::Closed(e.into_inner()))
        } else {
            debug_assert_eq!(oper.index(), stop_index);
            let _ = oper.recv(&self.shutdown_rx);
            Err(QueueError::Closed(item))
        }
    }

    /// Pushes an item without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when at capacity and
    /// [`QueueError::Closed`] after shutdown. The item is handed back.
    pub fn try_push(&self, item: T) -> Result<(), QueueError<T>> {
        if self.is_shutdown() {
            return Err(QueueError::Closed(item));
        }
        self.sender.try_send(item).map_err(|e| match e {
            TrySendError::Full(item) => QueueError::Full(item),
            TrySendError::Disconnected(item) => QueueError::Closed(item),
        })
    }

    /// Pops an item if one is ready.
    pub fn try_pop(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Pops an item, parking the thread until one arrives.
    ///
    /// Returns `None` once the queue is shut down and drained.
    pub fn pop_blocking(&self) -> Option<T> {
        select! {
            recv(self.receiver) -> msg => msg.ok(),
            recv(self.shutdown_rx) -> _ => self.try_pop(),
        }
    }

    /// Drains every ready item without waiting.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.receiver.try_iter()
    }

    /// Shuts the queue down and wakes every waiting thread.
    pub fn shutdown(&self) {
        self.shutdown_tx.lock().take();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_tx.lock().is_none()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no items are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Maximum number of queued items, `None` if unbounded.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<T> fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
