//! Bounded job queue
//!
//! Fixed-capacity FIFO ring buffer between submitters and workers, guarded
//! by one mutex + condvar pair.
//!
//! The ring has `capacity + 1` slots. It is full when
//! `(tail + 1) % slots == head`, so one slot always stays empty and
//! `head == tail` unambiguously means empty.
//!
//! Overflow never blocks the producer: `enqueue` hands the item back in
//! `QueueError::Full` and the caller reports the drop.

use taskpool_core::constants::MAX_QUEUE_CAPACITY;

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Why an item was not enqueued. The item is returned to the caller.
pub enum QueueError<T> {
    /// Every slot is taken
    Full(T),
    /// `shutdown()` was called; no new items are accepted
    Closed(T),
}

impl<T> fmt::Debug for QueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full(_) => write!(f, "Full(..)"),
            QueueError::Closed(_) => write!(f, "Closed(..)"),
        }
    }
}

struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    shutdown: bool,
}

impl<T> Ring<T> {
    #[inline]
    fn next(&self, idx: usize) -> usize {
        (idx + 1) % self.slots.len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.next(self.tail) == self.head
    }

    #[inline]
    fn len(&self) -> usize {
        (self.tail + self.slots.len() - self.head) % self.slots.len()
    }

    fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = self.next(self.head);
        item
    }
}

/// Bounded multi-producer multi-consumer FIFO
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    cond: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    ///
    /// `capacity` is clamped to `1..=MAX_QUEUE_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_QUEUE_CAPACITY);
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.resize_with(capacity + 1, || None);
        Self {
            ring: Mutex::new(Ring {
                slots,
                head: 0,
                tail: 0,
                shutdown: false,
            }),
            cond: Condvar::new(),
            capacity,
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert at tail and wake one consumer
    ///
    /// Never blocks. A full or shut-down queue returns the item.
    pub fn enqueue(&self, item: T) -> Result<(), QueueError<T>> {
        let mut ring = self.lock();
        if ring.shutdown {
            return Err(QueueError::Closed(item));
        }
        if ring.is_full() {
            return Err(QueueError::Full(item));
        }
        let tail = ring.tail;
        ring.slots[tail] = Some(item);
        ring.tail = ring.next(tail);
        drop(ring);
        self.cond.notify_one();
        Ok(())
    }

    /// Remove from head, blocking while the queue is empty
    ///
    /// Returns `None` only once shutdown was requested and the queue is
    /// drained. Items queued before shutdown are still handed out.
    pub fn dequeue(&self) -> Option<T> {
        let mut ring = self.lock();
        while ring.is_empty() && !ring.shutdown {
            ring = self.cond.wait(ring).unwrap_or_else(PoisonError::into_inner);
        }
        ring.pop()
    }

    /// Remove from head without blocking
    pub fn try_dequeue(&self) -> Option<T> {
        self.lock().pop()
    }

    /// Stop accepting items and wake every blocked consumer. One-way.
    pub fn shutdown(&self) {
        self.lock().shutdown = true;
        self.cond.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    /// Maximum number of queued items
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
