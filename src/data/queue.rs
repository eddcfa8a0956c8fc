//! Bounded hand-off queue between the ingest thread and the UI.

use crossbeam_queue::ArrayQueue;

use crate::data::record::SensorRecord;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Fixed-capacity FIFO that never blocks the producer.
///
/// When full, [`push`](Self::push) evicts the oldest unread element to make
/// room. The queue is lock-free and safe to share behind an `Arc` between one
/// producer and one consumer.
pub struct BoundedQueue<T> {
    inner: ArrayQueue<T>,
}

/// The queue used by the monitor pipeline.
pub type SampleQueue = BoundedQueue<SensorRecord>;

impl<T> BoundedQueue<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Push `value`, returning the element evicted to make room, if any.
    pub fn push(&self, value: T) -> Option<T> {
        self.inner.force_push(value)
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.pop()
    }

    /// Pop at most `limit` elements in FIFO order.
    pub fn drain_batch(&self, limit: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(limit.min(self.len()));
        while out.len() < limit {
            match self.inner.pop() {
                Some(v) => out.push(v),
                None => break,
            }
        }
        out
    }
}
