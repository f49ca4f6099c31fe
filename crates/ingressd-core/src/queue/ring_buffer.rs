//! A bounded, lossy ring buffer that coalesces store notifications.
//!
//! Capacity is fixed at 1024; this is the only place in the pipeline where
//! events may be lost, and loss here is safe because every reconciliation
//! rebuilds the whole routing model from scratch rather than applying
//! incremental deltas.

use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Capacity of the ring buffer. Overflow drops the oldest entry.
pub const RING_BUFFER_CAPACITY: usize = 1024;

/// Distinguishes a configmap/backend-policy change (no associated object)
/// from a real or dummy object event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The watched configmap or backend configuration changed.
    Configuration,
    /// A create/update/delete of a real cluster object.
    Object { key: String },
    /// A synthetic trigger (file-watch, initial sync) carrying no object.
    Dummy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEvent {
    pub kind: EventKind,
}

impl ClusterEvent {
    pub fn configuration() -> Self {
        Self { kind: EventKind::Configuration }
    }

    pub fn object(key: impl Into<String>) -> Self {
        Self { kind: EventKind::Object { key: key.into() } }
    }

    pub fn dummy() -> Self {
        Self { kind: EventKind::Dummy }
    }
}

/// A fixed-capacity, drop-oldest ring buffer. Multiple producers may push
/// concurrently; a single consumer drains it.
pub struct RingBuffer {
    inner: Mutex<VecDeque<ClusterEvent>>,
    capacity: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(RING_BUFFER_CAPACITY)
    }
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Pushes an event, dropping the oldest entry if the buffer is full.
    /// Returns `true` if an entry was dropped.
    pub async fn push(&self, event: ClusterEvent) -> bool {
        let mut buf = self.inner.lock().await;
        let dropped = if buf.len() >= self.capacity {
            buf.pop_front();
            true
        } else {
            false
        };
        buf.push_back(event);
        if dropped {
            log::warn!("ring buffer at capacity ({}), dropped oldest event", self.capacity);
        }
        dropped
    }

    /// Pops the oldest event, if any.
    pub async fn pop(&self) -> Option<ClusterEvent> {
        self.inner.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_and_pop_preserve_order() {
        let buf = RingBuffer::new(4);
        buf.push(ClusterEvent::object("a")).await;
        buf.push(ClusterEvent::object("b")).await;
        assert_eq!(buf.pop().await, Some(ClusterEvent::object("a")));
        assert_eq!(buf.pop().await, Some(ClusterEvent::object("b")));
        assert_eq!(buf.pop().await, None);
    }

    #[tokio::test]
    async fn overflow_drops_oldest() {
        let buf = RingBuffer::new(2);
        buf.push(ClusterEvent::object("a")).await;
        buf.push(ClusterEvent::object("b")).await;
        let dropped = buf.push(ClusterEvent::object("c")).await;
        assert!(dropped);
        assert_eq!(buf.pop().await, Some(ClusterEvent::object("b")));
        assert_eq!(buf.pop().await, Some(ClusterEvent::object("c")));
    }
}
