//! Event intake and the single-consumer work queue.

pub mod ring_buffer;
pub mod work_queue;

pub use ring_buffer::{ClusterEvent, EventKind, RingBuffer};
pub use work_queue::{WorkItem, WorkQueue};
