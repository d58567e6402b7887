//! Bounded frame queues connecting adjacent stages.
//!
//! Every edge of an activated graph is backed by one of these. The queue
//! is leaky: a producer never blocks, a full queue displaces its oldest
//! frame. This is what isolates a slow branch behind a tee from the rest
//! of the graph.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

use crate::core::frames::VideoFrame;

/// Default per-edge queue depth.
pub const DEFAULT_LINK_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames pushed into the queue.
    pub delivered: u64,
    /// Frames displaced because the queue was full.
    pub dropped: u64,
}

#[derive(Debug)]
struct LinkShared {
    label: String,
    queue: ArrayQueue<VideoFrame>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl LinkShared {
    fn stats(&self) -> LinkStats {
        LinkStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Producing half of a frame link. Held by the upstream stage.
#[derive(Debug)]
pub struct FrameProducer {
    inner: Arc<LinkShared>,
}

impl FrameProducer {
    /// Push a frame without ever blocking. A full queue drops its oldest
    /// frame to make room.
    pub fn push(&self, frame: VideoFrame) {
        if self.inner.queue.force_push(frame).is_some() {
            let dropped = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped.is_power_of_two() {
                tracing::trace!("[{}] queue full, {} frames dropped so far", self.inner.label, dropped);
            }
        }
        self.inner.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> LinkStats {
        self.inner.stats()
    }
}

/// Consuming half of a frame link. Held by the downstream stage.
pub struct FrameConsumer {
    inner: Arc<LinkShared>,
}

impl FrameConsumer {
    pub fn pop(&self) -> Option<VideoFrame> {
        self.inner.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.is_empty()
    }

    pub fn stats(&self) -> LinkStats {
        self.inner.stats()
    }
}

/// Create a bounded frame link. The label shows up in queue-overrun logs,
/// conventionally `"from_stage.port -> to_stage.port"`.
pub fn frame_link(label: impl Into<String>, capacity: usize) -> (FrameProducer, FrameConsumer) {
    let inner = Arc::new(LinkShared {
        label: label.into(),
        queue: ArrayQueue::new(capacity.max(1)),
        delivered: AtomicU64::new(0),
        dropped: AtomicU64::new(0),
    });
    (
        FrameProducer {
            inner: Arc::clone(&inner),
        },
        FrameConsumer { inner },
    )
}
