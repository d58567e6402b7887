//! Capture device boundary for camera-style sources.

use std::fmt;
use std::sync::Arc;

use crate::core::frames::VideoFrame;

/// An externally owned frame producer, such as a camera device wrapper
/// or a synthetic feed in tests. The graph pulls from it; it never owns
/// the device.
pub trait FrameCapture: Send + Sync {
    /// Pull the next frame if one is available. Must not block for longer
    /// than a frame interval.
    fn capture(&self) -> Option<VideoFrame>;
}

/// Cheaply cloneable, opaque reference to a [`FrameCapture`] device.
/// Supplied through stage configuration at build time.
#[derive(Clone)]
pub struct CaptureHandle(Arc<dyn FrameCapture>);

impl CaptureHandle {
    pub fn new(device: Arc<dyn FrameCapture>) -> Self {
        Self(device)
    }

    pub fn capture(&self) -> Option<VideoFrame> {
        self.0.capture()
    }
}

impl fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CaptureHandle(..)")
    }
}
