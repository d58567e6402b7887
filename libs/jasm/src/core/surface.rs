//! Render sink adapter: the boundary between a terminal sink stage and an
//! externally owned presentation surface.

use std::fmt;
use std::sync::Arc;

use crate::core::caps::VideoCaps;
use crate::core::frames::VideoFrame;

/// An externally owned surface that frames are presented onto, such as a
/// GUI texture or a window. The graph never owns this; dropping the graph
/// does not release the surface's real resources.
pub trait PresentationSurface: Send + Sync {
    /// Hand over one decoded frame. Implementations must not block the
    /// caller waiting for a prior frame to finish presenting; back-pressure
    /// is the surface's own problem.
    fn present(&self, frame: &VideoFrame);
}

/// Cheaply cloneable, opaque reference to a [`PresentationSurface`].
/// Supplied through stage configuration at build time.
#[derive(Clone)]
pub struct SurfaceHandle(Arc<dyn PresentationSurface>);

impl SurfaceHandle {
    pub fn new(surface: Arc<dyn PresentationSurface>) -> Self {
        Self(surface)
    }

    pub fn present(&self, frame: &VideoFrame) {
        self.0.present(frame);
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SurfaceHandle(..)")
    }
}

/// Narrow adapter a sink stage pushes decoded frames through.
///
/// Fire-and-forget: `present` has no return value and never blocks the
/// graph. The adapter also remembers the caps the sink was configured to
/// emit, so a frame the surface was never promised can be rejected before
/// it leaves the graph.
pub struct RenderSinkAdapter {
    label: String,
    surface: SurfaceHandle,
    caps: VideoCaps,
}

impl RenderSinkAdapter {
    pub fn new(label: impl Into<String>, surface: SurfaceHandle, caps: VideoCaps) -> Self {
        Self {
            label: label.into(),
            surface,
            caps,
        }
    }

    pub fn caps(&self) -> &VideoCaps {
        &self.caps
    }

    /// Deliver one frame to the surface, dropping it if it violates the
    /// configured caps.
    pub fn present(&self, frame: &VideoFrame) {
        if !self.caps.accepts(frame.format, frame.width, frame.height) {
            tracing::warn!(
                "[{}] dropping frame {}: {} does not satisfy {}",
                self.label,
                frame.frame_number,
                frame.caps(),
                self.caps
            );
            return;
        }
        self.surface.present(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::caps::PixelFormat;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingSurface(AtomicU64);

    impl PresentationSurface for CountingSurface {
        fn present(&self, _frame: &VideoFrame) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn frame(format: PixelFormat) -> VideoFrame {
        VideoFrame::new(vec![0u8; 16], format, 2, 2, 0, 0).unwrap()
    }

    #[test]
    fn test_present_reaches_surface() {
        let surface = Arc::new(CountingSurface(AtomicU64::new(0)));
        let adapter = RenderSinkAdapter::new(
            "display",
            SurfaceHandle::new(surface.clone()),
            VideoCaps::any(),
        );
        adapter.present(&frame(PixelFormat::Rgba8));
        assert_eq!(surface.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_caps_violation_is_dropped() {
        let surface = Arc::new(CountingSurface(AtomicU64::new(0)));
        let adapter = RenderSinkAdapter::new(
            "display",
            SurfaceHandle::new(surface.clone()),
            VideoCaps::with_format(PixelFormat::Ayuv8),
        );
        adapter.present(&frame(PixelFormat::Rgba8));
        assert_eq!(surface.0.load(Ordering::Relaxed), 0);
    }
}
