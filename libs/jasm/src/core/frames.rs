//! CPU video frames.

use std::fmt;
use std::sync::Arc;

use crate::core::caps::{PixelFormat, VideoCaps};
use crate::core::error::JasmError;

/// A decoded video frame.
///
/// Pixel data is shared behind an `Arc` so cloning for fan-out never
/// copies pixels; a tee branch holds the same buffer as every other
/// branch.
#[derive(Clone)]
pub struct VideoFrame {
    data: Arc<[u8]>,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Monotonic timestamp in nanoseconds.
    pub timestamp_ns: i64,
    /// Sequential frame number.
    pub frame_number: u64,
}

impl VideoFrame {
    pub fn new(
        data: Vec<u8>,
        format: PixelFormat,
        width: u32,
        height: u32,
        timestamp_ns: i64,
        frame_number: u64,
    ) -> Result<Self, JasmError> {
        let expected = width as usize * height as usize * PixelFormat::BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(JasmError::Configuration(format!(
                "frame buffer is {} bytes, {}x{} {} needs {}",
                data.len(),
                width,
                height,
                format,
                expected
            )));
        }
        Ok(Self {
            data: data.into(),
            format,
            width,
            height,
            timestamp_ns,
            frame_number,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Concrete caps describing this frame.
    pub fn caps(&self) -> VideoCaps {
        VideoCaps::exact(self.format, self.width, self.height)
    }

    /// New frame with different pixel data, preserving timestamp and
    /// frame number. Used by transforms that rewrite the buffer.
    pub fn with_data(&self, data: Vec<u8>, format: PixelFormat) -> Result<Self, JasmError> {
        Self::new(
            data,
            format,
            self.width,
            self.height,
            self.timestamp_ns,
            self.frame_number,
        )
    }

    /// Whether two frames share the same underlying pixel buffer.
    pub fn shares_buffer_with(&self, other: &VideoFrame) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("timestamp_ns", &self.timestamp_ns)
            .field("frame_number", &self.frame_number)
            .finish_non_exhaustive()
    }
}
