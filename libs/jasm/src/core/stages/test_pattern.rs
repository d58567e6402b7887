//! Test pattern source stage.
//!
//! Generates synthetic RGBA frames at a fixed rate, for running the graph
//! without a camera. Patterns: vertical color bars or a moving gradient.

use std::time::{Duration, Instant};

use crate::core::backend::{StageInstance, StageState};
use crate::core::caps::{PixelFormat, VideoCaps};
use crate::core::descriptors::{
    ConfigField, PortDescriptor, StageDescriptor, StageRole, PRIMARY_PORT,
};
use crate::core::error::{ConnectError, InstantiationError};
use crate::core::frames::VideoFrame;
use crate::core::graph::StageSpec;
use crate::core::links::{FrameConsumer, FrameProducer};

use super::slots::{require_state, OutputSlot};
use super::worker::StageWorker;

/// Default frame size, matching the application's window geometry.
pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 768;
pub const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Bars,
    Gradient,
}

impl Pattern {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "bars" => Some(Pattern::Bars),
            "gradient" => Some(Pattern::Gradient),
            _ => None,
        }
    }
}

pub struct TestPatternSource {
    id: String,
    width: u32,
    height: u32,
    fps: f64,
    pattern: Pattern,
    state: StageState,
    output: OutputSlot,
    worker: Option<StageWorker>,
}

impl TestPatternSource {
    pub(crate) fn from_spec(spec: &StageSpec) -> Result<Self, InstantiationError> {
        let err = |reason: String| InstantiationError::new(&spec.id, &spec.kind, reason);

        let width = spec.config.get_i64("width").unwrap_or(DEFAULT_WIDTH as i64);
        let height = spec
            .config
            .get_i64("height")
            .unwrap_or(DEFAULT_HEIGHT as i64);
        if width <= 0 || height <= 0 || width > 8192 || height > 8192 {
            return Err(err(format!("unreasonable frame size {width}x{height}")));
        }

        let fps = spec.config.get_f64("fps").unwrap_or(DEFAULT_FPS);
        if !(fps > 0.0 && fps <= 240.0) {
            return Err(err(format!("unreasonable frame rate {fps}")));
        }

        let pattern_name = spec.config.get_str("pattern").unwrap_or("bars");
        let pattern = Pattern::parse(pattern_name)
            .ok_or_else(|| err(format!("unknown pattern '{pattern_name}'")))?;

        Ok(Self {
            id: spec.id.clone(),
            width: width as u32,
            height: height as u32,
            fps,
            pattern,
            state: StageState::Idle,
            output: OutputSlot::default(),
            worker: None,
        })
    }

    pub(crate) fn descriptor() -> StageDescriptor {
        StageDescriptor::new(
            super::kinds::TEST_PATTERN_SOURCE,
            StageRole::Source,
            "Generates synthetic RGBA test frames at a fixed rate",
        )
        .with_output(PortDescriptor::new(PRIMARY_PORT, "Generated frames", false))
        .with_config_field(ConfigField::new("width", "int", false, "Frame width in pixels"))
        .with_config_field(ConfigField::new("height", "int", false, "Frame height in pixels"))
        .with_config_field(ConfigField::new("fps", "float", false, "Frames per second"))
        .with_config_field(ConfigField::new(
            "pattern",
            "string",
            false,
            "'bars' or 'gradient'",
        ))
    }
}

impl StageInstance for TestPatternSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> StageState {
        self.state
    }

    fn output_caps(&self, port: &str) -> Result<VideoCaps, ConnectError> {
        if port != PRIMARY_PORT {
            return Err(ConnectError::NoSuchOutput {
                stage: self.id.clone(),
                port: port.to_string(),
            });
        }
        Ok(VideoCaps::exact(PixelFormat::Rgba8, self.width, self.height))
    }

    fn input_caps(&self, port: &str) -> Result<VideoCaps, ConnectError> {
        Err(ConnectError::NoSuchInput {
            stage: self.id.clone(),
            port: port.to_string(),
        })
    }

    fn attach_output(&mut self, port: &str, producer: FrameProducer) -> Result<(), ConnectError> {
        self.output.attach(&self.id, PRIMARY_PORT, port, producer)
    }

    fn attach_input(&mut self, port: &str, _consumer: FrameConsumer) -> Result<(), ConnectError> {
        Err(ConnectError::NoSuchInput {
            stage: self.id.clone(),
            port: port.to_string(),
        })
    }

    fn make_ready(&mut self) -> Result<(), InstantiationError> {
        require_state(
            &self.id,
            super::kinds::TEST_PATTERN_SOURCE,
            self.state,
            StageState::Idle,
            "ready",
        )?;
        self.state = StageState::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), InstantiationError> {
        require_state(
            &self.id,
            super::kinds::TEST_PATTERN_SOURCE,
            self.state,
            StageState::Ready,
            "start",
        )?;

        let output = self.output.take();
        let (width, height, pattern) = (self.width, self.height, self.pattern);
        let interval = Duration::from_secs_f64(1.0 / self.fps);
        let started = Instant::now();
        let mut next_due = started;
        let mut frame_number: u64 = 0;

        let worker = StageWorker::spawn(&self.id, move || {
            let now = Instant::now();
            if now < next_due {
                return true;
            }

            let data = match pattern {
                Pattern::Bars => bars_frame(width, height),
                Pattern::Gradient => gradient_frame(width, height, frame_number),
            };
            let timestamp_ns = started.elapsed().as_nanos() as i64;
            if let Ok(frame) = VideoFrame::new(
                data,
                PixelFormat::Rgba8,
                width,
                height,
                timestamp_ns,
                frame_number,
            ) {
                if let Some(producer) = &output {
                    producer.push(frame);
                }
            }
            frame_number += 1;

            next_due += interval;
            if now > next_due + interval {
                // Fell behind; resynchronize rather than bursting.
                next_due = now + interval;
            }
            false
        })
        .map_err(|e| {
            InstantiationError::new(
                &self.id,
                super::kinds::TEST_PATTERN_SOURCE,
                format!("failed to spawn worker: {e}"),
            )
        })?;

        self.worker = Some(worker);
        self.state = StageState::Running;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        self.state = StageState::Stopped;
    }
}

const BAR_COLORS: [[u8; 4]; 8] = [
    [255, 255, 255, 255], // white
    [255, 255, 0, 255],   // yellow
    [0, 255, 255, 255],   // cyan
    [0, 255, 0, 255],     // green
    [255, 0, 255, 255],   // magenta
    [255, 0, 0, 255],     // red
    [0, 0, 255, 255],     // blue
    [0, 0, 0, 255],       // black
];

fn bars_frame(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _y in 0..height {
        for x in 0..width {
            let bar = (x * BAR_COLORS.len() as u32 / width) as usize;
            data.extend_from_slice(&BAR_COLORS[bar.min(BAR_COLORS.len() - 1)]);
        }
    }
    data
}

fn gradient_frame(width: u32, height: u32, frame_number: u64) -> Vec<u8> {
    let shift = (frame_number * 2) as u32;
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.push(((x + shift) % 256) as u8);
            data.push((y % 256) as u8);
            data.push(((x + y + shift) % 256) as u8);
            data.push(255);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::StageSpec;

    #[test]
    fn test_bars_frame_layout() {
        let data = bars_frame(8, 2);
        assert_eq!(data.len(), 8 * 2 * 4);
        // Leftmost bar is white, rightmost is black.
        assert_eq!(&data[0..4], &[255, 255, 255, 255]);
        assert_eq!(&data[7 * 4..8 * 4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_gradient_moves_between_frames() {
        let a = gradient_frame(4, 4, 0);
        let b = gradient_frame(4, 4, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_spec_defaults() {
        let spec = StageSpec::new("cam", super::super::kinds::TEST_PATTERN_SOURCE);
        let source = TestPatternSource::from_spec(&spec).unwrap();
        assert_eq!(source.width, DEFAULT_WIDTH);
        assert_eq!(source.height, DEFAULT_HEIGHT);
        assert_eq!(source.pattern, Pattern::Bars);
    }

    #[test]
    fn test_from_spec_rejects_bad_pattern() {
        let spec =
            StageSpec::new("cam", super::super::kinds::TEST_PATTERN_SOURCE).with("pattern", "snow");
        assert!(TestPatternSource::from_spec(&spec).is_err());
    }

    #[test]
    fn test_from_spec_rejects_bad_fps() {
        let spec = StageSpec::new("cam", super::super::kinds::TEST_PATTERN_SOURCE).with("fps", 0.0);
        assert!(TestPatternSource::from_spec(&spec).is_err());
    }

    #[test]
    fn test_output_caps_are_exact() {
        let spec = StageSpec::new("cam", super::super::kinds::TEST_PATTERN_SOURCE)
            .with("width", 320)
            .with("height", 240);
        let source = TestPatternSource::from_spec(&spec).unwrap();
        let caps = source.output_caps(PRIMARY_PORT).unwrap();
        assert_eq!(caps, VideoCaps::exact(PixelFormat::Rgba8, 320, 240));
    }
}
