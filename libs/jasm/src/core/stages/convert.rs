//! Colorspace conversion and caps enforcement.
//!
//! Converts between RGBA and packed AYUV (BT.601 integer math) and pins
//! the output caps supplied as a caps string, the way a colorspace
//! element followed by a capsfilter would.

use crate::core::backend::{StageInstance, StageState};
use crate::core::caps::{PixelFormat, VideoCaps};
use crate::core::descriptors::{
    ConfigField, PortDescriptor, StageDescriptor, StageRole, PRIMARY_PORT,
};
use crate::core::error::{ConnectError, InstantiationError};
use crate::core::frames::VideoFrame;
use crate::core::graph::StageSpec;
use crate::core::links::{FrameConsumer, FrameProducer};

use super::slots::{require_state, InputSlot, OutputSlot};
use super::worker::StageWorker;

pub struct ConvertStage {
    id: String,
    target: VideoCaps,
    state: StageState,
    input: InputSlot,
    output: OutputSlot,
    worker: Option<StageWorker>,
}

impl ConvertStage {
    pub(crate) fn from_spec(spec: &StageSpec) -> Result<Self, InstantiationError> {
        let target = match spec.config.get_str("caps") {
            Some(caps_str) => VideoCaps::parse(caps_str).map_err(|e| {
                InstantiationError::new(&spec.id, &spec.kind, e.to_string())
            })?,
            None => VideoCaps::any(),
        };

        Ok(Self {
            id: spec.id.clone(),
            target,
            state: StageState::Idle,
            input: InputSlot::default(),
            output: OutputSlot::default(),
            worker: None,
        })
    }

    pub(crate) fn descriptor() -> StageDescriptor {
        StageDescriptor::new(
            super::kinds::CONVERT,
            StageRole::Transform,
            "Converts pixel format and enforces output caps",
        )
        .with_input(PortDescriptor::new(PRIMARY_PORT, "Frames to convert", true))
        .with_output(PortDescriptor::new(PRIMARY_PORT, "Converted frames", false))
        .with_config_field(ConfigField::new(
            "caps",
            "string",
            false,
            "Output caps string, e.g. 'video/x-raw,format=AYUV'",
        ))
    }
}

impl StageInstance for ConvertStage {
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
        Ok(self.target)
    }

    fn input_caps(&self, port: &str) -> Result<VideoCaps, ConnectError> {
        if port != PRIMARY_PORT {
            return Err(ConnectError::NoSuchInput {
                stage: self.id.clone(),
                port: port.to_string(),
            });
        }
        Ok(VideoCaps::any())
    }

    fn attach_output(&mut self, port: &str, producer: FrameProducer) -> Result<(), ConnectError> {
        self.output.attach(&self.id, PRIMARY_PORT, port, producer)
    }

    fn attach_input(&mut self, port: &str, consumer: FrameConsumer) -> Result<(), ConnectError> {
        self.input.attach(&self.id, PRIMARY_PORT, port, consumer)
    }

    fn make_ready(&mut self) -> Result<(), InstantiationError> {
        require_state(&self.id, super::kinds::CONVERT, self.state, StageState::Idle, "ready")?;
        if !self.input.is_attached() {
            return Err(InstantiationError::new(
                &self.id,
                super::kinds::CONVERT,
                "input port is not linked",
            ));
        }
        self.state = StageState::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), InstantiationError> {
        require_state(&self.id, super::kinds::CONVERT, self.state, StageState::Ready, "start")?;

        let target = self.target;
        let input = self.input.take().ok_or_else(|| {
            InstantiationError::new(&self.id, super::kinds::CONVERT, "input port is not linked")
        })?;
        let output = self.output.take();
        let id = self.id.clone();

        let worker = StageWorker::spawn(&self.id, move || {
            let Some(frame) = input.pop() else {
                return true;
            };

            // No scaler in this graph: a geometry the caps exclude is
            // unrecoverable here.
            let geometry_ok = target.width.is_none_or(|w| w == frame.width)
                && target.height.is_none_or(|h| h == frame.height);
            if !geometry_ok {
                tracing::warn!(
                    "[{}] dropping frame {}: {}x{} does not satisfy {}",
                    id,
                    frame.frame_number,
                    frame.width,
                    frame.height,
                    target
                );
                return false;
            }

            let converted = match target.format {
                Some(format) if format != frame.format => convert_frame(&frame, format),
                _ => Ok(frame),
            };
            match converted {
                Ok(frame) => {
                    if let Some(producer) = &output {
                        producer.push(frame);
                    }
                }
                Err(e) => tracing::warn!("[{}] conversion failed: {}", id, e),
            }
            false
        })
        .map_err(|e| {
            InstantiationError::new(
                &self.id,
                super::kinds::CONVERT,
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

fn convert_frame(
    frame: &VideoFrame,
    target: PixelFormat,
) -> Result<VideoFrame, crate::core::JasmError> {
    let converted = match (frame.format, target) {
        (PixelFormat::Rgba8, PixelFormat::Ayuv8) => rgba_to_ayuv(frame.data()),
        (PixelFormat::Ayuv8, PixelFormat::Rgba8) => ayuv_to_rgba(frame.data()),
        _ => return Ok(frame.clone()),
    };
    frame.with_data(converted, target)
}

// BT.601 studio-swing integer approximations.

fn rgba_to_ayuv(src: &[u8]) -> Vec<u8> {
    let mut dst = Vec::with_capacity(src.len());
    for px in src.chunks_exact(4) {
        let (r, g, b, a) = (px[0] as i32, px[1] as i32, px[2] as i32, px[3]);
        let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
        let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
        let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
        dst.push(a);
        dst.push(y.clamp(0, 255) as u8);
        dst.push(u.clamp(0, 255) as u8);
        dst.push(v.clamp(0, 255) as u8);
    }
    dst
}

fn ayuv_to_rgba(src: &[u8]) -> Vec<u8> {
    let mut dst = Vec::with_capacity(src.len());
    for px in src.chunks_exact(4) {
        let (a, y, u, v) = (px[0], px[1] as i32, px[2] as i32, px[3] as i32);
        let c = y - 16;
        let d = u - 128;
        let e = v - 128;
        let r = (298 * c + 409 * e + 128) >> 8;
        let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
        let b = (298 * c + 516 * d + 128) >> 8;
        dst.push(r.clamp(0, 255) as u8);
        dst.push(g.clamp(0, 255) as u8);
        dst.push(b.clamp(0, 255) as u8);
        dst.push(a);
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_frame(pixels: &[[u8; 4]]) -> VideoFrame {
        let data: Vec<u8> = pixels.iter().flatten().copied().collect();
        VideoFrame::new(data, PixelFormat::Rgba8, pixels.len() as u32, 1, 0, 0).unwrap()
    }

    #[test]
    fn test_black_and_white_to_ayuv() {
        let frame = rgba_frame(&[[0, 0, 0, 255], [255, 255, 255, 255]]);
        let ayuv = convert_frame(&frame, PixelFormat::Ayuv8).unwrap();
        // Black: Y=16, neutral chroma. White: Y=235, neutral chroma.
        assert_eq!(&ayuv.data()[0..4], &[255, 16, 128, 128]);
        assert_eq!(&ayuv.data()[4..8], &[255, 235, 128, 128]);
    }

    #[test]
    fn test_round_trip_is_close() {
        let frame = rgba_frame(&[[200, 50, 90, 255], [10, 240, 170, 128]]);
        let ayuv = convert_frame(&frame, PixelFormat::Ayuv8).unwrap();
        let back = convert_frame(&ayuv, PixelFormat::Rgba8).unwrap();

        for (orig, converted) in frame.data().iter().zip(back.data()) {
            assert!((*orig as i32 - *converted as i32).abs() <= 4);
        }
    }

    #[test]
    fn test_alpha_preserved() {
        let frame = rgba_frame(&[[10, 20, 30, 77]]);
        let ayuv = convert_frame(&frame, PixelFormat::Ayuv8).unwrap();
        assert_eq!(ayuv.data()[0], 77);
    }

    #[test]
    fn test_from_spec_rejects_bad_caps() {
        let spec = StageSpec::new("conv", super::super::kinds::CONVERT)
            .with("caps", "audio/x-raw,format=S16LE");
        assert!(ConvertStage::from_spec(&spec).is_err());
    }

    #[test]
    fn test_output_caps_follow_config() {
        let spec = StageSpec::new("conv", super::super::kinds::CONVERT)
            .with("caps", "video/x-raw,format=AYUV");
        let stage = ConvertStage::from_spec(&spec).unwrap();
        assert_eq!(
            stage.output_caps(PRIMARY_PORT).unwrap(),
            VideoCaps::with_format(PixelFormat::Ayuv8)
        );
    }
}
