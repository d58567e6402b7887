//! Video flip transform.

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipMethod {
    None,
    Horizontal,
    Vertical,
    Rotate180,
}

impl FlipMethod {
    /// Numeric values follow the videoflip element's method property.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FlipMethod::None),
            2 => Some(FlipMethod::Rotate180),
            4 => Some(FlipMethod::Horizontal),
            5 => Some(FlipMethod::Vertical),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(FlipMethod::None),
            "horizontal" => Some(FlipMethod::Horizontal),
            "vertical" => Some(FlipMethod::Vertical),
            "rotate-180" => Some(FlipMethod::Rotate180),
            _ => None,
        }
    }
}

/// Mirrors or rotates each frame in place. The mirror view is what makes
/// a camera loop feel natural to perform in front of.
pub struct FlipTransform {
    id: String,
    method: FlipMethod,
    state: StageState,
    input: InputSlot,
    output: OutputSlot,
    worker: Option<StageWorker>,
}

impl FlipTransform {
    pub(crate) fn from_spec(spec: &StageSpec) -> Result<Self, InstantiationError> {
        let method = match spec.config.get("method") {
            None => FlipMethod::None,
            Some(value) => {
                if let Some(code) = value.as_i64() {
                    FlipMethod::from_code(code).ok_or_else(|| {
                        InstantiationError::new(
                            &spec.id,
                            &spec.kind,
                            format!("unknown flip method code {code}"),
                        )
                    })?
                } else if let Some(name) = value.as_str() {
                    FlipMethod::parse(name).ok_or_else(|| {
                        InstantiationError::new(
                            &spec.id,
                            &spec.kind,
                            format!("unknown flip method '{name}'"),
                        )
                    })?
                } else {
                    return Err(InstantiationError::new(
                        &spec.id,
                        &spec.kind,
                        "flip method must be an int code or a name",
                    ));
                }
            }
        };

        Ok(Self {
            id: spec.id.clone(),
            method,
            state: StageState::Idle,
            input: InputSlot::default(),
            output: OutputSlot::default(),
            worker: None,
        })
    }

    pub(crate) fn descriptor() -> StageDescriptor {
        StageDescriptor::new(
            super::kinds::FLIP,
            StageRole::Transform,
            "Mirrors or rotates frames",
        )
        .with_input(PortDescriptor::new(PRIMARY_PORT, "Frames to flip", true))
        .with_output(PortDescriptor::new(PRIMARY_PORT, "Flipped frames", false))
        .with_config_field(ConfigField::new(
            "method",
            "int|string",
            false,
            "0/none, 2/rotate-180, 4/horizontal, 5/vertical",
        ))
    }
}

impl StageInstance for FlipTransform {
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
        Ok(VideoCaps::any())
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
        require_state(&self.id, super::kinds::FLIP, self.state, StageState::Idle, "ready")?;
        if !self.input.is_attached() {
            return Err(InstantiationError::new(
                &self.id,
                super::kinds::FLIP,
                "input port is not linked",
            ));
        }
        self.state = StageState::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), InstantiationError> {
        require_state(&self.id, super::kinds::FLIP, self.state, StageState::Ready, "start")?;

        let method = self.method;
        let input = self.input.take().ok_or_else(|| {
            InstantiationError::new(&self.id, super::kinds::FLIP, "input port is not linked")
        })?;
        let output = self.output.take();
        let id = self.id.clone();

        let worker = StageWorker::spawn(&self.id, move || {
            let Some(frame) = input.pop() else {
                return true;
            };
            let flipped = match flip_frame(&frame, method) {
                Ok(flipped) => flipped,
                Err(e) => {
                    tracing::warn!("[{}] dropping frame {}: {}", id, frame.frame_number, e);
                    return false;
                }
            };
            if let Some(producer) = &output {
                producer.push(flipped);
            }
            false
        })
        .map_err(|e| {
            InstantiationError::new(
                &self.id,
                super::kinds::FLIP,
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

fn flip_frame(frame: &VideoFrame, method: FlipMethod) -> Result<VideoFrame, crate::core::JasmError> {
    if method == FlipMethod::None {
        return Ok(frame.clone());
    }

    let bpp = PixelFormat::BYTES_PER_PIXEL;
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = width * bpp;
    let src = frame.data();
    let mut dst = vec![0u8; src.len()];

    match method {
        FlipMethod::None => unreachable!(),
        FlipMethod::Horizontal => {
            for y in 0..height {
                let row = &src[y * stride..(y + 1) * stride];
                let out = &mut dst[y * stride..(y + 1) * stride];
                for x in 0..width {
                    let flipped_x = width - 1 - x;
                    out[x * bpp..(x + 1) * bpp]
                        .copy_from_slice(&row[flipped_x * bpp..(flipped_x + 1) * bpp]);
                }
            }
        }
        FlipMethod::Vertical => {
            for y in 0..height {
                let flipped_y = height - 1 - y;
                dst[y * stride..(y + 1) * stride]
                    .copy_from_slice(&src[flipped_y * stride..(flipped_y + 1) * stride]);
            }
        }
        FlipMethod::Rotate180 => {
            let pixels = width * height;
            for i in 0..pixels {
                let j = pixels - 1 - i;
                dst[i * bpp..(i + 1) * bpp].copy_from_slice(&src[j * bpp..(j + 1) * bpp]);
            }
        }
    }

    frame.with_data(dst, frame.format)
}
