//! Capture source stage: pulls frames from an externally owned device.

use crate::core::backend::{StageInstance, StageState};
use crate::core::caps::VideoCaps;
use crate::core::capture::CaptureHandle;
use crate::core::descriptors::{
    ConfigField, PortDescriptor, StageDescriptor, StageRole, PRIMARY_PORT,
};
use crate::core::error::{ConnectError, InstantiationError};
use crate::core::links::{FrameConsumer, FrameProducer};
use crate::core::graph::StageSpec;

use super::slots::{require_state, OutputSlot};
use super::worker::StageWorker;

/// Camera-style source. The actual device lives behind the opaque
/// [`CaptureHandle`] supplied in the `device` config value; instantiation
/// fails when no device was configured, which is the missing-camera case
/// callers may want to recover from by falling back to a test pattern.
#[derive(Debug)]
pub struct CaptureSource {
    id: String,
    device: CaptureHandle,
    state: StageState,
    output: OutputSlot,
    worker: Option<StageWorker>,
}

impl CaptureSource {
    pub(crate) fn from_spec(spec: &StageSpec) -> Result<Self, InstantiationError> {
        let device = spec.config.get_capture("device").cloned().ok_or_else(|| {
            InstantiationError::new(&spec.id, &spec.kind, "no capture device configured")
        })?;

        Ok(Self {
            id: spec.id.clone(),
            device,
            state: StageState::Idle,
            output: OutputSlot::default(),
            worker: None,
        })
    }

    pub(crate) fn descriptor() -> StageDescriptor {
        StageDescriptor::new(
            super::kinds::CAPTURE_SOURCE,
            StageRole::Source,
            "Pulls live frames from an externally owned capture device",
        )
        .with_output(PortDescriptor::new(PRIMARY_PORT, "Captured frames", false))
        .with_config_field(ConfigField::new(
            "device",
            "capture",
            true,
            "Opaque capture device handle",
        ))
    }
}

impl StageInstance for CaptureSource {
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
        // Frame geometry depends on the device; nothing to promise here.
        Ok(VideoCaps::any())
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
            super::kinds::CAPTURE_SOURCE,
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
            super::kinds::CAPTURE_SOURCE,
            self.state,
            StageState::Ready,
            "start",
        )?;

        let device = self.device.clone();
        let output = self.output.take();

        let worker = StageWorker::spawn(&self.id, move || match device.capture() {
            Some(frame) => {
                if let Some(producer) = &output {
                    producer.push(frame);
                }
                false
            }
            None => true,
        })
        .map_err(|e| {
            InstantiationError::new(
                &self.id,
                super::kinds::CAPTURE_SOURCE,
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
