//! Surface sink stage: presents frames onto an external surface.

use crate::core::backend::{StageInstance, StageState};
use crate::core::caps::VideoCaps;
use crate::core::descriptors::{
    ConfigField, PortDescriptor, StageDescriptor, StageRole, PRIMARY_PORT,
};
use crate::core::error::{ConnectError, InstantiationError};
use crate::core::graph::StageSpec;
use crate::core::links::{FrameConsumer, FrameProducer};
use crate::core::surface::RenderSinkAdapter;

use super::slots::{require_state, InputSlot};
use super::worker::StageWorker;

/// Terminal stage that hands frames to a [`RenderSinkAdapter`]. The
/// surface itself is owned by the host application and reaches the stage
/// as the opaque `surface` config value.
pub struct SurfaceSink {
    id: String,
    adapter: Option<RenderSinkAdapter>,
    caps: VideoCaps,
    state: StageState,
    input: InputSlot,
    worker: Option<StageWorker>,
}

impl SurfaceSink {
    pub(crate) fn from_spec(spec: &StageSpec) -> Result<Self, InstantiationError> {
        let surface = spec.config.get_surface("surface").cloned().ok_or_else(|| {
            InstantiationError::new(&spec.id, &spec.kind, "no presentation surface configured")
        })?;

        let caps = match spec.config.get_str("caps") {
            Some(caps_str) => VideoCaps::parse(caps_str)
                .map_err(|e| InstantiationError::new(&spec.id, &spec.kind, e.to_string()))?,
            None => VideoCaps::any(),
        };

        Ok(Self {
            adapter: Some(RenderSinkAdapter::new(spec.id.clone(), surface, caps)),
            id: spec.id.clone(),
            caps,
            state: StageState::Idle,
            input: InputSlot::default(),
            worker: None,
        })
    }

    pub(crate) fn descriptor() -> StageDescriptor {
        StageDescriptor::new(
            super::kinds::SURFACE_SINK,
            StageRole::Sink,
            "Presents frames onto an externally owned surface",
        )
        .with_input(PortDescriptor::new(PRIMARY_PORT, "Frames to present", true))
        .with_config_field(ConfigField::new(
            "surface",
            "surface",
            true,
            "Opaque presentation surface handle",
        ))
        .with_config_field(ConfigField::new(
            "caps",
            "string",
            false,
            "Caps the surface accepts; frames outside them are dropped",
        ))
    }
}

impl StageInstance for SurfaceSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> StageState {
        self.state
    }

    fn output_caps(&self, port: &str) -> Result<VideoCaps, ConnectError> {
        Err(ConnectError::NoSuchOutput {
            stage: self.id.clone(),
            port: port.to_string(),
        })
    }

    fn input_caps(&self, port: &str) -> Result<VideoCaps, ConnectError> {
        if port != PRIMARY_PORT {
            return Err(ConnectError::NoSuchInput {
                stage: self.id.clone(),
                port: port.to_string(),
            });
        }
        Ok(self.caps)
    }

    fn attach_output(&mut self, port: &str, _producer: FrameProducer) -> Result<(), ConnectError> {
        Err(ConnectError::NoSuchOutput {
            stage: self.id.clone(),
            port: port.to_string(),
        })
    }

    fn attach_input(&mut self, port: &str, consumer: FrameConsumer) -> Result<(), ConnectError> {
        self.input.attach(&self.id, PRIMARY_PORT, port, consumer)
    }

    fn make_ready(&mut self) -> Result<(), InstantiationError> {
        require_state(
            &self.id,
            super::kinds::SURFACE_SINK,
            self.state,
            StageState::Idle,
            "ready",
        )?;
        if !self.input.is_attached() {
            return Err(InstantiationError::new(
                &self.id,
                super::kinds::SURFACE_SINK,
                "input port is not linked",
            ));
        }
        self.state = StageState::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), InstantiationError> {
        require_state(
            &self.id,
            super::kinds::SURFACE_SINK,
            self.state,
            StageState::Ready,
            "start",
        )?;

        let input = self.input.take().ok_or_else(|| {
            InstantiationError::new(
                &self.id,
                super::kinds::SURFACE_SINK,
                "input port is not linked",
            )
        })?;
        let adapter = self.adapter.take().ok_or_else(|| {
            InstantiationError::new(&self.id, super::kinds::SURFACE_SINK, "already started once")
        })?;

        let worker = StageWorker::spawn(&self.id, move || {
            let Some(frame) = input.pop() else {
                return true;
            };
            adapter.present(&frame);
            false
        })
        .map_err(|e| {
            InstantiationError::new(
                &self.id,
                super::kinds::SURFACE_SINK,
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
