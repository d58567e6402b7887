//! Fan-out stage.

use crate::core::backend::{StageInstance, StageState};
use crate::core::caps::VideoCaps;
use crate::core::descriptors::{PortDescriptor, StageDescriptor, StageRole, PRIMARY_PORT};
use crate::core::error::{ConnectError, InstantiationError};
use crate::core::graph::StageSpec;
use crate::core::links::{FrameConsumer, FrameProducer};

use super::slots::{require_state, InputSlot};
use super::worker::StageWorker;

/// Duplicates each incoming frame onto every attached branch. Output port
/// names are chosen by the graph author; each name may be linked once.
/// Frame payloads are shared, so duplication costs one reference count
/// bump per branch.
pub struct TeeStage {
    id: String,
    state: StageState,
    input: InputSlot,
    branches: Vec<(String, FrameProducer)>,
    worker: Option<StageWorker>,
}

impl TeeStage {
    pub(crate) fn from_spec(spec: &StageSpec) -> Result<Self, InstantiationError> {
        Ok(Self {
            id: spec.id.clone(),
            state: StageState::Idle,
            input: InputSlot::default(),
            branches: Vec::new(),
            worker: None,
        })
    }

    pub(crate) fn descriptor() -> StageDescriptor {
        StageDescriptor::new(
            super::kinds::TEE,
            StageRole::FanOut,
            "Duplicates frames onto every attached branch",
        )
        .with_input(PortDescriptor::new(PRIMARY_PORT, "Frames to duplicate", true))
    }
}

impl StageInstance for TeeStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> StageState {
        self.state
    }

    fn output_caps(&self, _port: &str) -> Result<VideoCaps, ConnectError> {
        // Whatever arrives goes out unchanged on every branch.
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
        if self.branches.iter().any(|(name, _)| name == port) {
            return Err(ConnectError::AlreadyLinked {
                stage: self.id.clone(),
                port: port.to_string(),
            });
        }
        self.branches.push((port.to_string(), producer));
        Ok(())
    }

    fn attach_input(&mut self, port: &str, consumer: FrameConsumer) -> Result<(), ConnectError> {
        self.input.attach(&self.id, PRIMARY_PORT, port, consumer)
    }

    fn make_ready(&mut self) -> Result<(), InstantiationError> {
        require_state(&self.id, super::kinds::TEE, self.state, StageState::Idle, "ready")?;
        if !self.input.is_attached() {
            return Err(InstantiationError::new(
                &self.id,
                super::kinds::TEE,
                "input port is not linked",
            ));
        }
        if self.branches.is_empty() {
            return Err(InstantiationError::new(
                &self.id,
                super::kinds::TEE,
                "no output branches linked",
            ));
        }
        self.state = StageState::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), InstantiationError> {
        require_state(&self.id, super::kinds::TEE, self.state, StageState::Ready, "start")?;

        let input = self.input.take().ok_or_else(|| {
            InstantiationError::new(&self.id, super::kinds::TEE, "input port is not linked")
        })?;
        let branches = std::mem::take(&mut self.branches);

        let worker = StageWorker::spawn(&self.id, move || {
            let Some(frame) = input.pop() else {
                return true;
            };
            for (_name, producer) in &branches {
                producer.push(frame.clone());
            }
            false
        })
        .map_err(|e| {
            InstantiationError::new(
                &self.id,
                super::kinds::TEE,
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
