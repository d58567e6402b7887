//! Counting sink stage: terminal stage that only counts what arrives.
//!
//! Useful as a lightweight probe in tests and as a stand-in for a real
//! sink when a branch's output is not otherwise observable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::backend::{StageInstance, StageState};
use crate::core::caps::VideoCaps;
use crate::core::descriptors::{PortDescriptor, StageDescriptor, StageRole, PRIMARY_PORT};
use crate::core::error::{ConnectError, InstantiationError};
use crate::core::graph::StageSpec;
use crate::core::links::{FrameConsumer, FrameProducer};

use super::slots::{require_state, InputSlot};
use super::worker::StageWorker;

pub struct CountingSink {
    id: String,
    received: Arc<AtomicU64>,
    state: StageState,
    input: InputSlot,
    worker: Option<StageWorker>,
}

impl CountingSink {
    pub(crate) fn from_spec(spec: &StageSpec) -> Result<Self, InstantiationError> {
        Ok(Self {
            id: spec.id.clone(),
            received: Arc::new(AtomicU64::new(0)),
            state: StageState::Idle,
            input: InputSlot::default(),
            worker: None,
        })
    }

    pub(crate) fn descriptor() -> StageDescriptor {
        StageDescriptor::new(
            super::kinds::COUNTING_SINK,
            StageRole::Sink,
            "Counts received frames and discards them",
        )
        .with_input(PortDescriptor::new(PRIMARY_PORT, "Frames to count", true))
    }

    /// Shared counter, readable after the stage has started.
    pub fn received(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.received)
    }
}

impl StageInstance for CountingSink {
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
        Ok(VideoCaps::any())
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
            super::kinds::COUNTING_SINK,
            self.state,
            StageState::Idle,
            "ready",
        )?;
        if !self.input.is_attached() {
            return Err(InstantiationError::new(
                &self.id,
                super::kinds::COUNTING_SINK,
                "input port is not linked",
            ));
        }
        self.state = StageState::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), InstantiationError> {
        require_state(
            &self.id,
            super::kinds::COUNTING_SINK,
            self.state,
            StageState::Ready,
            "start",
        )?;

        let input = self.input.take().ok_or_else(|| {
            InstantiationError::new(
                &self.id,
                super::kinds::COUNTING_SINK,
                "input port is not linked",
            )
        })?;
        let received = Arc::clone(&self.received);
        let id = self.id.clone();

        let worker = StageWorker::spawn(&self.id, move || {
            let Some(frame) = input.pop() else {
                return true;
            };
            let total = received.fetch_add(1, Ordering::Relaxed) + 1;
            if total % 300 == 0 {
                tracing::debug!(
                    "[{}] {} frames received, latest is #{}",
                    id,
                    total,
                    frame.frame_number
                );
            }
            false
        })
        .map_err(|e| {
            InstantiationError::new(
                &self.id,
                super::kinds::COUNTING_SINK,
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
