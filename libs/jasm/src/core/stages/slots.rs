//! Port attachment slots used by the built-in stages.

use crate::core::backend::StageState;
use crate::core::error::{ConnectError, InstantiationError};
use crate::core::links::{FrameConsumer, FrameProducer};

/// Single named input port.
#[derive(Default)]
pub(crate) struct InputSlot {
    consumer: Option<FrameConsumer>,
}

impl InputSlot {
    pub fn attach(
        &mut self,
        stage: &str,
        expected_port: &str,
        port: &str,
        consumer: FrameConsumer,
    ) -> Result<(), ConnectError> {
        if port != expected_port {
            return Err(ConnectError::NoSuchInput {
                stage: stage.to_string(),
                port: port.to_string(),
            });
        }
        if self.consumer.is_some() {
            return Err(ConnectError::AlreadyLinked {
                stage: stage.to_string(),
                port: port.to_string(),
            });
        }
        self.consumer = Some(consumer);
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.consumer.is_some()
    }

    pub fn take(&mut self) -> Option<FrameConsumer> {
        self.consumer.take()
    }
}

/// Single named output port.
#[derive(Debug, Default)]
pub(crate) struct OutputSlot {
    producer: Option<FrameProducer>,
}

impl OutputSlot {
    pub fn attach(
        &mut self,
        stage: &str,
        expected_port: &str,
        port: &str,
        producer: FrameProducer,
    ) -> Result<(), ConnectError> {
        if port != expected_port {
            return Err(ConnectError::NoSuchOutput {
                stage: stage.to_string(),
                port: port.to_string(),
            });
        }
        if self.producer.is_some() {
            return Err(ConnectError::AlreadyLinked {
                stage: stage.to_string(),
                port: port.to_string(),
            });
        }
        self.producer = Some(producer);
        Ok(())
    }

    pub fn take(&mut self) -> Option<FrameProducer> {
        self.producer.take()
    }
}

/// Guard a lifecycle transition: the stage must be exactly in `expected`.
pub(crate) fn require_state(
    id: &str,
    kind: &str,
    state: StageState,
    expected: StageState,
    action: &str,
) -> Result<(), InstantiationError> {
    if state != expected {
        return Err(InstantiationError::new(
            id,
            kind,
            format!("cannot {action} from state '{state}' (must be '{expected}')"),
        ));
    }
    Ok(())
}
