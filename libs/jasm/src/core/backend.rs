//! The backing-implementation boundary.
//!
//! The graph builder and activator only ever talk to a [`StageBackend`]:
//! something that can instantiate a stage kind and connect two stage
//! ports. The in-process [`BuiltinBackend`] hosts the built-in stages on
//! dedicated worker threads; tests substitute their own backend to inject
//! failures.

use std::fmt;

use crate::core::caps::VideoCaps;
use crate::core::error::{ConnectError, InstantiationError};
use crate::core::graph::{EdgeSpec, StageSpec};
use crate::core::links::{frame_link, FrameConsumer, FrameProducer};
use crate::core::stages;

/// Lifecycle of one stage instance. Transitions run exactly once, in
/// order; re-activation after `Stopped` is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Instantiated, not yet wired or resourced.
    Idle,
    /// Wiring verified, resources allocated.
    Ready,
    /// Worker thread running.
    Running,
    /// Worker joined, resources released.
    Stopped,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageState::Idle => "idle",
            StageState::Ready => "ready",
            StageState::Running => "running",
            StageState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// One live stage, owned exclusively by the activator and then by the
/// [`RunningGraph`](crate::core::running::RunningGraph).
pub trait StageInstance: Send {
    fn id(&self) -> &str;

    fn state(&self) -> StageState;

    /// Caps this stage emits on the given output port.
    fn output_caps(&self, port: &str) -> Result<VideoCaps, ConnectError>;

    /// Caps this stage accepts on the given input port.
    fn input_caps(&self, port: &str) -> Result<VideoCaps, ConnectError>;

    fn attach_output(&mut self, port: &str, producer: FrameProducer) -> Result<(), ConnectError>;

    fn attach_input(&mut self, port: &str, consumer: FrameConsumer) -> Result<(), ConnectError>;

    /// Idle → Ready: verify wiring and allocate resources.
    fn make_ready(&mut self) -> Result<(), InstantiationError>;

    /// Ready → Running: spawn the worker thread.
    fn start(&mut self) -> Result<(), InstantiationError>;

    /// → Stopped: signal the worker and join it. Idempotent; safe to call
    /// from any state.
    fn stop(&mut self);
}

/// The component that actually knows how to create and wire stages.
pub trait StageBackend: Send + Sync {
    fn instantiate(&self, spec: &StageSpec) -> Result<Box<dyn StageInstance>, InstantiationError>;

    /// Connect one edge: negotiate caps, create the bounded frame link,
    /// hand each half to its stage.
    fn connect(
        &self,
        edge: &EdgeSpec,
        from: &mut dyn StageInstance,
        to: &mut dyn StageInstance,
    ) -> Result<(), ConnectError> {
        let emitted = from.output_caps(&edge.from.port)?;
        let accepted = to.input_caps(&edge.to.port)?;
        if !emitted.is_compatible_with(&accepted) {
            return Err(ConnectError::IncompatibleCaps {
                from: edge.from.to_string(),
                to: edge.to.to_string(),
                emitted: emitted.to_string(),
                accepted: accepted.to_string(),
            });
        }

        let (producer, consumer) = frame_link(edge.to_string(), edge.capacity);
        from.attach_output(&edge.from.port, producer)?;
        to.attach_input(&edge.to.port, consumer)?;

        tracing::debug!("linked {} (caps {})", edge, emitted);
        Ok(())
    }
}

/// In-process backend hosting the built-in stage kinds.
#[derive(Debug, Default)]
pub struct BuiltinBackend;

impl BuiltinBackend {
    pub fn new() -> Self {
        Self
    }
}

impl StageBackend for BuiltinBackend {
    fn instantiate(&self, spec: &StageSpec) -> Result<Box<dyn StageInstance>, InstantiationError> {
        stages::instantiate_builtin(spec)
    }
}
