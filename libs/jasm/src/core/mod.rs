//! Core building blocks: stage registry, graph builder, activator, and
//! the built-in stage implementations.

pub mod activation;
pub mod backend;
pub mod caps;
pub mod capture;
pub mod config;
pub mod control;
pub mod descriptors;
pub mod error;
pub mod frames;
pub mod graph;
pub mod links;
pub mod registry;
pub mod running;
pub mod stages;
pub mod surface;

pub use activation::activate;
pub use backend::{BuiltinBackend, StageBackend, StageInstance, StageState};
pub use caps::{PixelFormat, VideoCaps};
pub use capture::{CaptureHandle, FrameCapture};
pub use config::{ConfigValue, StageConfig};
pub use control::{ControlListener, DEFAULT_CONTROL_PORT};
pub use descriptors::{ConfigField, PortDescriptor, StageDescriptor, StageRole, PRIMARY_PORT};
pub use error::{
    ConnectError, InstantiationError, JasmError, LinkError, LinkFailure, Result, UnknownKind,
    ValidationError,
};
pub use frames::VideoFrame;
pub use graph::{EdgeSpec, GraphSpec, PortRef, StageId, StageSpec, ValidatedGraph};
pub use links::{frame_link, FrameConsumer, FrameProducer, LinkStats, DEFAULT_LINK_CAPACITY};
pub use registry::{
    global_registry, is_stage_kind_registered, register_stage_kind, StageRegistration,
    StageRegistry,
};
pub use running::RunningGraph;
pub use surface::{PresentationSurface, RenderSinkAdapter, SurfaceHandle};
