//! Jasm builds and runs small static video graphs.
//!
//! A graph is declared up front as stages and edges, validated against a
//! registry of stage kinds, then activated in one fail-fast pass. Once
//! running, the topology is fixed: frames flow from sources through
//! transforms and fan-outs into sinks over bounded, non-blocking queues,
//! and the only remaining operation is teardown.
//!
//! ```no_run
//! use jasm::prelude::*;
//!
//! fn main() -> jasm::Result<()> {
//!     let registry = StageRegistry::with_builtins();
//!
//!     let mut spec = GraphSpec::new();
//!     spec.add_stage(StageSpec::new("cam", "test-pattern-source"));
//!     spec.add_stage(StageSpec::new("flip", "flip").with("method", "horizontal"));
//!     spec.add_stage(StageSpec::new("out", "counting-sink"));
//!     spec.connect("cam", "flip").connect("flip", "out");
//!
//!     let graph = spec.build(&registry)?;
//!     let mut running = activate(&graph, &BuiltinBackend::new())?;
//!
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//!     running.teardown();
//!     Ok(())
//! }
//! ```

pub mod core;

pub use crate::core::error::{JasmError, Result};

/// Everything needed to declare, build, and run a graph.
pub mod prelude {
    pub use crate::core::activation::activate;
    pub use crate::core::backend::{BuiltinBackend, StageBackend, StageInstance, StageState};
    pub use crate::core::caps::{PixelFormat, VideoCaps};
    pub use crate::core::capture::{CaptureHandle, FrameCapture};
    pub use crate::core::config::{ConfigValue, StageConfig};
    pub use crate::core::control::{ControlListener, DEFAULT_CONTROL_PORT};
    pub use crate::core::descriptors::{
        ConfigField, PortDescriptor, StageDescriptor, StageRole, PRIMARY_PORT,
    };
    pub use crate::core::error::{
        ConnectError, InstantiationError, JasmError, LinkError, LinkFailure, ValidationError,
    };
    pub use crate::core::frames::VideoFrame;
    pub use crate::core::graph::{EdgeSpec, GraphSpec, PortRef, StageSpec, ValidatedGraph};
    pub use crate::core::registry::{global_registry, StageRegistry};
    pub use crate::core::running::RunningGraph;
    pub use crate::core::surface::{PresentationSurface, RenderSinkAdapter, SurfaceHandle};
}
