//! Built-in stage implementations.
//!
//! Each stage runs its own worker thread pulling from its input link and
//! pushing to its output link(s). Stage kinds are looked up by the string
//! constants in [`kinds`].

mod capture_source;
mod convert;
mod counting_sink;
mod flip;
mod slots;
mod surface_sink;
mod tee;
mod test_pattern;
mod worker;

pub use capture_source::CaptureSource;
pub use convert::ConvertStage;
pub use counting_sink::CountingSink;
pub use flip::{FlipMethod, FlipTransform};
pub use surface_sink::SurfaceSink;
pub use tee::TeeStage;
pub use test_pattern::{TestPatternSource, DEFAULT_FPS, DEFAULT_HEIGHT, DEFAULT_WIDTH};

use crate::core::backend::StageInstance;
use crate::core::descriptors::StageDescriptor;
use crate::core::error::InstantiationError;
use crate::core::graph::StageSpec;

/// Kind names of the built-in stages.
pub mod kinds {
    pub const TEST_PATTERN_SOURCE: &str = "test-pattern-source";
    pub const CAPTURE_SOURCE: &str = "capture-source";
    pub const FLIP: &str = "flip";
    pub const CONVERT: &str = "convert";
    pub const TEE: &str = "tee";
    pub const SURFACE_SINK: &str = "surface-sink";
    pub const COUNTING_SINK: &str = "counting-sink";
}

/// Descriptors for every built-in stage kind.
pub fn builtin_descriptors() -> Vec<StageDescriptor> {
    vec![
        TestPatternSource::descriptor(),
        CaptureSource::descriptor(),
        FlipTransform::descriptor(),
        ConvertStage::descriptor(),
        TeeStage::descriptor(),
        SurfaceSink::descriptor(),
        CountingSink::descriptor(),
    ]
}

/// Instantiate a built-in stage from its spec. Fails when the kind is not
/// built in or the spec's configuration is rejected.
pub fn instantiate_builtin(spec: &StageSpec) -> Result<Box<dyn StageInstance>, InstantiationError> {
    let instance: Box<dyn StageInstance> = match spec.kind.as_str() {
        kinds::TEST_PATTERN_SOURCE => Box::new(TestPatternSource::from_spec(spec)?),
        kinds::CAPTURE_SOURCE => Box::new(CaptureSource::from_spec(spec)?),
        kinds::FLIP => Box::new(FlipTransform::from_spec(spec)?),
        kinds::CONVERT => Box::new(ConvertStage::from_spec(spec)?),
        kinds::TEE => Box::new(TeeStage::from_spec(spec)?),
        kinds::SURFACE_SINK => Box::new(SurfaceSink::from_spec(spec)?),
        kinds::COUNTING_SINK => Box::new(CountingSink::from_spec(spec)?),
        other => {
            return Err(InstantiationError::new(
                &spec.id,
                other,
                "not a built-in stage kind",
            ))
        }
    };
    Ok(instance)
}
