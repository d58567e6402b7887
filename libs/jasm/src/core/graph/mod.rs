//! Graph description and validation.
//!
//! A [`GraphSpec`] is a pure description; [`GraphSpec::build`] checks it
//! against a [`StageRegistry`](crate::core::registry::StageRegistry) and
//! yields a [`ValidatedGraph`] that
//! [`activate`](crate::core::activation::activate) can turn into a
//! [`RunningGraph`](crate::core::running::RunningGraph).

pub mod spec;
pub mod validation;

pub use spec::{EdgeSpec, GraphSpec, PortRef, StageId, StageSpec};
pub use validation::ValidatedGraph;
