//! Fail-fast graph activation.
//!
//! Turns a [`ValidatedGraph`] into a [`RunningGraph`] in four sweeps:
//! instantiate every stage, connect every edge, ready every stage, start
//! every stage, all in topological order. The first failure anywhere
//! aborts the whole activation: everything created so far is stopped, and
//! the error names the edge or stage that failed.

use crate::core::backend::{StageBackend, StageInstance};
use crate::core::error::{LinkError, LinkFailure};
use crate::core::graph::{StageId, ValidatedGraph};
use crate::core::running::RunningGraph;

/// Activate a validated graph against a backend. On success every stage
/// is `Running`; on failure nothing is left running.
pub fn activate(
    graph: &ValidatedGraph,
    backend: &dyn StageBackend,
) -> Result<RunningGraph, LinkError> {
    let order = graph.topological_order();
    tracing::info!(
        "activating graph: {} stages, {} edges",
        graph.stage_count(),
        graph.edge_count()
    );

    let mut stages: Vec<(StageId, Box<dyn StageInstance>)> = Vec::with_capacity(order.len());

    for id in order {
        let spec = graph
            .spec()
            .stage(id)
            .ok_or_else(|| LinkError::at_stage(id.as_str(), missing_stage(id)))?;
        match backend.instantiate(spec) {
            Ok(instance) => {
                tracing::debug!("[{}] instantiated ({})", id, spec.kind);
                stages.push((id.clone(), instance));
            }
            Err(e) => {
                rollback(&mut stages);
                return Err(LinkError::at_stage(id.as_str(), e));
            }
        }
    }

    for edge in graph.ordered_edges() {
        let from_idx = index_of(&stages, &edge.from.stage);
        let to_idx = index_of(&stages, &edge.to.stage);
        let (Some(from_idx), Some(to_idx)) = (from_idx, to_idx) else {
            // Validation guarantees both ends exist.
            rollback(&mut stages);
            return Err(LinkError::at_stage(
                edge.from.stage.as_str(),
                missing_stage(&edge.from.stage),
            ));
        };

        let (from, to) = pair_mut(&mut stages, from_idx, to_idx);
        if let Err(e) = backend.connect(edge, from.as_mut(), to.as_mut()) {
            tracing::error!("failed to link {}: {}", edge, e);
            rollback(&mut stages);
            return Err(LinkError::new(
                edge.from.stage.as_str(),
                edge.to.stage.as_str(),
                LinkFailure::Connect(e),
            ));
        }
    }

    for i in 0..stages.len() {
        if let Err(e) = stages[i].1.make_ready() {
            let id = stages[i].0.clone();
            rollback(&mut stages);
            return Err(LinkError::at_stage(id, e));
        }
        tracing::debug!("[{}] ready", stages[i].0);
    }

    for i in 0..stages.len() {
        if let Err(e) = stages[i].1.start() {
            let id = stages[i].0.clone();
            rollback(&mut stages);
            return Err(LinkError::at_stage(id, e));
        }
        tracing::debug!("[{}] running", stages[i].0);
    }

    tracing::info!("graph activated");
    Ok(RunningGraph::new(stages))
}

/// Stop everything created so far, newest first.
fn rollback(stages: &mut Vec<(StageId, Box<dyn StageInstance>)>) {
    for (id, instance) in stages.iter_mut().rev() {
        tracing::warn!("[{}] rolling back", id);
        instance.stop();
    }
    stages.clear();
}

fn index_of(stages: &[(StageId, Box<dyn StageInstance>)], id: &str) -> Option<usize> {
    stages.iter().position(|(stage_id, _)| stage_id == id)
}

/// Mutable references to two distinct stages at once.
fn pair_mut(
    stages: &mut [(StageId, Box<dyn StageInstance>)],
    a: usize,
    b: usize,
) -> (&mut Box<dyn StageInstance>, &mut Box<dyn StageInstance>) {
    debug_assert_ne!(a, b, "self-edges are rejected during validation");
    if a < b {
        let (left, right) = stages.split_at_mut(b);
        (&mut left[a].1, &mut right[0].1)
    } else {
        let (left, right) = stages.split_at_mut(a);
        (&mut right[0].1, &mut left[b].1)
    }
}

fn missing_stage(id: &str) -> crate::core::error::InstantiationError {
    crate::core::error::InstantiationError::new(id, "?", "stage missing from validated spec")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::{BuiltinBackend, StageState};
    use crate::core::error::{ConnectError, InstantiationError};
    use crate::core::graph::{EdgeSpec, GraphSpec, StageSpec};
    use crate::core::registry::StageRegistry;
    use crate::core::stages::kinds;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn small_graph() -> ValidatedGraph {
        let registry = StageRegistry::with_builtins();
        let mut spec = GraphSpec::new();
        spec.add_stage(StageSpec::new("cam", kinds::TEST_PATTERN_SOURCE).with("fps", 60.0));
        spec.add_stage(StageSpec::new("flip", kinds::FLIP).with("method", 4));
        spec.add_stage(StageSpec::new("out", kinds::COUNTING_SINK));
        spec.connect("cam", "flip").connect("flip", "out");
        spec.build(&registry).unwrap()
    }

    #[test]
    fn test_activate_and_teardown() {
        let graph = small_graph();
        let mut running = activate(&graph, &BuiltinBackend::new()).unwrap();
        assert_eq!(running.stage_count(), 3);
        assert_eq!(running.stage_state("cam"), Some(StageState::Running));
        running.teardown();
        assert_eq!(running.stage_state("cam"), Some(StageState::Stopped));
    }

    /// Backend that fails to instantiate one chosen stage and records how
    /// many stops its instances saw.
    struct FailingBackend {
        fail_stage: String,
        stops: Arc<AtomicUsize>,
    }

    struct TrackedInstance {
        inner: Box<dyn StageInstance>,
        stops: Arc<AtomicUsize>,
    }

    impl StageInstance for TrackedInstance {
        fn id(&self) -> &str {
            self.inner.id()
        }
        fn state(&self) -> StageState {
            self.inner.state()
        }
        fn output_caps(&self, port: &str) -> Result<crate::core::caps::VideoCaps, ConnectError> {
            self.inner.output_caps(port)
        }
        fn input_caps(&self, port: &str) -> Result<crate::core::caps::VideoCaps, ConnectError> {
            self.inner.input_caps(port)
        }
        fn attach_output(
            &mut self,
            port: &str,
            producer: crate::core::links::FrameProducer,
        ) -> Result<(), ConnectError> {
            self.inner.attach_output(port, producer)
        }
        fn attach_input(
            &mut self,
            port: &str,
            consumer: crate::core::links::FrameConsumer,
        ) -> Result<(), ConnectError> {
            self.inner.attach_input(port, consumer)
        }
        fn make_ready(&mut self) -> Result<(), InstantiationError> {
            self.inner.make_ready()
        }
        fn start(&mut self) -> Result<(), InstantiationError> {
            self.inner.start()
        }
        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.inner.stop();
        }
    }

    impl StageBackend for FailingBackend {
        fn instantiate(
            &self,
            spec: &StageSpec,
        ) -> Result<Box<dyn StageInstance>, InstantiationError> {
            if spec.id == self.fail_stage {
                return Err(InstantiationError::new(&spec.id, &spec.kind, "injected"));
            }
            Ok(Box::new(TrackedInstance {
                inner: BuiltinBackend::new().instantiate(spec)?,
                stops: Arc::clone(&self.stops),
            }))
        }
    }

    #[test]
    fn test_instantiation_failure_rolls_back() {
        let graph = small_graph();
        let stops = Arc::new(AtomicUsize::new(0));
        let backend = FailingBackend {
            fail_stage: "out".to_string(),
            stops: Arc::clone(&stops),
        };

        let err = activate(&graph, &backend).unwrap_err();
        assert_eq!(err.from_stage, "out");
        // cam and flip were created before the failure; both get stopped.
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }

    /// Backend that refuses to connect one chosen edge.
    struct RefusingBackend {
        refuse_from: String,
    }

    impl StageBackend for RefusingBackend {
        fn instantiate(
            &self,
            spec: &StageSpec,
        ) -> Result<Box<dyn StageInstance>, InstantiationError> {
            BuiltinBackend::new().instantiate(spec)
        }

        fn connect(
            &self,
            edge: &EdgeSpec,
            from: &mut dyn StageInstance,
            to: &mut dyn StageInstance,
        ) -> Result<(), ConnectError> {
            if edge.from.stage == self.refuse_from {
                return Err(ConnectError::Refused("injected".to_string()));
            }
            BuiltinBackend::new().connect(edge, from, to)
        }
    }

    #[test]
    fn test_connect_failure_names_the_edge() {
        let graph = small_graph();
        let backend = RefusingBackend {
            refuse_from: "flip".to_string(),
        };

        let err = activate(&graph, &backend).unwrap_err();
        assert_eq!(err.from_stage, "flip");
        assert_eq!(err.to_stage, "out");
        assert!(matches!(err.reason, LinkFailure::Connect(_)));
    }

    #[test]
    fn test_incompatible_caps_fail_linking() {
        use crate::core::frames::VideoFrame;
        use crate::core::surface::{PresentationSurface, SurfaceHandle};

        struct NullSurface;
        impl PresentationSurface for NullSurface {
            fn present(&self, _frame: &VideoFrame) {}
        }

        let registry = StageRegistry::with_builtins();
        // convert pins AYUV but the surface only accepts RGBA, so the
        // convert -> display edge must fail caps negotiation.
        let mut spec = GraphSpec::new();
        spec.add_stage(StageSpec::new("cam", kinds::TEST_PATTERN_SOURCE));
        spec.add_stage(
            StageSpec::new("convert", kinds::CONVERT).with("caps", "video/x-raw,format=AYUV"),
        );
        spec.add_stage(
            StageSpec::new("display", kinds::SURFACE_SINK)
                .with("surface", SurfaceHandle::new(Arc::new(NullSurface)))
                .with("caps", "video/x-raw,format=RGBA"),
        );
        spec.connect("cam", "convert").connect("convert", "display");
        let graph = spec.build(&registry).unwrap();

        let err = activate(&graph, &BuiltinBackend::new()).unwrap_err();
        assert_eq!(err.from_stage, "convert");
        assert_eq!(err.to_stage, "display");
        assert!(matches!(
            err.reason,
            LinkFailure::Connect(ConnectError::IncompatibleCaps { .. })
        ));
    }

    #[test]
    fn test_pair_mut_order() {
        let graph = small_graph();
        let mut running = activate(&graph, &BuiltinBackend::new()).unwrap();
        // Indirect check that connection order follows topology: the
        // activation above succeeded, which requires every edge to have
        // found both endpoints.
        assert_eq!(running.stage_count(), 3);
        running.teardown();
    }
}
