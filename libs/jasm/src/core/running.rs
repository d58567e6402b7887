//! Ownership of an activated graph.

use crate::core::backend::{StageInstance, StageState};
use crate::core::graph::StageId;

/// An activated graph: every stage running on its own worker thread.
///
/// Teardown stops stages in activation order, sources first, so no
/// downstream stage ever sees frames from an already-stopped upstream.
/// Dropping the graph tears it down too; calling [`teardown`] first just
/// makes the join explicit.
///
/// [`teardown`]: RunningGraph::teardown
pub struct RunningGraph {
    stages: Vec<(StageId, Box<dyn StageInstance>)>,
    torn_down: bool,
}

impl std::fmt::Debug for RunningGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningGraph")
            .field(
                "stages",
                &self.stages.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl RunningGraph {
    pub(crate) fn new(stages: Vec<(StageId, Box<dyn StageInstance>)>) -> Self {
        Self {
            stages,
            torn_down: false,
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stage_state(&self, id: &str) -> Option<StageState> {
        self.stages
            .iter()
            .find(|(stage_id, _)| stage_id == id)
            .map(|(_, instance)| instance.state())
    }

    /// True when every stage reports `Running`.
    pub fn is_running(&self) -> bool {
        !self.torn_down
            && self
                .stages
                .iter()
                .all(|(_, instance)| instance.state() == StageState::Running)
    }

    /// Stop every stage and join its worker thread. Idempotent: a second
    /// call is a no-op.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        tracing::info!("tearing down graph ({} stages)", self.stages.len());
        for (id, instance) in &mut self.stages {
            tracing::debug!("[{}] stopping", id);
            instance.stop();
        }
        tracing::info!("graph torn down");
    }
}

impl Drop for RunningGraph {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activation::activate;
    use crate::core::backend::BuiltinBackend;
    use crate::core::graph::{GraphSpec, StageSpec};
    use crate::core::registry::StageRegistry;
    use crate::core::stages::kinds;

    fn running_graph() -> RunningGraph {
        let registry = StageRegistry::with_builtins();
        let mut spec = GraphSpec::new();
        spec.add_stage(StageSpec::new("cam", kinds::TEST_PATTERN_SOURCE).with("fps", 60.0));
        spec.add_stage(StageSpec::new("out", kinds::COUNTING_SINK));
        spec.connect("cam", "out");
        let graph = spec.build(&registry).unwrap();
        activate(&graph, &BuiltinBackend::new()).unwrap()
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut running = running_graph();
        assert!(running.is_running());
        running.teardown();
        assert!(!running.is_running());
        assert_eq!(running.stage_state("cam"), Some(StageState::Stopped));
        // Second call must be a no-op, not a double-join.
        running.teardown();
        assert_eq!(running.stage_state("cam"), Some(StageState::Stopped));
    }

    #[test]
    fn test_drop_tears_down() {
        let running = running_graph();
        drop(running);
        // Nothing to assert directly; the test passes if the drop joins
        // every worker without hanging or panicking.
    }

    #[test]
    fn test_unknown_stage_state_is_none() {
        let mut running = running_graph();
        assert_eq!(running.stage_state("nope"), None);
        running.teardown();
    }
}
