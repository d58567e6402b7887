//! Structural validation of a [`GraphSpec`] against a registry.
//!
//! Everything here is side-effect free: the backend is never called, no
//! stage is instantiated, no queue is allocated. A spec that passes comes
//! out as a [`ValidatedGraph`] carrying the topology and the activation
//! order.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::descriptors::{StageDescriptor, StageRole};
use crate::core::error::ValidationError;
use crate::core::registry::StageRegistry;

use super::spec::{EdgeSpec, GraphSpec, StageId};

/// A spec that passed every structural check, plus the topological order
/// activation will follow.
#[derive(Debug)]
pub struct ValidatedGraph {
    spec: GraphSpec,
    graph: DiGraph<StageId, usize>,
    order: Vec<StageId>,
    roles: HashMap<StageId, StageRole>,
}

impl ValidatedGraph {
    pub fn spec(&self) -> &GraphSpec {
        &self.spec
    }

    pub fn stage_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Stages in activation order: every stage before anything downstream
    /// of it.
    pub fn topological_order(&self) -> &[StageId] {
        &self.order
    }

    pub fn role(&self, id: &str) -> Option<StageRole> {
        self.roles.get(id).copied()
    }

    /// Edges ordered by the topological position of their upstream stage;
    /// this is the order activation connects them in.
    pub fn ordered_edges(&self) -> Vec<&EdgeSpec> {
        let position: HashMap<&str, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut indices: Vec<usize> = (0..self.spec.edges().len()).collect();
        indices.sort_by_key(|&i| {
            let edge = &self.spec.edges()[i];
            (position[edge.from.stage.as_str()], i)
        });
        indices.into_iter().map(|i| &self.spec.edges()[i]).collect()
    }

    pub fn to_dot(&self) -> String {
        use petgraph::dot::{Config, Dot};
        format!(
            "{:?}",
            Dot::with_config(&self.graph, &[Config::EdgeNoLabel])
        )
    }
}

pub fn validate(
    spec: GraphSpec,
    registry: &StageRegistry,
) -> Result<ValidatedGraph, ValidationError> {
    let mut descriptors: HashMap<StageId, StageDescriptor> = HashMap::new();
    let mut roles: HashMap<StageId, StageRole> = HashMap::new();

    for stage in spec.stages() {
        if descriptors.contains_key(&stage.id) {
            return Err(ValidationError::DuplicateStage(stage.id.clone()));
        }
        let descriptor =
            registry
                .describe(&stage.kind)
                .map_err(|_| ValidationError::UnknownKind {
                    stage: stage.id.clone(),
                    kind: stage.kind.clone(),
                })?;
        roles.insert(stage.id.clone(), descriptor.role);
        descriptors.insert(stage.id.clone(), descriptor.clone());
    }

    let mut graph: DiGraph<StageId, usize> = DiGraph::new();
    let mut node_indices: HashMap<StageId, NodeIndex> = HashMap::new();
    for stage in spec.stages() {
        let idx = graph.add_node(stage.id.clone());
        node_indices.insert(stage.id.clone(), idx);
    }

    let mut outputs_used: HashSet<(StageId, String)> = HashSet::new();
    let mut inputs_used: HashSet<(StageId, String)> = HashSet::new();

    for (edge_index, edge) in spec.edges().iter().enumerate() {
        let from_desc = descriptors.get(&edge.from.stage).ok_or_else(|| {
            ValidationError::DanglingEdge {
                edge: edge.to_string(),
                stage: edge.from.stage.clone(),
            }
        })?;
        let to_desc = descriptors.get(&edge.to.stage).ok_or_else(|| {
            ValidationError::DanglingEdge {
                edge: edge.to_string(),
                stage: edge.to.stage.clone(),
            }
        })?;

        if from_desc.role == StageRole::Sink {
            return Err(ValidationError::SinkHasOutput {
                stage: edge.from.stage.clone(),
                edge: edge.to_string(),
            });
        }
        if to_desc.role == StageRole::Source {
            return Err(ValidationError::SourceHasInput {
                stage: edge.to.stage.clone(),
                edge: edge.to_string(),
            });
        }

        if !from_desc.has_output(&edge.from.port) {
            return Err(ValidationError::UnknownPort {
                stage: edge.from.stage.clone(),
                port: edge.from.port.clone(),
            });
        }
        if !to_desc.has_input(&edge.to.port) {
            return Err(ValidationError::UnknownPort {
                stage: edge.to.stage.clone(),
                port: edge.to.port.clone(),
            });
        }

        if !outputs_used.insert((edge.from.stage.clone(), edge.from.port.clone())) {
            return Err(ValidationError::OutputPortReused {
                stage: edge.from.stage.clone(),
                port: edge.from.port.clone(),
            });
        }
        if !inputs_used.insert((edge.to.stage.clone(), edge.to.port.clone())) {
            return Err(ValidationError::InputPortReused {
                stage: edge.to.stage.clone(),
                port: edge.to.port.clone(),
            });
        }

        graph.add_edge(
            node_indices[&edge.from.stage],
            node_indices[&edge.to.stage],
            edge_index,
        );
    }

    for stage in spec.stages() {
        let descriptor = &descriptors[&stage.id];
        for port in descriptor.required_inputs() {
            if !inputs_used.contains(&(stage.id.clone(), port.name.clone())) {
                return Err(ValidationError::UnconnectedInput {
                    stage: stage.id.clone(),
                    port: port.name.clone(),
                });
            }
        }
        if descriptor.role == StageRole::FanOut
            && !outputs_used.iter().any(|(id, _)| id == &stage.id)
        {
            return Err(ValidationError::FanOutWithoutBranches {
                stage: stage.id.clone(),
            });
        }
    }

    let order = toposort(&graph, None)
        .map_err(|_| ValidationError::Cycle)?
        .into_iter()
        .map(|idx| graph[idx].clone())
        .collect();

    Ok(ValidatedGraph {
        spec,
        graph,
        order,
        roles,
    })
}
