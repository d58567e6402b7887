//! Declarative graph descriptions: stages, edges, and the spec that holds
//! them. Building a spec produces no live resources.

use std::fmt;

use serde::Serialize;

use crate::core::config::{ConfigValue, StageConfig};
use crate::core::descriptors::PRIMARY_PORT;
use crate::core::links::DEFAULT_LINK_CAPACITY;

pub type StageId = String;

/// A named stage declaration: which kind to instantiate and how to
/// configure it.
#[derive(Debug, Clone, Serialize)]
pub struct StageSpec {
    pub id: StageId,
    pub kind: String,
    pub config: StageConfig,
}

impl StageSpec {
    pub fn new(id: impl Into<StageId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            config: StageConfig::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.config.set(key, value);
        self
    }
}

/// One endpoint of an edge: a stage and one of its ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PortRef {
    pub stage: StageId,
    pub port: String,
}

impl PortRef {
    pub fn new(stage: impl Into<StageId>, port: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            port: port.into(),
        }
    }

    pub fn primary(stage: impl Into<StageId>) -> Self {
        Self::new(stage, PRIMARY_PORT)
    }

    /// Parse a `"stage"` or `"stage.port"` address.
    pub fn parse(addr: &str) -> Self {
        match addr.split_once('.') {
            Some((stage, port)) => Self::new(stage, port),
            None => Self::primary(addr),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stage, self.port)
    }
}

/// A directed connection between two stage ports, with the bounded queue
/// depth the activated link will get.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeSpec {
    pub from: PortRef,
    pub to: PortRef,
    pub capacity: usize,
}

impl EdgeSpec {
    pub fn new(from: PortRef, to: PortRef) -> Self {
        Self {
            from,
            to,
            capacity: DEFAULT_LINK_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl fmt::Display for EdgeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// The whole declarative topology: stage declarations plus edges.
///
/// Fixed once built; there is no runtime reconfiguration. Validation and
/// activation live in [`build`](GraphSpec::build) and
/// [`activate`](crate::core::activation::activate).
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphSpec {
    stages: Vec<StageSpec>,
    edges: Vec<EdgeSpec>,
}

impl GraphSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, stage: StageSpec) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn add_edge(&mut self, edge: EdgeSpec) -> &mut Self {
        self.edges.push(edge);
        self
    }

    /// Connect two port addresses (`"stage"` or `"stage.port"`); a bare
    /// stage name means its primary port.
    pub fn connect(&mut self, from: &str, to: &str) -> &mut Self {
        self.add_edge(EdgeSpec::new(PortRef::parse(from), PortRef::parse(to)))
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn edges(&self) -> &[EdgeSpec] {
        &self.edges
    }

    pub fn stage(&self, id: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Validate this spec against a registry, producing an activatable
    /// description. See [`validation`](super::validation).
    pub fn build(
        &self,
        registry: &crate::core::registry::StageRegistry,
    ) -> Result<super::ValidatedGraph, crate::core::error::ValidationError> {
        super::validation::validate(self.clone(), registry)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_ref_parse() {
        assert_eq!(PortRef::parse("tee.src0"), PortRef::new("tee", "src0"));
        assert_eq!(PortRef::parse("flip"), PortRef::primary("flip"));
    }

    #[test]
    fn test_edge_display() {
        let edge = EdgeSpec::new(PortRef::primary("cam"), PortRef::primary("flip"));
        assert_eq!(edge.to_string(), "cam.primary -> flip.primary");
    }

    #[test]
    fn test_connect_builds_edges() {
        let mut spec = GraphSpec::new();
        spec.add_stage(StageSpec::new("cam", "test-pattern-source"));
        spec.add_stage(StageSpec::new("sink", "counting-sink"));
        spec.connect("cam", "sink");

        assert_eq!(spec.edges().len(), 1);
        assert_eq!(spec.edges()[0].capacity, DEFAULT_LINK_CAPACITY);
    }

    #[test]
    fn test_to_json_lists_stages_and_edges() {
        let mut spec = GraphSpec::new();
        spec.add_stage(StageSpec::new("cam", "test-pattern-source").with("fps", 30));
        spec.add_stage(StageSpec::new("sink", "counting-sink"));
        spec.connect("cam", "sink");

        let json = spec.to_json();
        assert_eq!(json["stages"].as_array().unwrap().len(), 2);
        assert_eq!(json["edges"].as_array().unwrap().len(), 1);
        assert_eq!(json["stages"][0]["config"]["fps"], 30);
    }
}
