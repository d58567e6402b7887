//! Stage and port descriptor types for introspection.

use serde::{Deserialize, Serialize};

/// Default port name for stages with a single input or output.
pub const PRIMARY_PORT: &str = "primary";

/// What position a stage kind occupies in a graph. Closed set; fixed once
/// a descriptor is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageRole {
    /// Produces frames, takes no input.
    Source,
    /// Consumes and produces.
    Transform,
    /// Duplicates one input to many named output branches (tee).
    FanOut,
    /// Consumes frames, produces nothing.
    Sink,
}

/// Describes an input or output port.
#[derive(Debug, Clone, Serialize)]
pub struct PortDescriptor {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
        }
    }
}

/// A configuration field a stage kind understands.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    pub description: String,
}

impl ConfigField {
    pub fn new(
        name: impl Into<String>,
        field_type: impl Into<String>,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            required,
            description: description.into(),
        }
    }
}

/// Describes a stage kind: its role, ports, and configurable parameters.
#[derive(Debug, Clone, Serialize)]
pub struct StageDescriptor {
    pub name: String,
    pub description: String,
    pub role: StageRole,
    pub inputs: Vec<PortDescriptor>,
    pub outputs: Vec<PortDescriptor>,
    pub config_fields: Vec<ConfigField>,
    /// Fan-out stages declare output ports per graph, not here.
    pub dynamic_outputs: bool,
}

impl StageDescriptor {
    pub fn new(name: impl Into<String>, role: StageRole, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            role,
            inputs: Vec::new(),
            outputs: Vec::new(),
            config_fields: Vec::new(),
            dynamic_outputs: role == StageRole::FanOut,
        }
    }

    pub fn with_input(mut self, port: PortDescriptor) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: PortDescriptor) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn with_config_field(mut self, field: ConfigField) -> Self {
        self.config_fields.push(field);
        self
    }

    /// Inputs that must be connected for the stage to run.
    pub fn required_inputs(&self) -> impl Iterator<Item = &PortDescriptor> {
        self.inputs.iter().filter(|p| p.required)
    }

    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.iter().any(|p| p.name == port)
    }

    pub fn has_output(&self, port: &str) -> bool {
        self.dynamic_outputs || self.outputs.iter().any(|p| p.name == port)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_accepts_any_output_name() {
        let desc = StageDescriptor::new("tee", StageRole::FanOut, "duplicates input")
            .with_input(PortDescriptor::new(PRIMARY_PORT, "input", true));
        assert!(desc.has_output("display_out"));
        assert!(desc.has_output("preview_out"));
    }

    #[test]
    fn test_fixed_outputs_are_closed() {
        let desc = StageDescriptor::new("flip", StageRole::Transform, "flips frames")
            .with_input(PortDescriptor::new(PRIMARY_PORT, "input", true))
            .with_output(PortDescriptor::new(PRIMARY_PORT, "output", false));
        assert!(desc.has_output(PRIMARY_PORT));
        assert!(!desc.has_output("src0"));
    }

    #[test]
    fn test_required_inputs_filter() {
        let desc = StageDescriptor::new("mix", StageRole::Transform, "")
            .with_input(PortDescriptor::new("a", "", true))
            .with_input(PortDescriptor::new("b", "", false));
        let required: Vec<_> = desc.required_inputs().map(|p| p.name.as_str()).collect();
        assert_eq!(required, vec!["a"]);
    }
}
