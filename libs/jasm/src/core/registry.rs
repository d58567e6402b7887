use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::core::descriptors::StageDescriptor;
use crate::core::error::{JasmError, UnknownKind};

#[derive(Clone)]
pub struct StageRegistration {
    pub descriptor: StageDescriptor,
}

impl StageRegistration {
    pub fn new(descriptor: StageDescriptor) -> Self {
        Self { descriptor }
    }
}

/// Lookup table of available stage kinds.
///
/// Pure description: asking the registry about a kind never touches the
/// backing implementation or allocates any media resource.
pub struct StageRegistry {
    kinds: HashMap<String, StageRegistration>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Registry preloaded with every built-in stage kind.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in crate::core::stages::builtin_descriptors() {
            let name = descriptor.name.clone();
            if let Err(e) = registry.register(descriptor) {
                tracing::warn!("failed to register built-in stage kind '{}': {}", name, e);
            }
        }
        registry
    }

    pub fn register(&mut self, descriptor: StageDescriptor) -> Result<(), JasmError> {
        let name = descriptor.name.clone();

        if self.kinds.contains_key(&name) {
            return Err(JasmError::Configuration(format!(
                "stage kind '{}' is already registered",
                name
            )));
        }

        self.kinds.insert(name, StageRegistration::new(descriptor));

        Ok(())
    }

    /// Describe a stage kind: its role, port arity, and configurable
    /// parameters.
    pub fn describe(&self, kind: &str) -> Result<&StageDescriptor, UnknownKind> {
        self.kinds
            .get(kind)
            .map(|reg| &reg.descriptor)
            .ok_or_else(|| UnknownKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn list(&self) -> Vec<StageDescriptor> {
        self.kinds
            .values()
            .map(|reg| reg.descriptor.clone())
            .collect()
    }

    pub fn unregister(&mut self, kind: &str) -> bool {
        self.kinds.remove(kind).is_some()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<Mutex<StageRegistry>>> = OnceLock::new();

/// Process-wide registry, preloaded with the built-in stage kinds on
/// first use.
pub fn global_registry() -> Arc<Mutex<StageRegistry>> {
    GLOBAL_REGISTRY
        .get_or_init(|| {
            let registry = StageRegistry::with_builtins();
            tracing::info!("registered {} built-in stage kinds", registry.len());
            Arc::new(Mutex::new(registry))
        })
        .clone()
}

pub fn register_stage_kind(descriptor: StageDescriptor) -> Result<(), JasmError> {
    global_registry().lock().register(descriptor)
}

pub fn is_stage_kind_registered(kind: &str) -> bool {
    global_registry().lock().contains(kind)
}
