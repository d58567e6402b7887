//! Typed stage configuration maps.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::core::capture::CaptureHandle;
use crate::core::error::JasmError;
use crate::core::surface::SurfaceHandle;

/// One configuration value. Opaque handles to external collaborators
/// (presentation surfaces, capture devices) travel through the same map
/// as plain scalars, which is how a sink learns which surface it feeds
/// without the core owning any GUI state.
#[derive(Clone)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Surface(SurfaceHandle),
    Capture(CaptureHandle),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(v) => Some(*v),
            ConfigValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_surface(&self) -> Option<&SurfaceHandle> {
        match self {
            ConfigValue::Surface(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_capture(&self) -> Option<&CaptureHandle> {
        match self {
            ConfigValue::Capture(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{v}"),
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Str(v) => write!(f, "{v:?}"),
            ConfigValue::Surface(_) => f.write_str("<surface>"),
            ConfigValue::Capture(_) => f.write_str("<capture>"),
        }
    }
}

// Handles serialize as placeholders; a serialized graph spec documents
// that a handle was configured, not the handle itself.
impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Bool(v) => serializer.serialize_bool(*v),
            ConfigValue::Int(v) => serializer.serialize_i64(*v),
            ConfigValue::Float(v) => serializer.serialize_f64(*v),
            ConfigValue::Str(v) => serializer.serialize_str(v),
            ConfigValue::Surface(_) => serializer.serialize_str("<surface>"),
            ConfigValue::Capture(_) => serializer.serialize_str("<capture>"),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        ConfigValue::Int(v as i64)
    }
}

impl From<u32> for ConfigValue {
    fn from(v: u32) -> Self {
        ConfigValue::Int(v as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}

impl From<SurfaceHandle> for ConfigValue {
    fn from(v: SurfaceHandle) -> Self {
        ConfigValue::Surface(v)
    }
}

impl From<CaptureHandle> for ConfigValue {
    fn from(v: CaptureHandle) -> Self {
        ConfigValue::Capture(v)
    }
}

/// Key → typed value configuration for one stage.
#[derive(Debug, Clone, Default)]
pub struct StageConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl StageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(ConfigValue::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(ConfigValue::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_surface(&self, key: &str) -> Option<&SurfaceHandle> {
        self.values.get(key).and_then(ConfigValue::as_surface)
    }

    pub fn get_capture(&self, key: &str) -> Option<&CaptureHandle> {
        self.values.get(key).and_then(ConfigValue::as_capture)
    }

    /// Typed lookup that fails loudly, for values a stage cannot run
    /// without.
    pub fn require(&self, key: &str, expected: &str) -> Result<&ConfigValue, JasmError> {
        match self.values.get(key) {
            Some(value) => Ok(value),
            None => Err(JasmError::Configuration(format!(
                "missing required {expected} value '{key}'"
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Serialize for StageConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let mut config = StageConfig::new();
        config.set("fps", 30);
        config.set("pattern", "bars");
        config.set("loop", true);

        assert_eq!(config.get_i64("fps"), Some(30));
        assert_eq!(config.get_str("pattern"), Some("bars"));
        assert_eq!(config.get_bool("loop"), Some(true));
        assert_eq!(config.get_str("fps"), None);
        assert_eq!(config.get_i64("missing"), None);
    }

    #[test]
    fn test_int_coerces_to_float_only() {
        let mut config = StageConfig::new();
        config.set("rate", 25);
        assert_eq!(config.get_f64("rate"), Some(25.0));
        assert_eq!(config.get_bool("rate"), None);
    }

    #[test]
    fn test_require_missing_key() {
        let config = StageConfig::new();
        let err = config.require("surface", "surface").unwrap_err();
        assert!(err.to_string().contains("surface"));
    }

    #[test]
    fn test_debug_hides_handle_internals() {
        use crate::core::frames::VideoFrame;
        use crate::core::surface::{PresentationSurface, SurfaceHandle};
        use std::sync::Arc;

        struct NullSurface;
        impl PresentationSurface for NullSurface {
            fn present(&self, _frame: &VideoFrame) {}
        }

        let mut config = StageConfig::new();
        config.set("surface", SurfaceHandle::new(Arc::new(NullSurface)));
        assert!(format!("{config:?}").contains("<surface>"));
    }
}
