//! JSON and YAML documents
//!
//! A document is a flat object mapping variable names to raw values.
//! Documents only ever carry raw values: loading never resolves, and
//! saving never writes resolved values back.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::map::EnvironmentVariableMap;

/// Serialization format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from a file extension; anything but `.json` is YAML
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

impl EnvironmentVariableMap {
    /// Create a map from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        let mut map = Self::new();
        map.layer_json(json)?;
        Ok(map)
    }

    /// Create a map from a YAML mapping
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut map = Self::new();
        map.layer_yaml(yaml)?;
        Ok(map)
    }

    /// Load a map from a file, choosing the format from its extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut map = Self::new();
        map.layer_file(path)?;
        Ok(map)
    }

    /// Apply a JSON object on top of the current values
    pub fn layer_json(&mut self, json: &str) -> Result<()> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::parse(format!("Invalid JSON: {}", e)))?;
        let pairs = json_pairs(value)?;
        log::debug!("Layering {} variable(s) from JSON", pairs.len());
        self.load_raw(pairs);
        Ok(())
    }

    /// Apply a YAML mapping on top of the current values
    pub fn layer_yaml(&mut self, yaml: &str) -> Result<()> {
        let entries: YamlEntries =
            serde_yaml::from_str(yaml).map_err(|e| Error::parse(format!("Invalid YAML: {}", e)))?;
        let pairs = yaml_pairs(entries.0)?;
        log::debug!("Layering {} variable(s) from YAML", pairs.len());
        self.load_raw(pairs);
        Ok(())
    }

    /// Apply a document read from `path` on top of the current values
    pub fn layer_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, &e))?;
        log::debug!("Loading {}", path.display());

        let result = match Format::from_path(path) {
            Format::Json => self.layer_json(&content),
            Format::Yaml => self.layer_yaml(&content),
        };
        result.map_err(|e| match e.help {
            Some(_) => e,
            None => e.with_help(format!("Fix the syntax of '{}'", path.display())),
        })
    }

    /// Serialize the raw values as a JSON object
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.raw_document())
            .map_err(|e| Error::parse(format!("Failed to serialize JSON: {}", e)))
    }

    /// Serialize the raw values as a YAML mapping
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.raw_document())
            .map_err(|e| Error::parse(format!("Failed to serialize YAML: {}", e)))
    }

    /// Write the raw values to `path`, choosing the format from its extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match Format::from_path(path) {
            Format::Json => {
                let mut json = self.to_json()?;
                json.push('\n');
                json
            }
            Format::Yaml => self.to_yaml()?,
        };
        std::fs::write(path, content).map_err(|e| Error::io(path, &e))
    }

    fn raw_document(&self) -> BTreeMap<String, String> {
        self.to_raw_pairs().into_iter().collect()
    }
}

fn json_pairs(value: serde_json::Value) -> Result<Vec<(String, String)>> {
    let object = match value {
        serde_json::Value::Object(object) => object,
        other => {
            return Err(Error::parse(format!(
                "Expected a JSON object at the top level, got {}",
                json_type_name(&other)
            )))
        }
    };

    object
        .into_iter()
        .map(|(key, value)| {
            let raw = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => return Err(Error::invalid_value(&key, json_type_name(&other))),
            };
            Ok((key, raw))
        })
        .collect()
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Top-level YAML mapping entries in document order, repeated keys included
struct YamlEntries(Vec<(serde_yaml::Value, serde_yaml::Value)>);

impl<'de> Deserialize<'de> for YamlEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(YamlEntriesVisitor)
    }
}

struct YamlEntriesVisitor;

impl<'de> Visitor<'de> for YamlEntriesVisitor {
    type Value = YamlEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of variable names to values")
    }

    // An empty document holds no variables
    fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(YamlEntries(Vec::new()))
    }

    fn visit_none<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(YamlEntries(Vec::new()))
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry::<serde_yaml::Value, serde_yaml::Value>()? {
            entries.push(entry);
        }
        Ok(YamlEntries(entries))
    }
}

fn yaml_pairs(
    entries: Vec<(serde_yaml::Value, serde_yaml::Value)>,
) -> Result<Vec<(String, String)>> {
    entries
        .into_iter()
        .map(|(key, value)| {
            let key = yaml_scalar(&key).ok_or_else(|| {
                Error::parse(format!(
                    "Variable names must be scalars, got {}",
                    yaml_type_name(&key)
                ))
            })?;
            let raw = yaml_scalar(&value)
                .ok_or_else(|| Error::invalid_value(&key, yaml_type_name(&value)))?;
            Ok((key, raw))
        })
        .collect()
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_type_name(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "boolean",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}
