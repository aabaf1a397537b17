//! Resource handle shared with the host
//!
//! The host owns the configuration and the persisted state of a managed SLO.
//! The orchestrator only sees it through `ResourceState`: it reads the
//! configured values, binds or clears the id and writes server-side values
//! back. Writes may be rejected by the host.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::SLO_SCHEMA;

pub trait ResourceState {
    /// Id of the remote object; empty when absent
    fn id(&self) -> &str;

    fn set_id(&mut self, id: &str);

    /// All configured top-level values
    fn values(&self) -> &Map<String, Value>;

    fn get(&self, key: &str) -> Option<&Value> {
        self.values().get(key).filter(|v| !v.is_null())
    }

    /// Write a top-level value. `Value::Null` removes it.
    ///
    /// Returns the host's reason when the write is rejected.
    fn set(&mut self, key: &str, value: Value) -> Result<(), String>;
}

/// In-crate resource handle, validated against the SLO schema on write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default)]
    id: String,

    #[serde(default)]
    values: Map<String, Value>,
}

impl ResourceData {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            values,
        }
    }

    pub fn with_id(id: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    /// Build from a JSON object; anything else yields an empty handle
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self::new(values),
            _ => Self::default(),
        }
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    /// Overlay user configuration onto the stored state.
    ///
    /// Keys absent from `config` keep their stored value only when the
    /// server may fill them in; anything else the user removed is dropped.
    pub fn merge_config(&mut self, config: &Map<String, Value>) {
        self.values.retain(|key, _| {
            config.contains_key(key)
                || SLO_SCHEMA
                    .field(key)
                    .is_some_and(|field| field.presence.is_computed())
        });

        for (key, value) in config {
            self.values.insert(key.clone(), value.clone());
        }
    }
}

impl ResourceState for ResourceData {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), String> {
        let Some(field) = SLO_SCHEMA.field(key) else {
            return Err(format!("field '{key}' is not declared by the schema"));
        };

        if value.is_null() {
            self.values.remove(key);
            return Ok(());
        }

        if !field.kind.accepts(&value) {
            return Err(format!(
                "expected a value of type {} for '{key}'",
                field.kind.type_name()
            ));
        }

        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
