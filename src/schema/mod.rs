//! Declarative configuration schema
//!
//! The schema describes every configuration field the SLO resource
//! recognises: its semantic type, whether it is required, optional or
//! computed, its default and its validators. It is built once on first use
//! and shared read-only afterwards.
//!
//! ## Usage
//!
//! ```
//! use serde_json::json;
//! use slo_reconciler::schema::SLO_SCHEMA;
//!
//! let config = json!({ "name": "n" });
//! let errors = SLO_SCHEMA.validate(config.as_object().unwrap());
//! assert!(errors.iter().any(|e| e.path == "description"));
//! ```

pub mod fields;
pub mod validators;

use std::sync::LazyLock;

use serde_json::{Map, Value};

use crate::error::{ValidationError, ViolationKind};

pub use validators::Validator;

/// The process-wide SLO resource schema
pub static SLO_SCHEMA: LazyLock<ResourceSchema> =
    LazyLock::new(|| ResourceSchema::new(fields::slo_fields()));

/// Semantic type of a field
#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Int,
    Bool,
    Float,
    /// Free-form string to string mapping
    StringMap,
    /// A single nested mapping with its own fields
    Block(Vec<Field>),
    /// An ordered list of nested mappings
    List(Vec<Field>),
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int => "integer",
            FieldKind::Bool => "boolean",
            FieldKind::Float => "float",
            FieldKind::StringMap => "map of strings",
            FieldKind::Block(_) => "mapping",
            FieldKind::List(_) => "list",
        }
    }

    /// Shallow JSON type check; nested fields are checked separately
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Int => value.is_i64() || value.is_u64(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::Float => value.is_number(),
            FieldKind::StringMap => value
                .as_object()
                .is_some_and(|map| map.values().all(Value::is_string)),
            FieldKind::Block(_) => value.is_object(),
            FieldKind::List(_) => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// May be set by the user, filled in by the server otherwise
    OptionalComputed,
}

impl Presence {
    pub fn is_computed(&self) -> bool {
        matches!(self, Presence::OptionalComputed)
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    pub default: Option<Value>,
    pub validators: Vec<Validator>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional,
            default: None,
            validators: Vec::new(),
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn float(name: &'static str) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn string_map(name: &'static str) -> Self {
        Self::new(name, FieldKind::StringMap)
    }

    pub fn block(name: &'static str, fields: Vec<Field>) -> Self {
        Self::new(name, FieldKind::Block(fields))
    }

    pub fn list(name: &'static str, fields: Vec<Field>) -> Self {
        Self::new(name, FieldKind::List(fields))
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }
}

/// A set of top-level fields
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    fields: Vec<Field>,
}

impl ResourceSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check a configuration against the schema.
    ///
    /// Returns every violation found; an empty vector means the configuration
    /// is valid field by field. `null` counts as absent, and so does an empty
    /// string in a required string field.
    pub fn validate(&self, values: &Map<String, Value>) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        validate_fields(&self.fields, values, "", &mut errors);
        errors
    }

    /// Fill in declared defaults for absent fields, recursing into nested
    /// blocks and list elements.
    pub fn apply_defaults(&self, values: &mut Map<String, Value>) {
        apply_defaults(&self.fields, values);
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn validate_fields(
    fields: &[Field],
    values: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    for key in values.keys() {
        if !fields.iter().any(|f| f.name == key) {
            errors.push(ValidationError::new(join(prefix, key), ViolationKind::UnknownField));
        }
    }

    for field in fields {
        let path = join(prefix, field.name);

        let value = match values.get(field.name) {
            Some(Value::Null) | None => {
                if field.presence == Presence::Required {
                    errors.push(ValidationError::missing(path));
                }
                continue;
            }
            Some(Value::String(text)) if text.is_empty() && field.presence == Presence::Required => {
                errors.push(ValidationError::missing(path));
                continue;
            }
            Some(value) => value,
        };

        if !field.kind.accepts(value) {
            errors.push(ValidationError::new(
                path,
                ViolationKind::TypeMismatch {
                    expected: field.kind.type_name(),
                },
            ));
            continue;
        }

        for validator in &field.validators {
            if let Err(e) = validator.check(&path, value) {
                errors.push(e);
            }
        }

        match (&field.kind, value) {
            (FieldKind::Block(nested), Value::Object(map)) => {
                validate_fields(nested, map, &path, errors);
            }
            (FieldKind::List(nested), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if let Value::Object(map) = item {
                        validate_fields(nested, map, &format!("{path}.{i}"), errors);
                    }
                }
            }
            _ => {}
        }
    }
}

fn apply_defaults(fields: &[Field], values: &mut Map<String, Value>) {
    for field in fields {
        match values.get_mut(field.name) {
            None | Some(Value::Null) => {
                if let Some(default) = &field.default {
                    values.insert(field.name.to_string(), default.clone());
                }
            }
            Some(Value::Object(map)) => {
                if let FieldKind::Block(nested) = &field.kind {
                    apply_defaults(nested, map);
                }
            }
            Some(Value::Array(items)) => {
                if let FieldKind::List(nested) = &field.kind {
                    for item in items.iter_mut() {
                        if let Value::Object(map) = item {
                            apply_defaults(nested, map);
                        }
                    }
                }
            }
            Some(_) => {}
        }
    }
}
