//! Catalog - model definitions and the schema registry
//!
//! The catalog is the source of truth for entities, fields, types, and
//! primary keys. It is loaded once at process start from a JSON config
//! document and shared read-only thereafter; a catalog change requires a
//! restart.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ModelConfig;

/// Field types supported by the catalog (closed set)
///
/// Unknown type names are rejected when the config document is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Text
    String,
    /// 64-bit integer
    Integer,
    /// Integer alias kept for config compatibility
    Int,
    /// 64-bit floating point
    Float,
    /// Arbitrary-precision numeric
    Decimal,
    /// Boolean (true/false)
    Boolean,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time
    Timestamp,
    /// Date and time alias kept for config compatibility
    DateTime,
    /// UUID
    Uuid,
    /// Nested JSON document or array
    Json,
    /// Binary data
    Binary,
}

impl FieldType {
    /// Check if this type can be the target of sum/avg/min/max aggregates
    pub fn is_aggregatable(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Int | FieldType::Float | FieldType::Decimal
        )
    }

    /// Check if this type is a date/time type
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::Time | FieldType::Timestamp | FieldType::DateTime
        )
    }

    /// The wire name used in config documents
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Timestamp => "timestamp",
            FieldType::DateTime => "datetime",
            FieldType::Uuid => "uuid",
            FieldType::Json => "json",
            FieldType::Binary => "binary",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field definition - one column or document attribute of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique within its model
    pub name: String,
    /// Data type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether NULL values are allowed
    pub nullable: bool,
}

impl Field {
    /// Create a new field definition
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// Set nullable
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Derived: true iff the type is numeric per the aggregatable set
    pub fn is_aggregatable(&self) -> bool {
        self.field_type.is_aggregatable()
    }
}

/// Model definition - a named entity mapped to a table or collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Name used in DSL queries, unique across the catalog
    pub name: String,
    /// Physical table or collection name
    pub table: String,
    /// Name of the field used as the default identifier
    #[serde(rename = "primaryKey")]
    pub primary_key: String,
    /// Ordered field definitions, names unique
    pub fields: Vec<Field>,
}

impl Model {
    /// Create a new model definition
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: String::new(),
            fields: Vec::new(),
        }
    }

    /// Set the primary key field name
    #[must_use]
    pub fn primary_key(mut self, pk: impl Into<String>) -> Self {
        self.primary_key = pk.into();
        self
    }

    /// Add a field
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Get field by name
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The field declared as primary key
    pub fn primary_key_field(&self) -> Option<&Field> {
        self.get_field(&self.primary_key)
    }
}

/// Catalog load error
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Two models share a name
    #[error("duplicate model name '{0}'")]
    DuplicateModel(String),
    /// Two fields within one model share a name
    #[error("duplicate field '{field}' in model '{model}'")]
    DuplicateField { model: String, field: String },
    /// Declared primary key does not resolve to a field
    #[error("primary key '{primary_key}' of model '{model}' is not a declared field")]
    UnknownPrimaryKey { model: String, primary_key: String },
    /// Model has no fields
    #[error("model '{0}' declares no fields")]
    EmptyModel(String),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Schema registry - the loaded, immutable set of model definitions
///
/// Constructed once at startup; all lookups are read-only, so concurrent
/// readers share the registry behind a plain `Arc`.
#[derive(Debug)]
pub struct Registry {
    /// Models in config order
    models: Vec<Model>,
    /// Name → position in `models`
    index: HashMap<String, usize>,
}

impl Registry {
    /// Load a registry from a parsed config document, enforcing catalog
    /// invariants: unique model names, unique field names per model, and a
    /// primary key that resolves to a declared field.
    pub fn load(config: ModelConfig) -> CatalogResult<Self> {
        let mut index = HashMap::with_capacity(config.models.len());

        for (pos, model) in config.models.iter().enumerate() {
            if index.insert(model.name.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateModel(model.name.clone()));
            }

            if model.fields.is_empty() {
                return Err(CatalogError::EmptyModel(model.name.clone()));
            }

            let mut seen = HashMap::with_capacity(model.fields.len());
            for field in &model.fields {
                if seen.insert(field.name.as_str(), ()).is_some() {
                    return Err(CatalogError::DuplicateField {
                        model: model.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }

            if model.primary_key_field().is_none() {
                return Err(CatalogError::UnknownPrimaryKey {
                    model: model.name.clone(),
                    primary_key: model.primary_key.clone(),
                });
            }
        }

        Ok(Registry {
            models: config.models,
            index,
        })
    }

    /// Get a model by name
    pub fn get_model(&self, name: &str) -> Option<&Model> {
        self.index.get(name).map(|&pos| &self.models[pos])
    }

    /// List model names in config order
    pub fn list_models(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    /// All models in config order
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Check whether a field exists on a model
    pub fn field_exists(&self, model: &str, field: &str) -> bool {
        self.get_model(model)
            .map(|m| m.get_field(field).is_some())
            .unwrap_or(false)
    }
}
