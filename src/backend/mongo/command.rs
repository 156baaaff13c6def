//! Document command - the structured query object for the document backend

use bson::{Bson, Document};
use serde::Serialize;

use crate::backend::{BuildError, BuildResult};
use crate::scalar::Scalar;

/// Document-store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentOp {
    Find,
    Aggregate,
    Insert,
    Update,
    Delete,
}

/// Find options: pagination window plus an ordered sort mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindOpts {
    /// Page size; the executor treats 0 as "return nothing"
    pub limit: i64,
    /// Documents to skip
    pub skip: u64,
    /// Ordered `field → 1|-1` mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Document>,
}

/// A structured command against a document collection.
///
/// Exactly one of `filter`/`pipeline`/`update`/`document` combinations is
/// populated per operation; the executor dispatches on `operation`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentCommand {
    /// Target collection
    pub collection: String,
    /// Operation to run
    pub operation: DocumentOp,
    /// Query filter (find/update/delete)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Document>,
    /// Aggregation pipeline (aggregate)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<Document>>,
    /// Update document (update)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,
    /// Document to insert (insert)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    /// Find options (find)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<FindOpts>,
}

impl DocumentCommand {
    /// Empty command scaffold for an operation
    pub fn new(collection: impl Into<String>, operation: DocumentOp) -> Self {
        Self {
            collection: collection.into(),
            operation,
            filter: None,
            pipeline: None,
            update: None,
            document: None,
            options: None,
        }
    }
}

/// Convert a plan scalar into a BSON value
pub fn scalar_to_bson(scalar: &Scalar) -> BuildResult<Bson> {
    match scalar {
        Scalar::Null => Ok(Bson::Null),
        Scalar::Bool(b) => Ok(Bson::Boolean(*b)),
        Scalar::Int(i) => Ok(Bson::Int64(*i)),
        Scalar::Float(f) => Ok(Bson::Double(*f)),
        Scalar::Text(s) => Ok(Bson::String(s.clone())),
        Scalar::List(items) => Ok(Bson::Array(
            items
                .iter()
                .map(scalar_to_bson)
                .collect::<BuildResult<Vec<_>>>()?,
        )),
        Scalar::Json(value) => bson::to_bson(value)
            .map_err(|e| BuildError::Internal(format!("json value not representable: {}", e))),
    }
}
