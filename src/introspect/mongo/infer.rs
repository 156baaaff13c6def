//! Type inference - per-field-path statistics over sampled documents
//!
//! Every observed field path (`a`, `a.b`, `a.b.c` in dot notation)
//! accumulates type counts, a null count, and a handful of sample values.
//! Array fields also record an element-type stat under a synthetic
//! `field[]` path, which the resolver later drops from the final schema.

use std::collections::HashMap;

use bson::{Bson, Document};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::catalog::FieldType;

/// Sample values retained per field for ambiguity resolution
const MAX_SAMPLES: usize = 5;

/// Accumulated observations for one field path
#[derive(Debug, Clone, Default)]
pub struct FieldStats {
    /// Observed types with occurrence counts, in first-seen order.
    /// The order is the tie-breaker during resolution, so it must be
    /// deterministic for a given document sequence.
    pub type_counts: Vec<(FieldType, u32)>,
    /// Times the field was observed (present, null or not)
    pub total_count: u32,
    /// Times the field was observed null
    pub null_count: u32,
    /// Up to [`MAX_SAMPLES`] observed values
    pub samples: Vec<Bson>,
}

impl FieldStats {
    fn record_type(&mut self, field_type: FieldType) {
        for entry in &mut self.type_counts {
            if entry.0 == field_type {
                entry.1 += 1;
                return;
            }
        }
        self.type_counts.push((field_type, 1));
    }

    /// Count for one observed type
    pub fn count_of(&self, field_type: FieldType) -> u32 {
        self.type_counts
            .iter()
            .find(|(t, _)| *t == field_type)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }
}

/// Field statistics for one collection, keyed by path in first-seen order
#[derive(Debug, Default)]
pub struct CollectionStats {
    order: Vec<String>,
    fields: HashMap<String, FieldStats>,
    /// Number of documents analyzed
    pub document_count: usize,
}

impl CollectionStats {
    fn entry(&mut self, path: &str) -> &mut FieldStats {
        if !self.fields.contains_key(path) {
            self.order.push(path.to_string());
            self.fields.insert(path.to_string(), FieldStats::default());
        }
        self.fields.get_mut(path).expect("inserted above")
    }

    /// Stats for one path
    pub fn get(&self, path: &str) -> Option<&FieldStats> {
        self.fields.get(path)
    }

    /// Iterate `(path, stats)` in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldStats)> {
        self.order
            .iter()
            .map(|path| (path.as_str(), &self.fields[path]))
    }
}

/// Analyze a document sample into per-path statistics
pub fn infer_schema(documents: &[Document]) -> CollectionStats {
    let mut stats = CollectionStats {
        document_count: documents.len(),
        ..Default::default()
    };

    for document in documents {
        analyze_document(document, "", &mut stats);
    }

    stats
}

fn analyze_document(document: &Document, prefix: &str, stats: &mut CollectionStats) {
    for (key, value) in document {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        let entry = stats.entry(&path);
        entry.total_count += 1;

        if matches!(value, Bson::Null) {
            entry.null_count += 1;
            continue;
        }

        entry.record_type(classify_value(value));
        if entry.samples.len() < MAX_SAMPLES {
            entry.samples.push(value.clone());
        }

        match value {
            Bson::Document(nested) => analyze_document(nested, &path, stats),
            Bson::Array(items) => {
                // Element type is inferred from the first element only.
                if let Some(first) = items.first() {
                    let element_path = format!("{}[]", path);
                    let element = stats.entry(&element_path);
                    element.total_count += 1;
                    element.record_type(classify_value(first));
                }
            }
            _ => {}
        }
    }
}

/// Classify a single BSON value into a catalog type.
///
/// Strings are probed: canonical UUID shape wins over date-time formats,
/// which win over plain text.
pub fn classify_value(value: &Bson) -> FieldType {
    match value {
        Bson::Boolean(_) => FieldType::Boolean,
        Bson::Int32(_) | Bson::Int64(_) => FieldType::Integer,
        Bson::Double(_) | Bson::Decimal128(_) => FieldType::Decimal,
        Bson::String(s) => {
            if is_uuid_shape(s) {
                FieldType::Uuid
            } else if is_date_string(s) {
                FieldType::Timestamp
            } else {
                FieldType::String
            }
        }
        Bson::ObjectId(_) => FieldType::Uuid,
        Bson::DateTime(_) | Bson::Timestamp(_) => FieldType::Timestamp,
        Bson::Document(_) | Bson::Array(_) => FieldType::Json,
        Bson::Binary(_) => FieldType::Binary,
        _ => FieldType::String,
    }
}

/// Canonical `8-4-4-4-12` hex shape only; braced and bare forms stay text
fn is_uuid_shape(s: &str) -> bool {
    s.len() == 36 && uuid::Uuid::try_parse(s).is_ok()
}

/// A small fixed set of ISO-ish date/time spellings
fn is_date_string(s: &str) -> bool {
    if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        return true;
    }
    if DateTime::parse_from_rfc3339(s).is_ok() {
        return true;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_classify_scalars() {
        assert_eq!(classify_value(&Bson::Boolean(true)), FieldType::Boolean);
        assert_eq!(classify_value(&Bson::Int32(1)), FieldType::Integer);
        assert_eq!(classify_value(&Bson::Int64(1)), FieldType::Integer);
        assert_eq!(classify_value(&Bson::Double(1.5)), FieldType::Decimal);
        assert_eq!(
            classify_value(&Bson::ObjectId(bson::oid::ObjectId::new())),
            FieldType::Uuid
        );
        assert_eq!(
            classify_value(&Bson::DateTime(bson::DateTime::now())),
            FieldType::Timestamp
        );
        assert_eq!(
            classify_value(&Bson::Document(doc! { "a": 1 })),
            FieldType::Json
        );
        assert_eq!(
            classify_value(&Bson::Array(vec![Bson::Int32(1)])),
            FieldType::Json
        );
    }

    #[test]
    fn test_classify_string_probing() {
        assert_eq!(
            classify_value(&Bson::String(
                "550e8400-e29b-41d4-a716-446655440000".to_string()
            )),
            FieldType::Uuid
        );
        // bare hex without hyphens is not the canonical shape
        assert_eq!(
            classify_value(&Bson::String(
                "550e8400e29b41d4a716446655440000".to_string()
            )),
            FieldType::String
        );
        assert_eq!(
            classify_value(&Bson::String("2024-06-01".to_string())),
            FieldType::Timestamp
        );
        assert_eq!(
            classify_value(&Bson::String("2024-06-01T12:30:00Z".to_string())),
            FieldType::Timestamp
        );
        assert_eq!(
            classify_value(&Bson::String("2024-06-01T12:30:00.000Z".to_string())),
            FieldType::Timestamp
        );
        assert_eq!(
            classify_value(&Bson::String("2024-06-01 12:30:00".to_string())),
            FieldType::Timestamp
        );
        assert_eq!(
            classify_value(&Bson::String("hello".to_string())),
            FieldType::String
        );
    }

    #[test]
    fn test_infer_nested_paths() {
        let docs = vec![
            doc! { "name": "a", "address": { "city": "X", "geo": { "lat": 1.0 } } },
            doc! { "name": "b", "address": { "city": "Y" } },
        ];

        let stats = infer_schema(&docs);
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.get("name").unwrap().total_count, 2);
        assert_eq!(
            stats.get("address").unwrap().count_of(FieldType::Json),
            2
        );
        assert_eq!(stats.get("address.city").unwrap().total_count, 2);
        assert_eq!(
            stats
                .get("address.geo.lat")
                .unwrap()
                .count_of(FieldType::Decimal),
            1
        );
    }

    #[test]
    fn test_infer_arrays_record_element_path() {
        let docs = vec![doc! { "tags": ["a", "b"] }];
        let stats = infer_schema(&docs);
        assert_eq!(stats.get("tags").unwrap().count_of(FieldType::Json), 1);
        assert_eq!(
            stats.get("tags[]").unwrap().count_of(FieldType::String),
            1
        );
    }

    #[test]
    fn test_infer_counts_nulls() {
        let docs = vec![
            doc! { "email": "a@b" },
            doc! { "email": Bson::Null },
            doc! { "email": Bson::Null },
        ];
        let stats = infer_schema(&docs);
        let email = stats.get("email").unwrap();
        assert_eq!(email.total_count, 3);
        assert_eq!(email.null_count, 2);
        assert_eq!(email.count_of(FieldType::String), 1);
    }

    #[test]
    fn test_samples_are_capped() {
        let docs: Vec<Document> = (0..10).map(|i| doc! { "n": i }).collect();
        let stats = infer_schema(&docs);
        assert_eq!(stats.get("n").unwrap().samples.len(), MAX_SAMPLES);
    }
}
