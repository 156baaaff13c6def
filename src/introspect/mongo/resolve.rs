//! Type resolution - field statistics to concrete catalog fields

use bson::Bson;

use crate::catalog::{Field, FieldType, Model};
use crate::introspect::mongo::infer::{CollectionStats, FieldStats};

/// A field missing or null in more than this fraction of observations is
/// considered nullable.
pub const NULLABLE_THRESHOLD: f64 = 0.10;

/// Resolve one field path to `(type, nullable)`.
///
/// The most frequent observed type wins, ties broken by first-seen order.
/// A winner at or below 50% with both integer and string observations gets
/// a second look: if every sampled string parses as an integer, the field
/// resolves to integer.
pub fn resolve_field_type(stats: &FieldStats) -> (FieldType, bool) {
    if stats.type_counts.is_empty() {
        return (FieldType::String, true);
    }

    let mut winner = stats.type_counts[0].0;
    let mut max_count = stats.type_counts[0].1;
    for &(field_type, count) in &stats.type_counts[1..] {
        if count > max_count {
            winner = field_type;
            max_count = count;
        }
    }

    let nullable = stats.null_count as f64 > stats.total_count as f64 * NULLABLE_THRESHOLD;

    if max_count * 2 <= stats.total_count
        && stats.count_of(FieldType::Integer) > 0
        && stats.count_of(FieldType::String) > 0
        && all_integer_strings(&stats.samples)
    {
        return (FieldType::Integer, nullable);
    }

    (winner, nullable)
}

/// Check that every sampled string value parses as an integer
fn all_integer_strings(samples: &[Bson]) -> bool {
    samples.iter().all(|value| match value {
        Bson::String(s) => s.parse::<i64>().is_ok(),
        _ => true,
    })
}

/// Turn collection statistics into a model.
///
/// Synthetic `path[]` element stats are dropped (arrays surface as `json`),
/// and the primary key is always `_id`; if sampling never surfaced `_id`, a
/// non-nullable uuid `_id` field is injected at the front.
pub fn model_from_stats(collection: &str, stats: &CollectionStats) -> Model {
    let mut fields = Vec::new();

    for (path, field_stats) in stats.iter() {
        if path.ends_with("[]") {
            continue;
        }

        let (field_type, nullable) = resolve_field_type(field_stats);
        fields.push(Field::new(path, field_type).nullable(nullable));
    }

    if !fields.iter().any(|f| f.name == "_id") {
        fields.insert(0, Field::new("_id", FieldType::Uuid).nullable(false));
    }

    Model {
        name: collection.to_string(),
        table: collection.to_string(),
        primary_key: "_id".to_string(),
        fields,
    }
}
