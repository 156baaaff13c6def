//! Scalar - runtime values carried through plans and bound as parameters

use serde::Serialize;
use serde_json::Value;

/// A single value flowing from the DSL boundary into a backend query.
///
/// JSON objects survive as [`Scalar::Json`] so that `json`-typed columns can
/// carry nested documents; everything else maps onto the usual scalar set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Text(String),
    /// Homogeneous sequence (operator arguments for `in`, `between`, ...)
    List(Vec<Scalar>),
    /// Nested JSON document
    Json(Value),
}

impl Scalar {
    /// Check if this scalar is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// String reference, None if not text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// List reference, None if not a sequence
    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            Scalar::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert back into a JSON value (lossless for everything we accept)
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::List(items) => Value::Array(items.iter().map(Scalar::to_json).collect()),
            Scalar::Json(v) => v.clone(),
        }
    }
}

impl From<&Value> for Scalar {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Scalar::Int(i)
                } else {
                    Scalar::Float(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => Scalar::Text(s.clone()),
            Value::Array(items) => Scalar::List(items.iter().map(Scalar::from).collect()),
            Value::Object(_) => Scalar::Json(value.clone()),
        }
    }
}

impl From<Value> for Scalar {
    fn from(value: Value) -> Self {
        Scalar::from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_from_json() {
        assert_eq!(Scalar::from(json!(null)), Scalar::Null);
        assert_eq!(Scalar::from(json!(true)), Scalar::Bool(true));
        assert_eq!(Scalar::from(json!(42)), Scalar::Int(42));
        assert_eq!(Scalar::from(json!(1.5)), Scalar::Float(1.5));
        assert_eq!(Scalar::from(json!("abc")), Scalar::Text("abc".to_string()));
        assert_eq!(
            Scalar::from(json!([1, 2])),
            Scalar::List(vec![Scalar::Int(1), Scalar::Int(2)])
        );
        assert_eq!(
            Scalar::from(json!({"k": "v"})),
            Scalar::Json(json!({"k": "v"}))
        );
    }

    #[test]
    fn test_scalar_round_trip() {
        let values = vec![
            json!(null),
            json!(false),
            json!(7),
            json!(2.25),
            json!("text"),
            json!(["a", "b"]),
            json!({"nested": {"deep": 1}}),
        ];
        for v in values {
            assert_eq!(Scalar::from(&v).to_json(), v);
        }
    }

    #[test]
    fn test_scalar_serializes_untagged() {
        let s = Scalar::List(vec![Scalar::Text("x".into()), Scalar::Int(3)]);
        assert_eq!(serde_json::to_value(&s).unwrap(), json!(["x", 3]));
    }
}
