//! Conversion des valeurs JSON sources vers les valeurs typées du dataset

use citygeo::{FieldKind, Value};
use serde_json::Value as Json;

use crate::time::parse_timestamp;

/// Convertit une valeur JSON selon le type déclaré de la colonne
///
/// Une valeur absente, vide ou non convertible donne Null.
pub fn json_value(json: &Json, kind: FieldKind) -> Value {
    match (kind, json) {
        (_, Json::Null) => Value::Null,
        (FieldKind::Text, Json::String(s)) => Value::Text(s.clone()),
        (FieldKind::Text, Json::Number(n)) => Value::Text(n.to_string()),
        (FieldKind::Text, Json::Bool(b)) => Value::Text(b.to_string()),
        (FieldKind::Integer, Json::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map_or(Value::Null, Value::Integer),
        (FieldKind::Integer, Json::String(s)) => {
            s.trim().parse().map_or(Value::Null, Value::Integer)
        }
        (FieldKind::Float, Json::Number(n)) => n.as_f64().map_or(Value::Null, Value::Float),
        (FieldKind::Float, Json::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::Null,
        },
        (FieldKind::Boolean, Json::Bool(b)) => Value::Boolean(*b),
        (FieldKind::Timestamp, Json::String(s)) => {
            parse_timestamp(s).map_or(Value::Null, Value::Timestamp)
        }
        _ => Value::Null,
    }
}

/// Valeur textuelle brute (clé manquante ou non textuelle -> Null)
pub fn text_of(json: Option<&Json>) -> Value {
    json.map_or(Value::Null, |j| json_value(j, FieldKind::Text))
}
