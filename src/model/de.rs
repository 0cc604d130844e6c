//! Lenient deserializers for values the Content Manager API is loose about
//!
//! Ids may arrive as numbers, booleans as `0`/`1`, and object payloads
//! as JSON-encoded strings.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

pub fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().map(|v| v != 0).unwrap_or(false)),
        Value::String(s) => Ok(matches!(s.as_str(), "1" | "true")),
        Value::Null => Ok(false),
        other => Err(D::Error::custom(format!("expected boolean, found {}", other))),
    }
}

pub fn object_or_json_string<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        Value::String(s) if s.trim().is_empty() => Ok(Map::new()),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(D::Error::custom("content string is not a JSON object")),
        },
        Value::Null => Ok(Map::new()),
        other => Err(D::Error::custom(format!("expected object, found {}", other))),
    }
}

pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => serde_json::from_str::<Vec<String>>(&s)
            .map_err(|_| D::Error::custom("pages string is not a JSON array")),
        Value::Null => Ok(Vec::new()),
        other => Err(D::Error::custom(format!("expected list, found {}", other))),
    }
}
