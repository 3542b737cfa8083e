//! The canonical [`Fact`] record -- one business event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A canonical record of one business event.
///
/// `_id` is derived from a designated key field of the inbound message at
/// mapping time (see [`crate::mapper::FactMapper`]); it is never generated
/// here. Re-submitting the same `_id` updates `d` and leaves `c` unchanged
/// -- that invariant is enforced by the storage layer, not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Globally unique identifier, derived from the message's key field.
    #[serde(rename = "_id")]
    pub id: String,
    /// Message-type discriminator.
    pub t: i32,
    /// Server-assigned creation timestamp, monotonic within a process.
    pub c: DateTime<Utc>,
    /// Payload fields, restricted to what `FactMapper` projected.
    pub d: Map<String, Value>,
}

impl Fact {
    /// Reads a field from `d`, treating missing or empty-string values as
    /// absent. Used uniformly by the indexer and by the condition evaluator
    /// so "empty means missing" is a single rule.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self.d.get(name) {
            None => None,
            Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(v) => Some(v),
        }
    }

    /// Reads a field and renders it as a string, the form `IndexEntry.v`
    /// and the index key formation both need.
    pub fn field_as_string(&self, name: &str) -> Option<String> {
        self.field(name).map(value_to_string)
    }

    /// Reads a field as a date. Accepts an RFC 3339 string (the form
    /// `FactMapper` coerces date fields into) or a millisecond epoch number.
    pub fn field_as_date(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.field(name)? {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| DateTime::from_timestamp_millis(ms)),
            _ => None,
        }
    }
}

/// Renders a JSON value the way `IndexEntry.v` (a diagnostic string)
/// expects: strings pass through unquoted, everything else uses its
/// canonical JSON text.
pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
