//! `FactMapper` -- turns an [`InboundMessage`] into a canonical [`Fact`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fact::{Fact, value_to_string};
use crate::message::InboundMessage;

/// The type a configured field coerces to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldType {
    Integer,
    Date,
    String,
    /// Value must be one of `values`; stored as-is (a string) on success.
    Enum { values: Vec<String> },
}

/// One field projection rule: `message.<src>` (restricted to `message_types`)
/// copies into `fact.d.<dst>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub src: String,
    pub dst: String,
    /// Message types this rule applies to.
    pub message_types: Vec<i32>,
    /// Whether this field must be present (and, if it is also a key
    /// candidate, contributes to `_id` resolution).
    pub required: bool,
    /// Lower numbers are tried first as `_id` candidates. `None` means
    /// this field never contributes to key resolution.
    pub key_order: Option<u32>,
    pub field_type: FieldType,
    /// Alternate destination name used when the mapper is configured to
    /// emit short field names (a space-saving mode some producers enable).
    #[serde(default)]
    pub short_dst: Option<String>,
}

/// Errors raised while mapping a message to a fact.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("unknown message type: {0}")]
    UnknownMessageType(i32),
    #[error("no key candidate resolved for message type {message_type}")]
    MissingKey { message_type: i32 },
    #[error("field '{field}' could not be coerced to {expected}: {reason}")]
    TypeCoercion {
        field: String,
        expected: &'static str,
        reason: String,
    },
    #[error("config error: {0}")]
    Config(String),
}

/// Maps inbound messages to canonical facts per a set of [`FieldConfig`] rules.
#[derive(Debug, Clone)]
pub struct FactMapper {
    fields: Vec<FieldConfig>,
    use_short_names: bool,
}

impl FactMapper {
    /// Validates the field configuration and builds a mapper.
    ///
    /// Fails fast (`ConfigError`) on an empty `message_types` for any rule,
    /// since such a rule could never fire and almost always signals a typo.
    pub fn new(fields: Vec<FieldConfig>, use_short_names: bool) -> Result<Self, MapperError> {
        for f in &fields {
            if f.message_types.is_empty() {
                return Err(MapperError::Config(format!(
                    "field '{}' has no message_types",
                    f.src
                )));
            }
        }
        Ok(Self {
            fields,
            use_short_names,
        })
    }

    /// Returns `true` if any field rule applies to `message_type`.
    pub fn knows_message_type(&self, message_type: i32) -> bool {
        self.fields
            .iter()
            .any(|f| f.message_types.contains(&message_type))
    }

    /// Maps an inbound message to a canonical fact.
    pub fn map(&self, message: &InboundMessage, now: DateTime<Utc>) -> Result<Fact, MapperError> {
        if !self.knows_message_type(message.t) {
            return Err(MapperError::UnknownMessageType(message.t));
        }

        let applicable: Vec<&FieldConfig> = self
            .fields
            .iter()
            .filter(|f| f.message_types.contains(&message.t))
            .collect();

        let mut d = Map::new();
        for field in &applicable {
            let Some(raw) = message.fields.get(&field.src) else {
                continue; // missing optional fields are skipped
            };
            let coerced = coerce(field, raw)?;
            let dst = self.dst_name(field);
            d.insert(dst, coerced);
        }

        let id = self.resolve_key(&applicable, &d, message.t)?;

        Ok(Fact {
            id,
            t: message.t,
            c: now,
            d,
        })
    }

    fn dst_name<'a>(&self, field: &'a FieldConfig) -> String {
        if self.use_short_names {
            field
                .short_dst
                .clone()
                .unwrap_or_else(|| field.dst.clone())
        } else {
            field.dst.clone()
        }
    }

    /// Picks the first key candidate (by ascending `key_order`) whose
    /// mapped value is present in `d`.
    fn resolve_key(
        &self,
        applicable: &[&FieldConfig],
        d: &Map<String, Value>,
        message_type: i32,
    ) -> Result<String, MapperError> {
        let mut candidates: Vec<&&FieldConfig> = applicable
            .iter()
            .filter(|f| f.key_order.is_some())
            .collect();
        candidates.sort_by_key(|f| f.key_order.unwrap());

        for field in candidates {
            let dst = self.dst_name(field);
            if let Some(value) = d.get(&dst) {
                let s = value_to_string(value);
                if !s.is_empty() {
                    return Ok(s);
                }
            }
        }

        Err(MapperError::MissingKey { message_type })
    }
}

fn coerce(field: &FieldConfig, raw: &Value) -> Result<Value, MapperError> {
    match &field.field_type {
        FieldType::String => Ok(Value::String(value_to_string(raw))),
        FieldType::Integer => match raw {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(raw.clone()),
            Value::String(s) => s
                .parse::<i64>()
                .map(|v| Value::Number(v.into()))
                .map_err(|e| MapperError::TypeCoercion {
                    field: field.src.clone(),
                    expected: "integer",
                    reason: e.to_string(),
                }),
            other => Err(MapperError::TypeCoercion {
                field: field.src.clone(),
                expected: "integer",
                reason: format!("unexpected value {other}"),
            }),
        },
        FieldType::Date => {
            let parsed = match raw {
                Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc)),
                Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
                _ => None,
            };
            match parsed {
                Some(dt) => Ok(Value::String(dt.to_rfc3339())),
                None => Err(MapperError::TypeCoercion {
                    field: field.src.clone(),
                    expected: "date",
                    reason: format!("cannot parse {raw} as a date"),
                }),
            }
        }
        FieldType::Enum { values } => {
            let s = value_to_string(raw);
            if values.iter().any(|v| v == &s) {
                Ok(Value::String(s))
            } else {
                Err(MapperError::TypeCoercion {
                    field: field.src.clone(),
                    expected: "enum",
                    reason: format!("'{s}' is not one of {values:?}"),
                })
            }
        }
    }
}
