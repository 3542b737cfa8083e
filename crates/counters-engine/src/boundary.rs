//! Typed adapters at the edges of the engine: `InboundMessage -> Fact`
//! lives in `counters-core`'s `FactMapper`; this module carries the other
//! two boundary seams -- the outbound response shape, and synthetic
//! example-message generation for the (otherwise out-of-scope)
//! diagnostics endpoint.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use counters_core::mapper::{FieldConfig, FieldType};
use counters_core::message::InboundMessage;
use counters_storage::SaveOutcome;

use crate::pipeline::IngestionResult;
use crate::processing_time::{Metrics, ProcessingTime};

/// A plain serde-serializable mirror of the JSON response body an HTTP
/// boundary would return, minus actual HTTP framing -- `{messageType,
/// factId, saveFactResult, counters, processingTime, debug?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundResponse {
    pub message_type: i32,
    pub fact_id: String,
    pub save_fact_result: SaveOutcome,
    pub counters: BTreeMap<String, BTreeMap<String, Value>>,
    pub processing_time: ProcessingTime,
    pub metrics: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

impl From<&IngestionResult> for OutboundResponse {
    fn from(result: &IngestionResult) -> Self {
        Self {
            message_type: result.fact.t,
            fact_id: result.fact.id.clone(),
            save_fact_result: result.save_fact_result,
            counters: result.counters.clone(),
            processing_time: result.processing_time,
            metrics: result.metrics.clone(),
            debug: result.debug.clone(),
        }
    }
}

/// Fills every field configured for `message_type` with a
/// schema-appropriate placeholder value, standing in for the
/// `GET /api/v1/message/{t}/{json|iris}` synthetic-example-message
/// feature an HTTP boundary would expose.
pub fn generate_example_message(message_type: i32, fields: &[FieldConfig]) -> InboundMessage {
    let mut message = InboundMessage::new(message_type);
    for field in fields.iter().filter(|f| f.message_types.contains(&message_type)) {
        let placeholder = match &field.field_type {
            FieldType::Integer => Value::from(1),
            FieldType::Date => Value::String(Utc::now().to_rfc3339()),
            FieldType::String => Value::String(format!("example-{}", field.src)),
            FieldType::Enum { values } => values
                .first()
                .cloned()
                .map(Value::String)
                .unwrap_or_else(|| Value::String(String::new())),
        };
        message = message.with_field(field.src.clone(), placeholder);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(src: &str, field_type: FieldType) -> FieldConfig {
        FieldConfig {
            src: src.into(),
            dst: src.into(),
            message_types: vec![1],
            required: false,
            key_order: None,
            field_type,
            short_dst: None,
        }
    }

    #[test]
    fn fills_every_configured_field_for_the_message_type() {
        let fields = vec![
            field("accountId", FieldType::String),
            field("amount", FieldType::Integer),
            field(
                "status",
                FieldType::Enum {
                    values: vec!["open".into(), "closed".into()],
                },
            ),
        ];
        let message = generate_example_message(1, &fields);
        assert!(message.fields.contains_key("accountId"));
        assert_eq!(message.fields.get("amount"), Some(&Value::from(1)));
        assert_eq!(message.fields.get("status"), Some(&Value::String("open".into())));
    }

    #[test]
    fn ignores_fields_for_other_message_types() {
        let fields = vec![field("accountId", FieldType::String)];
        let message = generate_example_message(2, &fields);
        assert!(message.fields.is_empty());
    }
}
