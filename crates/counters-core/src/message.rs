//! The boundary type between decoded wire bodies and [`crate::Fact`].
//!
//! Decoding the wire body itself (JSON/XML/whatever the transport carries)
//! is someone else's job: whatever decodes it is expected to produce an
//! [`InboundMessage`], and everything downstream of that is this crate's
//! concern.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded inbound message, already flattened to a `{t, fields}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message-type discriminator.
    pub t: i32,
    /// Flat field map, keyed by the message's own field names (`src` in
    /// [`crate::mapper::FieldConfig`]).
    pub fields: Map<String, Value>,
}

impl InboundMessage {
    pub fn new(t: i32) -> Self {
        Self {
            t,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}
