//! [`IndexEntry`] -- one projection of a fact's field into the searchable index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How an index key is formed from a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexValueMode {
    /// `h = Base64(SHA1(indexType + ":" + stringValue))`.
    Opaque,
    /// `h = indexType + ":" + stringValue`, readable for debugging.
    Transparent,
}

impl IndexValueMode {
    /// Parses the wire-level integer encoding (`1` or `2`) from config.
    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Opaque),
            2 => Some(Self::Transparent),
            _ => None,
        }
    }
}

/// The composite `_id` of an [`IndexEntry`]: `(h, f)` must be unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexEntryId {
    /// The index key.
    pub h: String,
    /// The owning fact's `_id`.
    pub f: String,
}

/// One projection of a fact's field into a searchable index row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "_id")]
    pub id: IndexEntryId,
    /// Indexed "indexType", unique per entry definition.
    pub it: i32,
    /// Original field value, rendered as a string (diagnostics + lookup).
    pub v: String,
    /// Copy of the owning fact's `t`.
    pub t: i32,
    /// Domain date copied from the configured date field of the fact.
    pub dt: DateTime<Utc>,
    /// Copy of the owning fact's `c`.
    pub c: DateTime<Utc>,
    /// Embedded fact payload, present only when `includeFactDataToIndex` is
    /// enabled -- lets counters run against a single collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Map<String, Value>>,
}
