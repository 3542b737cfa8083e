//! CounterProducer data model: definitions, aggregation expressions, and results.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One configured output attribute's aggregation expression, mirroring the
/// small subset of `$group` accumulators the source dialect supports.
/// `{"$sum": 1}` counts rows; `{"$sum": "$field"}` / `{"$avg": "$field"}` /
/// `{"$min": "$field"}` / `{"$max": "$field"}` reduce over a numeric field.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationExpr {
    Count,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

impl AggregationExpr {
    pub fn from_json(v: &Value) -> Result<Self, String> {
        let obj = v
            .as_object()
            .ok_or_else(|| "aggregation expression must be a JSON object".to_string())?;
        if obj.len() != 1 {
            return Err("aggregation expression must have exactly one operator".to_string());
        }
        let (op, operand) = obj.iter().next().unwrap();
        match op.as_str() {
            "$sum" => match operand {
                Value::Number(n) if n.as_i64() == Some(1) => Ok(Self::Count),
                other => Ok(Self::Sum(field_path(other)?)),
            },
            "$avg" => Ok(Self::Avg(field_path(operand)?)),
            "$min" => Ok(Self::Min(field_path(operand)?)),
            "$max" => Ok(Self::Max(field_path(operand)?)),
            other => Err(format!("unsupported aggregation operator '{other}'")),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Count => serde_json::json!({"$sum": 1}),
            Self::Sum(f) => serde_json::json!({"$sum": format!("${f}")}),
            Self::Avg(f) => serde_json::json!({"$avg": format!("${f}")}),
            Self::Min(f) => serde_json::json!({"$min": format!("${f}")}),
            Self::Max(f) => serde_json::json!({"$max": format!("${f}")}),
        }
    }
}

fn field_path(v: &Value) -> Result<String, String> {
    match v {
        Value::String(s) if s.starts_with('$') => Ok(s[1..].to_string()),
        other => Err(format!("expected a '$field' reference, got {other}")),
    }
}

impl<'de> Deserialize<'de> for AggregationExpr {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Self::from_json(&v).map_err(D::Error::custom)
    }
}

impl Serialize for AggregationExpr {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(s)
    }
}

/// One configured counter: "how many facts indexed under `index_type_name`,
/// within `[now - from_time_ms, now - to_time_ms]`, optionally matching
/// `computation_conditions` and `evaluation_conditions`, are there -- and
/// what do `attributes` look like over them."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterDefinition {
    pub name: String,
    /// Ties this counter to a [`counters_core::indexer::IndexFieldConfig::index_type_name`].
    pub index_type_name: String,
    /// Inclusive lower time bound, as an offset (ms) before "now". `0`
    /// means the lower bound is unbounded (all history is a candidate).
    #[serde(default)]
    pub from_time_ms: i64,
    /// Upper time bound, as an offset (ms) before "now". `0` means the
    /// upper bound is unbounded.
    #[serde(default)]
    pub to_time_ms: i64,
    /// Caps how many candidate rows the storage layer fetches before any
    /// in-process filtering. `0` means uncapped.
    #[serde(default)]
    pub max_evaluated_records: usize,
    /// Caps how many rows, after `computation_conditions` narrows the
    /// fetched set, feed into the attribute aggregation. `0` means uncapped.
    #[serde(default)]
    pub max_matching_records: usize,
    /// Filter applied to the bucket's fetched facts before the row cap and
    /// before attribute aggregation -- conceptually the database
    /// push-down stage, evaluated in-process here (see DESIGN.md).
    #[serde(default)]
    pub computation_conditions: Option<Value>,
    /// Filter applied after `max_matching_records`, for predicates that
    /// can't be expressed as a push-down (cross-field `$expr`, etc.).
    #[serde(default)]
    pub evaluation_conditions: Option<Value>,
    /// Output attribute name -> aggregation expression.
    #[serde(default)]
    pub attributes: BTreeMap<String, AggregationExpr>,
}

impl CounterDefinition {
    /// The grouping key for counters that can share one storage fetch:
    /// same index, same window, same evaluated-record cap. Their
    /// conditions, matching-record cap, and attributes may all differ --
    /// each is re-applied in-process after the shared fetch.
    pub fn bucket_key(&self) -> (String, i64, i64, usize) {
        (
            self.index_type_name.clone(),
            self.from_time_ms,
            self.to_time_ms,
            self.max_evaluated_records,
        )
    }
}

/// The outcome of evaluating one counter definition: its named attribute
/// values plus the `queryId` of the pipeline run that produced them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CounterResult {
    pub name: String,
    pub query_id: u64,
    pub attributes: BTreeMap<String, Value>,
}

/// Errors raised while grouping or evaluating counter definitions.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AggregateError {
    #[error("counter '{0}' is defined more than once")]
    DuplicateCounterName(String),
    #[error("counter '{0}' has an invalid computationConditions: {1}")]
    InvalidComputationCondition(String, String),
    #[error("counter '{0}' has an invalid evaluationConditions: {1}")]
    InvalidEvaluationCondition(String, String),
    #[error("counter '{0}' references unknown index type '{1}'")]
    UnknownIndexType(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_count_sum_avg_min_max() {
        assert_eq!(AggregationExpr::from_json(&json!({"$sum": 1})).unwrap(), AggregationExpr::Count);
        assert_eq!(
            AggregationExpr::from_json(&json!({"$sum": "$amount"})).unwrap(),
            AggregationExpr::Sum("amount".into())
        );
        assert_eq!(
            AggregationExpr::from_json(&json!({"$avg": "$amount"})).unwrap(),
            AggregationExpr::Avg("amount".into())
        );
        assert_eq!(
            AggregationExpr::from_json(&json!({"$min": "$amount"})).unwrap(),
            AggregationExpr::Min("amount".into())
        );
        assert_eq!(
            AggregationExpr::from_json(&json!({"$max": "$amount"})).unwrap(),
            AggregationExpr::Max("amount".into())
        );
    }

    #[test]
    fn rejects_unsupported_operator() {
        assert!(AggregationExpr::from_json(&json!({"$push": "$amount"})).is_err());
    }

    #[test]
    fn roundtrips_through_json() {
        let def = CounterDefinition {
            name: "total".into(),
            index_type_name: "by_account".into(),
            from_time_ms: 0,
            to_time_ms: 0,
            max_evaluated_records: 0,
            max_matching_records: 0,
            computation_conditions: None,
            evaluation_conditions: None,
            attributes: BTreeMap::from([
                ("count".to_string(), AggregationExpr::Count),
                ("sumA".to_string(), AggregationExpr::Sum("amount".into())),
            ]),
        };
        let s = serde_json::to_string(&def).unwrap();
        let back: CounterDefinition = serde_json::from_str(&s).unwrap();
        assert_eq!(back.attributes, def.attributes);
    }
}
