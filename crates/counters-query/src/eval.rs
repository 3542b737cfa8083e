//! Evaluates a [`Condition`] against a document.
//!
//! The same `matches` function backs both the in-process filter and the
//! "did the SQL layer's pre-filter agree with us" sanity check: there is
//! exactly one notion of what a condition means.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use regex::RegexBuilder;
use serde_json::{Map, Value};

use crate::ast::{Condition, DateUnit, ExprCmp, ExprNode, FieldOp, Operand};

/// Evaluation-time context: everything a condition needs besides the
/// document itself. `now` is threaded in explicitly (never read from the
/// system clock inside `matches`) so evaluation is reproducible in tests
/// and so a single ingestion batch sees one consistent `$$NOW`.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub now: DateTime<Utc>,
}

impl EvalContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

/// Returns `true` if `doc` satisfies `condition`.
pub fn matches(condition: &Condition, doc: &Map<String, Value>, ctx: &EvalContext) -> bool {
    match condition {
        Condition::Always => true,
        Condition::And(cs) => cs.iter().all(|c| matches(c, doc, ctx)),
        Condition::Or(cs) => cs.iter().any(|c| matches(c, doc, ctx)),
        Condition::Not(c) => !matches(c, doc, ctx),
        Condition::Field { field, op } => eval_field_op(doc.get(field), op, doc, ctx),
        Condition::Expr(node) => eval_expr(node, doc, ctx),
    }
}

fn eval_field_op(value: Option<&Value>, op: &FieldOp, doc: &Map<String, Value>, ctx: &EvalContext) -> bool {
    match op {
        FieldOp::Exists(want) => value.is_some() == *want,
        FieldOp::Eq(rhs) => value.is_some_and(|v| loose_eq(v, rhs)),
        FieldOp::Ne(rhs) => !value.is_some_and(|v| loose_eq(v, rhs)),
        FieldOp::Gt(rhs) => cmp_to(value, rhs) == Some(Ordering::Greater),
        FieldOp::Gte(rhs) => matches!(cmp_to(value, rhs), Some(Ordering::Greater | Ordering::Equal)),
        FieldOp::Lt(rhs) => cmp_to(value, rhs) == Some(Ordering::Less),
        FieldOp::Lte(rhs) => matches!(cmp_to(value, rhs), Some(Ordering::Less | Ordering::Equal)),
        FieldOp::In(set) => value.is_some_and(|v| set.iter().any(|s| loose_eq(v, s))),
        FieldOp::Nin(set) => !value.is_some_and(|v| set.iter().any(|s| loose_eq(v, s))),
        FieldOp::All(items) => match value {
            Some(Value::Array(arr)) => items.iter().all(|want| arr.iter().any(|v| loose_eq(v, want))),
            _ => false,
        },
        FieldOp::ElemMatch(inner) => match value {
            Some(Value::Array(arr)) => arr.iter().any(|el| match el {
                Value::Object(o) => matches(inner, o, ctx),
                other => {
                    // scalar array: wrap as a single-field pseudo-document so
                    // `$elemMatch` over e.g. `{"$gt": 5}` still works
                    let mut wrapper = Map::new();
                    wrapper.insert("__elem".into(), other.clone());
                    matches(inner, &wrapper, ctx)
                }
            }),
            _ => false,
        },
        FieldOp::Size(n) => matches!(value, Some(Value::Array(a)) if a.len() as i64 == *n),
        FieldOp::Regex { pattern, options } => match value {
            Some(Value::String(s)) => RegexBuilder::new(pattern)
                .case_insensitive(options.contains('i'))
                .build()
                .map(|re| re.is_match(s))
                .unwrap_or(false),
            _ => false,
        },
        FieldOp::Type(name) => value.is_some_and(|v| type_name(v) == name),
        FieldOp::Mod { divisor, remainder } => match value.and_then(Value::as_i64) {
            Some(n) => divisor != &0 && n % divisor == *remainder,
            None => false,
        },
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "double",
        Value::String(s) if parse_date(s).is_some() => "date",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loose equality: numbers compare numerically across int/float, dates
/// compare by instant regardless of string/epoch representation,
/// everything else falls back to JSON structural equality.
fn loose_eq(a: &Value, b: &Value) -> bool {
    cmp_values(a, b) == Some(Ordering::Equal)
}

fn cmp_to(value: Option<&Value>, rhs: &Value) -> Option<Ordering> {
    cmp_values(value?, rhs)
}

/// Orders two JSON values with the coercions the dialect promises:
/// numeric types compare by numeric value, date-shaped strings/epoch
/// millis compare by instant, otherwise same-type values compare
/// natively and cross-type values are incomparable (`None`).
fn cmp_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(da), Some(db)) = (as_date(a), as_date(b)) {
        return da.partial_cmp(&db);
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn as_date(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

fn eval_expr(node: &ExprNode, doc: &Map<String, Value>, ctx: &EvalContext) -> bool {
    let lhs = resolve_operand(&node.lhs, doc, ctx);
    let rhs = resolve_operand(&node.rhs, doc, ctx);
    let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
        return false;
    };
    let ord = cmp_values(&lhs, &rhs);
    match node.op {
        ExprCmp::Eq => ord == Some(Ordering::Equal),
        ExprCmp::Ne => ord != Some(Ordering::Equal),
        ExprCmp::Gt => ord == Some(Ordering::Greater),
        ExprCmp::Gte => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        ExprCmp::Lt => ord == Some(Ordering::Less),
        ExprCmp::Lte => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Resolves an operand to a JSON value. Dates always resolve to an RFC
/// 3339 string so the result can flow back through [`cmp_values`]'s date
/// path regardless of which side of a comparison produced it.
fn resolve_operand(op: &Operand, doc: &Map<String, Value>, ctx: &EvalContext) -> Option<Value> {
    match op {
        Operand::Literal(v) => Some(v.clone()),
        Operand::FieldPath(field) => doc.get(field).cloned(),
        Operand::Now => Some(Value::String(ctx.now.to_rfc3339())),
        Operand::DateAdd { start, unit, amount } => {
            date_math(start, unit, amount, doc, ctx, 1)
        }
        Operand::DateSubtract { start, unit, amount } => {
            date_math(start, unit, amount, doc, ctx, -1)
        }
        Operand::DateDiff { start, end, unit } => {
            let s = resolve_operand(start, doc, ctx).and_then(|v| as_date(&v))?;
            let e = resolve_operand(end, doc, ctx).and_then(|v| as_date(&v))?;
            let delta = e - s;
            Some(Value::from(duration_in_unit(delta, *unit)))
        }
    }
}

fn date_math(
    start: &Operand,
    unit: &DateUnit,
    amount: &Operand,
    doc: &Map<String, Value>,
    ctx: &EvalContext,
    sign: i64,
) -> Option<Value> {
    let base = resolve_operand(start, doc, ctx).and_then(|v| as_date(&v))?;
    let n = resolve_operand(amount, doc, ctx)?.as_i64()?;
    let delta = unit_duration(*unit, n * sign);
    Some(Value::String((base + delta).to_rfc3339()))
}

fn unit_duration(unit: DateUnit, amount: i64) -> Duration {
    match unit {
        DateUnit::Millisecond => Duration::milliseconds(amount),
        DateUnit::Second => Duration::seconds(amount),
        DateUnit::Minute => Duration::minutes(amount),
        DateUnit::Hour => Duration::hours(amount),
        DateUnit::Day => Duration::days(amount),
    }
}

fn duration_in_unit(d: Duration, unit: DateUnit) -> i64 {
    match unit {
        DateUnit::Millisecond => d.num_milliseconds(),
        DateUnit::Second => d.num_seconds(),
        DateUnit::Minute => d.num_minutes(),
        DateUnit::Hour => d.num_hours(),
        DateUnit::Day => d.num_days(),
    }
}
