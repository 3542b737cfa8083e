//! Parses a JSON condition document into a [`Condition`] tree.
//!
//! Unsupported operators fail fast at parse time (config-load time, in
//! practice) rather than being silently ignored at evaluation time -- a
//! typo in a counter definition should surface as a config error, not as
//! a counter that quietly never matches anything.

use regex::Regex;
use serde_json::Value;

use crate::ast::{Condition, DateUnit, ExprCmp, ExprNode, FieldOp, Operand};
use crate::error::QueryError;

impl Condition {
    /// Parses a top-level condition document, e.g.
    /// `{"t": 1, "amount": {"$gt": 100}, "$or": [...]}`.
    pub fn from_json(value: &Value) -> Result<Condition, QueryError> {
        let obj = value
            .as_object()
            .ok_or(QueryError::NotAnObject(json_type_name(value)))?;

        if obj.is_empty() {
            return Ok(Condition::Always);
        }

        let mut clauses = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            clauses.push(parse_entry(key, val)?);
        }

        Ok(if clauses.len() == 1 {
            clauses.into_iter().next().unwrap()
        } else {
            Condition::And(clauses)
        })
    }
}

fn parse_entry(key: &str, val: &Value) -> Result<Condition, QueryError> {
    if let Some(op) = key.strip_prefix('$') {
        return parse_top_level_operator(op, val);
    }
    parse_field(key, val)
}

fn parse_top_level_operator(op: &str, val: &Value) -> Result<Condition, QueryError> {
    match op {
        "and" => Ok(Condition::And(parse_condition_array(val, "$and")?)),
        "or" => Ok(Condition::Or(parse_condition_array(val, "$or")?)),
        "not" => Ok(Condition::Not(Box::new(Condition::from_json(val)?))),
        "expr" => Ok(Condition::Expr(parse_expr(val)?)),
        other => Err(QueryError::UnsupportedOperator(format!("${other}"))),
    }
}

fn parse_condition_array(val: &Value, name: &'static str) -> Result<Vec<Condition>, QueryError> {
    let arr = val
        .as_array()
        .ok_or(QueryError::BadOperand(name.into(), "an array", json_type_name(val).into()))?;
    if arr.is_empty() {
        return Err(QueryError::EmptyArray(name));
    }
    arr.iter().map(Condition::from_json).collect()
}

fn parse_field(field: &str, val: &Value) -> Result<Condition, QueryError> {
    match val {
        // a bare literal is shorthand for $eq
        Value::Object(ops) if !ops.is_empty() => {
            let mut clauses = Vec::with_capacity(ops.len());
            for (op, arg) in ops {
                clauses.push(Condition::Field {
                    field: field.to_string(),
                    op: parse_field_op(op, arg)?,
                });
            }
            Ok(if clauses.len() == 1 {
                clauses.into_iter().next().unwrap()
            } else {
                Condition::And(clauses)
            })
        }
        other => Ok(Condition::Field {
            field: field.to_string(),
            op: FieldOp::Eq(other.clone()),
        }),
    }
}

fn parse_field_op(op: &str, arg: &Value) -> Result<FieldOp, QueryError> {
    let op = op
        .strip_prefix('$')
        .ok_or_else(|| QueryError::UnsupportedOperator(op.to_string()))?;
    Ok(match op {
        "eq" => FieldOp::Eq(arg.clone()),
        "ne" => FieldOp::Ne(arg.clone()),
        "gt" => FieldOp::Gt(arg.clone()),
        "gte" => FieldOp::Gte(arg.clone()),
        "lt" => FieldOp::Lt(arg.clone()),
        "lte" => FieldOp::Lte(arg.clone()),
        "in" => FieldOp::In(as_value_array(arg, "$in")?),
        "nin" => FieldOp::Nin(as_value_array(arg, "$nin")?),
        "all" => FieldOp::All(as_value_array(arg, "$all")?),
        "elemMatch" => FieldOp::ElemMatch(Box::new(Condition::from_json(arg)?)),
        "size" => FieldOp::Size(
            arg.as_i64()
                .ok_or(QueryError::BadOperand("$size".into(), "an integer", json_type_name(arg).into()))?,
        ),
        "regex" => parse_regex_op(arg)?,
        "exists" => FieldOp::Exists(
            arg.as_bool()
                .ok_or(QueryError::BadOperand("$exists".into(), "a boolean", json_type_name(arg).into()))?,
        ),
        "type" => FieldOp::Type(
            arg.as_str()
                .ok_or(QueryError::BadOperand("$type".into(), "a string", json_type_name(arg).into()))?
                .to_string(),
        ),
        "mod" => parse_mod_op(arg)?,
        other => return Err(QueryError::UnsupportedOperator(format!("${other}"))),
    })
}

fn parse_regex_op(arg: &Value) -> Result<FieldOp, QueryError> {
    let (pattern, options) = match arg {
        Value::String(s) => (s.clone(), String::new()),
        Value::Object(o) => {
            let pattern = o
                .get("pattern")
                .and_then(Value::as_str)
                .ok_or(QueryError::BadOperand("$regex".into(), "a 'pattern' string", json_type_name(arg).into()))?
                .to_string();
            let options = o
                .get("options")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            (pattern, options)
        }
        other => {
            return Err(QueryError::BadOperand(
                "$regex".into(),
                "a string or {pattern, options}",
                json_type_name(other).into(),
            ));
        }
    };
    let compiled = if options.contains('i') {
        format!("(?i){pattern}")
    } else {
        pattern.clone()
    };
    Regex::new(&compiled).map_err(|e| QueryError::InvalidRegex(pattern.clone(), e.to_string()))?;
    Ok(FieldOp::Regex { pattern, options })
}

fn parse_mod_op(arg: &Value) -> Result<FieldOp, QueryError> {
    let arr = arg
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or(QueryError::BadOperand("$mod".into(), "a [divisor, remainder] pair", json_type_name(arg).into()))?;
    let divisor = arr[0]
        .as_i64()
        .ok_or(QueryError::BadOperand("$mod".into(), "integer divisor", json_type_name(&arr[0]).into()))?;
    let remainder = arr[1]
        .as_i64()
        .ok_or(QueryError::BadOperand("$mod".into(), "integer remainder", json_type_name(&arr[1]).into()))?;
    Ok(FieldOp::Mod { divisor, remainder })
}

fn as_value_array(val: &Value, op: &'static str) -> Result<Vec<Value>, QueryError> {
    val.as_array()
        .cloned()
        .ok_or(QueryError::BadOperand(op.into(), "an array", json_type_name(val).into()))
}

fn parse_expr(val: &Value) -> Result<ExprNode, QueryError> {
    let obj = val.as_object().filter(|o| o.len() == 1).ok_or(QueryError::BadExpr)?;
    let (op, args) = obj.iter().next().unwrap();
    let cmp = match op.as_str() {
        "$eq" => ExprCmp::Eq,
        "$ne" => ExprCmp::Ne,
        "$gt" => ExprCmp::Gt,
        "$gte" => ExprCmp::Gte,
        "$lt" => ExprCmp::Lt,
        "$lte" => ExprCmp::Lte,
        other => return Err(QueryError::UnsupportedOperator(other.to_string())),
    };
    let pair = args.as_array().filter(|a| a.len() == 2).ok_or(QueryError::BadExpr)?;
    Ok(ExprNode {
        op: cmp,
        lhs: parse_operand(&pair[0])?,
        rhs: parse_operand(&pair[1])?,
    })
}

fn parse_operand(val: &Value) -> Result<Operand, QueryError> {
    match val {
        Value::String(s) if s == "$$NOW" => Ok(Operand::Now),
        Value::String(s) if s.starts_with('$') => Ok(Operand::FieldPath(s[1..].to_string())),
        Value::Object(o) if o.len() == 1 => {
            let (op, arg) = o.iter().next().unwrap();
            match op.as_str() {
                "$dateAdd" => parse_date_math(arg, DateMath::Add),
                "$dateSubtract" => parse_date_math(arg, DateMath::Subtract),
                "$dateDiff" => parse_date_diff(arg),
                _ => Ok(Operand::Literal(val.clone())),
            }
        }
        other => Ok(Operand::Literal(other.clone())),
    }
}

enum DateMath {
    Add,
    Subtract,
}

fn parse_date_math(arg: &Value, kind: DateMath) -> Result<Operand, QueryError> {
    let obj = arg.as_object().ok_or(QueryError::BadExpr)?;
    let start = Box::new(parse_operand(
        obj.get("startDate").ok_or(QueryError::BadExpr)?,
    )?);
    let unit_str = obj
        .get("unit")
        .and_then(Value::as_str)
        .ok_or(QueryError::BadExpr)?;
    let unit = DateUnit::from_str(unit_str).ok_or_else(|| QueryError::UnknownDateUnit(unit_str.to_string()))?;
    let amount = Box::new(parse_operand(
        obj.get("amount").ok_or(QueryError::BadExpr)?,
    )?);
    Ok(match kind {
        DateMath::Add => Operand::DateAdd { start, unit, amount },
        DateMath::Subtract => Operand::DateSubtract { start, unit, amount },
    })
}

fn parse_date_diff(arg: &Value) -> Result<Operand, QueryError> {
    let obj = arg.as_object().ok_or(QueryError::BadExpr)?;
    let start = Box::new(parse_operand(
        obj.get("startDate").ok_or(QueryError::BadExpr)?,
    )?);
    let end = Box::new(parse_operand(
        obj.get("endDate").ok_or(QueryError::BadExpr)?,
    )?);
    let unit_str = obj
        .get("unit")
        .and_then(Value::as_str)
        .ok_or(QueryError::BadExpr)?;
    let unit = DateUnit::from_str(unit_str).ok_or_else(|| QueryError::UnknownDateUnit(unit_str.to_string()))?;
    Ok(Operand::DateDiff { start, end, unit })
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_is_always_true() {
        assert_eq!(Condition::from_json(&json!({})).unwrap(), Condition::Always);
    }

    #[test]
    fn bare_literal_is_implicit_eq() {
        let c = Condition::from_json(&json!({"t": 1})).unwrap();
        assert_eq!(
            c,
            Condition::Field {
                field: "t".into(),
                op: FieldOp::Eq(json!(1))
            }
        );
    }

    #[test]
    fn multiple_top_level_keys_become_and() {
        let c = Condition::from_json(&json!({"t": 1, "amount": {"$gt": 10}})).unwrap();
        assert!(matches!(c, Condition::And(v) if v.len() == 2));
    }

    #[test]
    fn multiple_operators_on_one_field_become_and() {
        let c = Condition::from_json(&json!({"amount": {"$gt": 10, "$lt": 100}})).unwrap();
        assert!(matches!(c, Condition::And(v) if v.len() == 2));
    }

    #[test]
    fn rejects_unsupported_operator() {
        let err = Condition::from_json(&json!({"amount": {"$bogus": 1}})).unwrap_err();
        assert_eq!(err, QueryError::UnsupportedOperator("$bogus".into()));
    }

    #[test]
    fn rejects_invalid_regex_at_parse_time() {
        let err = Condition::from_json(&json!({"name": {"$regex": "("}})).unwrap_err();
        assert!(matches!(err, QueryError::InvalidRegex(_, _)));
    }

    #[test]
    fn parses_expr_with_now_and_date_subtract() {
        let c = Condition::from_json(&json!({
            "$expr": {
                "$gte": ["$c", { "$dateSubtract": { "startDate": "$$NOW", "unit": "day", "amount": 30 } }]
            }
        }))
        .unwrap();
        match c {
            Condition::Expr(node) => {
                assert_eq!(node.op, ExprCmp::Gte);
                assert_eq!(node.lhs, Operand::FieldPath("c".into()));
                assert!(matches!(node.rhs, Operand::DateSubtract { .. }));
            }
            _ => panic!("expected Expr"),
        }
    }

    #[test]
    fn empty_and_array_is_rejected() {
        let err = Condition::from_json(&json!({"$and": []})).unwrap_err();
        assert_eq!(err, QueryError::EmptyArray("$and"));
    }
}
