//! The condition AST: a tagged union standing in for the document-query
//! dialect, built once at config-load time and walked by both the SQL
//! push-down narrowing and the in-process evaluator so the two can never
//! disagree about what a condition means.

use serde_json::Value;

/// A boolean condition over a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single field operator, e.g. `{"amount": {"$gt": 100}}`.
    Field { field: String, op: FieldOp },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// `$expr`: an operand tree that must evaluate truthy.
    Expr(ExprNode),
    /// The always-true condition (an empty document).
    Always,
}

/// A single-field comparison or structural operator.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    /// Array field contains all of these values.
    All(Vec<Value>),
    /// At least one array element matches the nested condition.
    ElemMatch(Box<Condition>),
    Size(i64),
    Regex { pattern: String, options: String },
    Exists(bool),
    /// `$type`, matched against the BSON-ish type names spec'd for the
    /// dialect: "string" | "int" | "double" | "date" | "bool" | "array" | "null".
    Type(String),
    Mod { divisor: i64, remainder: i64 },
}

/// An operand in an `$expr` tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    /// `"$fieldName"` — reads a document field.
    FieldPath(String),
    /// `"$$NOW"` — the evaluation timestamp, injected by the caller's
    /// `EvalContext` rather than read from the machine clock here.
    Now,
    DateAdd {
        start: Box<Operand>,
        unit: DateUnit,
        amount: Box<Operand>,
    },
    DateSubtract {
        start: Box<Operand>,
        unit: DateUnit,
        amount: Box<Operand>,
    },
    /// Difference between two dates, expressed in `unit`.
    DateDiff {
        start: Box<Operand>,
        end: Box<Operand>,
        unit: DateUnit,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl DateUnit {
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "millisecond" => DateUnit::Millisecond,
            "second" => DateUnit::Second,
            "minute" => DateUnit::Minute,
            "hour" => DateUnit::Hour,
            "day" => DateUnit::Day,
            _ => return None,
        })
    }
}

/// The comparison wrapping an `$expr` operand tree: `$expr` itself only
/// asserts truthiness, but the dialect's actual use (age/window checks)
/// is always a comparison, so we model `$expr` as the pair it's used for.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub op: ExprCmp,
    pub lhs: Operand,
    pub rhs: Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprCmp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}
