//! The document-query dialect: parses condition documents into an AST and
//! evaluates them against facts and index entries.
//!
//! This is the one place the dialect's semantics live. Both the storage
//! layer's SQL-level pre-filtering and the in-process counter evaluation
//! walk the same [`ast::Condition`] tree built here, so a pushed-down
//! predicate and its in-process double-check can never disagree.

pub mod ast;
mod error;
mod eval;
mod parser;

pub use ast::{Condition, DateUnit, ExprCmp, ExprNode, FieldOp, Operand};
pub use error::QueryError;
pub use eval::{EvalContext, matches};
