//! Errors raised parsing or evaluating a condition document.

/// Raised while turning a JSON condition document into a [`crate::ast::Condition`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
    #[error("condition document must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("operator '{0}' is not supported")]
    UnsupportedOperator(String),
    #[error("operator '{0}' expects {1}, got {2}")]
    BadOperand(String, &'static str, String),
    #[error("'$expr' argument must be an object describing an operator tree")]
    BadExpr,
    #[error("unknown date unit '{0}'")]
    UnknownDateUnit(String),
    #[error("'{0}' must not be an empty array")]
    EmptyArray(&'static str),
    #[error("invalid regular expression '{0}': {1}")]
    InvalidRegex(String, String),
}
