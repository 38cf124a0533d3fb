use std::fmt;

use thiserror::Error;

/// An evaluation-time formula error. These are values, not exceptions: a
/// formula cell that fails to evaluate holds one of these as its
/// `CellValue`, it is never raised across the `Sheet` API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaError {
    /// A formula referenced an invalid position.
    Ref,
    /// A text value could not be coerced to a number during arithmetic.
    Value,
    /// Evaluation produced a non-finite number (division by zero, overflow, NaN).
    Div0,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        };
        write!(f, "{s}")
    }
}

impl std::error::Error for FormulaError {}

/// A formula string failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("expected {expected}, found {found}")]
    Unexpected { expected: &'static str, found: String },
}
