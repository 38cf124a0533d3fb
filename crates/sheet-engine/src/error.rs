use thiserror::Error;

use sheet_formula::ParseError;

/// Errors raised across the [`crate::Sheet`] API boundary. Evaluation-time
/// failures (`FormulaError`) are not part of this enum: they are values
/// held inside a cell's `CellValue`, never raised as Rust errors.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("position is out of range")]
    InvalidPosition,

    #[error("edit would create a circular dependency")]
    CircularDependency,

    #[error("formula parse error: {0}")]
    Parse(#[from] ParseError),
}
