//! `sheetcore`: the evaluation core of a two-dimensional spreadsheet
//! engine, as a thin facade over its two collaborators.
//!
//! - [`sheet_formula`]: the formula collaborator. Addressing
//!   (`Position`/`Size`), the formula parser/AST, and evaluation-time
//!   errors (`FormulaError`/`ParseError`).
//! - [`sheet_engine`]: the engine itself. `CellValue`, `CellBody`,
//!   `Cell`, `Sheet`, and `SheetError`.
//!
//! This crate carries no logic of its own; it re-exports both crates'
//! public surfaces so a driver only needs `sheetcore::*`. No CLI, file
//! I/O, or persistence lives here.

pub use sheet_engine::{Cell, CellBody, CellValue, ESCAPE_SIGN, FORMULA_SIGN, Result, Sheet, SheetError};
pub use sheet_formula::{FormulaError, MAX_COLS, MAX_ROWS, ParseError, Position, Size};
