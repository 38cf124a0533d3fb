use std::cell::RefCell;

use sheet_formula::{Formula, FormulaError, ParseError, Position};

use crate::sheet::Sheet;
use crate::value::CellValue;

/// Leading character that marks a cell's text as a formula.
pub const FORMULA_SIGN: char = '=';
/// Leading character that, on a text cell, is stripped from the displayed
/// value but kept in the raw text.
pub const ESCAPE_SIGN: char = '\'';

/// The payload of a cell: one of three shapes, dispatched by tag.
///
/// `Formula` owns its parsed expression plus an optional memoized value.
/// The cache is just the presence of that `Option`; there is no separate
/// dirty flag, since invalidation is exactly "drop the memoized value".
#[derive(Debug, Clone)]
pub enum CellBody {
    Empty,
    Text(String),
    Formula {
        expr: Formula,
        cache: RefCell<Option<CellValue>>,
    },
}

impl CellBody {
    pub fn new_empty() -> Self {
        CellBody::Empty
    }

    pub fn new_text(raw: impl Into<String>) -> Self {
        CellBody::Text(raw.into())
    }

    pub fn new_formula(raw: &str) -> Result<Self, ParseError> {
        let expr = Formula::parse(raw)?;
        Ok(CellBody::Formula {
            expr,
            cache: RefCell::new(None),
        })
    }

    /// Dispatches raw cell input to the right variant, per the `Cell::set`
    /// rules: empty input is `Empty`; a lone `=` or anything not starting
    /// with `=` is `Text`; `=` followed by more characters is `Formula`,
    /// parsed from everything after the sign.
    pub(crate) fn from_input(raw: &str) -> Result<CellBody, ParseError> {
        if raw.is_empty() {
            return Ok(CellBody::new_empty());
        }
        if raw == "=" || !raw.starts_with(FORMULA_SIGN) {
            return Ok(CellBody::new_text(raw));
        }
        CellBody::new_formula(&raw[FORMULA_SIGN.len_utf8()..])
    }

    /// Evaluates (or returns the memoized value of) this body. Errors are
    /// never memoized: a failed evaluation is retried from scratch on
    /// every call until the formula or its dependencies change.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        match self {
            CellBody::Empty => CellValue::Number(0.0),
            CellBody::Text(raw) => CellValue::Text(strip_escape(raw)),
            CellBody::Formula { expr, cache } => {
                if let Some(value) = cache.borrow().clone() {
                    return value;
                }
                let mut lookup = |pos: Position| sheet.lookup_number(pos);
                match expr.evaluate(&mut lookup) {
                    Ok(n) if n.is_finite() => {
                        let value = CellValue::Number(n);
                        *cache.borrow_mut() = Some(value.clone());
                        value
                    }
                    Ok(_) => CellValue::Error(FormulaError::Div0),
                    Err(e) => CellValue::Error(e),
                }
            }
        }
    }

    pub fn text(&self) -> String {
        match self {
            CellBody::Empty => String::new(),
            CellBody::Text(raw) => raw.clone(),
            CellBody::Formula { expr, .. } => format!("{FORMULA_SIGN}{}", expr.print()),
        }
    }

    /// Positions this body's formula references, deduplicated and sorted
    /// by position order. The parser itself makes no such guarantee
    /// (`Formula::referenced` returns encounter order with duplicates).
    pub fn referenced(&self) -> Vec<Position> {
        match self {
            CellBody::Formula { expr, .. } => {
                let mut refs = expr.referenced();
                refs.sort();
                refs.dedup();
                refs
            }
            _ => Vec::new(),
        }
    }

    pub fn invalidate(&self) {
        if let CellBody::Formula { cache, .. } = self {
            *cache.borrow_mut() = None;
        }
    }

    pub fn cached(&self) -> bool {
        match self {
            CellBody::Formula { cache, .. } => cache.borrow().is_some(),
            _ => true,
        }
    }
}

fn strip_escape(raw: &str) -> String {
    match raw.strip_prefix(ESCAPE_SIGN) {
        Some(rest) => rest.to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;

    #[test]
    fn empty_is_zero_and_always_cached() {
        let body = CellBody::new_empty();
        let sheet = Sheet::new();
        assert_eq!(body.value(&sheet), CellValue::Number(0.0));
        assert_eq!(body.text(), "");
        assert!(body.referenced().is_empty());
        assert!(body.cached());
    }

    #[test]
    fn text_value_strips_leading_escape() {
        let body = CellBody::new_text("'=not a formula");
        let sheet = Sheet::new();
        assert_eq!(
            body.value(&sheet),
            CellValue::Text("=not a formula".to_string())
        );
        assert_eq!(body.text(), "'=not a formula");
    }

    #[test]
    fn text_without_escape_is_unchanged() {
        let body = CellBody::new_text("hello");
        let sheet = Sheet::new();
        assert_eq!(body.value(&sheet), CellValue::Text("hello".to_string()));
    }

    #[test]
    fn formula_references_are_deduplicated_and_sorted() {
        let body = CellBody::new_formula("B1+A1+B1").unwrap();
        assert_eq!(
            body.referenced(),
            vec![Position::new(0, 0), Position::new(0, 1)]
        );
    }

    #[test]
    fn formula_text_reprints_with_equals_sign() {
        let body = CellBody::new_formula("A1+2").unwrap();
        assert_eq!(body.text(), "=A1+2");
    }

    #[test]
    fn formula_memoizes_numeric_results() {
        let mut sheet = Sheet::new();
        sheet.set_cell(Position::new(0, 0), "2").unwrap();
        sheet.set_cell(Position::new(0, 1), "=A1+1").unwrap();
        let cell = sheet.get_cell(Position::new(0, 1)).unwrap().unwrap();
        assert!(!cell.cached());
        assert_eq!(cell.value(&sheet), CellValue::Number(3.0));
        assert!(cell.cached());
    }
}
