use std::collections::HashSet;

use sheet_formula::{ParseError, Position};

use crate::cell_body::CellBody;
use crate::sheet::Sheet;
use crate::value::CellValue;

/// One grid slot: a [`CellBody`] plus the operations that need a `&Sheet`
/// to resolve siblings. Holds no back-reference to its owning `Sheet`;
/// every such operation takes `&Sheet` explicitly instead.
#[derive(Debug, Clone)]
pub struct Cell {
    body: CellBody,
}

impl Cell {
    pub(crate) fn new(body: CellBody) -> Self {
        Cell { body }
    }

    /// Replaces this cell's body following the `Cell::set` dispatch rules:
    /// empty input clears to `Empty`; a lone `=` or non-`=`-led text is
    /// `Text`; `=` plus more characters parses a `Formula`.
    pub(crate) fn set(&mut self, raw: &str) -> Result<(), ParseError> {
        self.body = CellBody::from_input(raw)?;
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.body = CellBody::new_empty();
    }

    pub(crate) fn body_clone(&self) -> CellBody {
        self.body.clone()
    }

    pub(crate) fn set_body(&mut self, body: CellBody) {
        self.body = body;
    }

    /// This cell's value, memoizing formula results against `sheet`.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        self.body.value(sheet)
    }

    pub fn text(&self) -> String {
        self.body.text()
    }

    pub fn referenced(&self) -> Vec<Position> {
        self.body.referenced()
    }

    pub fn cached(&self) -> bool {
        self.body.cached()
    }

    pub(crate) fn invalidate(&self) {
        self.body.invalidate();
    }

    /// Depth-first walk through this cell's references (and, transitively,
    /// through `sheet`'s cells) looking for `target`. `self` is the
    /// conceptual root of the walk; detection is purely by matching
    /// `target`, so the walk never needs to track where it started.
    ///
    /// A referenced position with no cell present in `sheet` is a dead
    /// end: it is never materialized as a side effect.
    pub fn has_cyclic_dependency(&self, sheet: &Sheet, target: Position) -> bool {
        let mut visiting = HashSet::new();
        self.referenced()
            .into_iter()
            .any(|r| walk(sheet, r, target, &mut visiting))
    }
}

fn walk(sheet: &Sheet, pos: Position, target: Position, visiting: &mut HashSet<Position>) -> bool {
    if pos == target {
        return true;
    }
    if !visiting.insert(pos) {
        return false;
    }
    match sheet.cell_at(pos) {
        Some(cell) => cell
            .referenced()
            .into_iter()
            .any(|r| walk(sheet, r, target, visiting)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_dispatches_to_the_right_variant() {
        let mut cell = Cell::new(CellBody::new_empty());
        cell.set("hello").unwrap();
        assert_eq!(cell.text(), "hello");

        cell.set("=A1+1").unwrap();
        assert_eq!(cell.text(), "=A1+1");

        cell.set("").unwrap();
        assert_eq!(cell.text(), "");
    }

    #[test]
    fn lone_equals_is_text_not_formula() {
        let mut cell = Cell::new(CellBody::new_empty());
        cell.set("=").unwrap();
        assert_eq!(cell.text(), "=");
        let sheet = Sheet::new();
        assert_eq!(cell.value(&sheet), CellValue::Text("=".to_string()));
    }

    #[test]
    fn set_with_invalid_formula_fails_and_keeps_body() {
        let mut cell = Cell::new(CellBody::new_text("keep me"));
        assert!(cell.set("=A1+").is_err());
        assert_eq!(cell.text(), "keep me");
    }

    #[test]
    fn no_cycle_when_references_are_absent() {
        let sheet = Sheet::new();
        let cell = Cell::new(CellBody::new_formula("Z9+1").unwrap());
        assert!(!cell.has_cyclic_dependency(&sheet, Position::new(8, 25)));
    }

    #[test]
    fn detects_cycle_through_intermediate_cells() {
        let mut sheet = Sheet::new();
        // A2 already references C1.
        sheet
            .set_cell(Position::new(1, 0), "=C1")
            .unwrap_or_else(|_| panic!("A2 should accept =C1"));
        // Candidate content for C1: "=A2". Placing it would close the
        // loop C1 -> A2 -> C1.
        let cell = Cell::new(CellBody::new_formula("A2").unwrap());
        let c1 = Position::new(2, 0);
        assert!(cell.has_cyclic_dependency(&sheet, c1));
    }
}
