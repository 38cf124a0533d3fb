use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use sheet_formula::{FormulaError, Position, Size};

use crate::cell::Cell;
use crate::cell_body::CellBody;
use crate::error::SheetError;
use crate::value::CellValue;

/// The grid: a row-major, sparse-trimmed container of [`Cell`]s plus a
/// reverse dependency map (referenced position -> set of dependent
/// positions). The only place mutation happens is `set_cell`/`clear_cell`;
/// every other operation is a read.
#[derive(Debug, Default)]
pub struct Sheet {
    rows: Vec<Vec<Option<Cell>>>,
    /// For each position, the set of formula cells that directly reference it.
    reverse_deps: HashMap<Position, HashSet<Position>>,
    printable: Size,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet::default()
    }

    pub fn printable_size(&self) -> Size {
        self.printable
    }

    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        Ok(self.cell_at(pos))
    }

    /// Creates, replaces, or clears the cell at `pos` from raw input text.
    ///
    /// On `CircularDependency`, the sheet is left exactly as it was before
    /// the call: no partial edit, no dangling reverse edges. On
    /// `ParseError`, nothing is touched at all; the formula is validated
    /// before any bookkeeping mutation begins.
    pub fn set_cell(&mut self, pos: Position, raw: &str) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        let new_body = CellBody::from_input(raw)?;
        let new_refs = new_body.referenced();

        if self.cell_at(pos).is_some() {
            self.set_cell_existing(pos, new_body, &new_refs)?;
        } else {
            self.set_cell_new(pos, new_body, &new_refs)?;
        }

        self.trim_rows();
        self.trim_cols();
        Ok(())
    }

    fn set_cell_existing(
        &mut self,
        pos: Position,
        new_body: CellBody,
        new_refs: &[Position],
    ) -> Result<(), SheetError> {
        let old_body = self.cell_at(pos).expect("checked present").body_clone();
        let old_refs = old_body.referenced();

        self.invalidate_cache_of(pos);
        for r in &old_refs {
            self.remove_reverse_edge(*r, pos);
        }

        self.cell_at_mut(pos).expect("checked present").set_body(new_body);

        if self.has_cycle_at(pos, pos) {
            #[cfg(feature = "tracing")]
            tracing::debug!(?pos, "rejected edit: would create circular dependency");
            self.cell_at_mut(pos).expect("checked present").set_body(old_body);
            for r in &old_refs {
                self.add_reverse_edge(*r, pos);
            }
            return Err(SheetError::CircularDependency);
        }

        for r in new_refs {
            self.add_reverse_edge(*r, pos);
        }
        Ok(())
    }

    fn set_cell_new(
        &mut self,
        pos: Position,
        new_body: CellBody,
        new_refs: &[Position],
    ) -> Result<(), SheetError> {
        let cell = Cell::new(new_body);
        if cell.has_cyclic_dependency(self, pos) {
            #[cfg(feature = "tracing")]
            tracing::debug!(?pos, "rejected new cell: would create circular dependency");
            return Err(SheetError::CircularDependency);
        }
        for r in new_refs {
            self.add_reverse_edge(*r, pos);
        }
        self.expand(pos);
        *self.slot_mut(pos) = Some(cell);
        Ok(())
    }

    fn has_cycle_at(&self, pos: Position, target: Position) -> bool {
        match self.cell_at(pos) {
            Some(cell) => cell.has_cyclic_dependency(self, target),
            None => false,
        }
    }

    /// Clears the cell at `pos`, retaining any reverse edges that name
    /// `pos` as a reference (an upstream formula cell, if re-read, will
    /// see an absent cell and evaluate it as `Number(0)`).
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition);
        }
        if let Some(cell) = self.cell_at(pos) {
            let refs = cell.referenced();
            self.invalidate_cache_of(pos);
            for r in refs {
                self.remove_reverse_edge(r, pos);
            }
            *self.slot_mut(pos) = None;
        }
        self.trim_rows();
        self.trim_cols();
        Ok(())
    }

    /// Writes each row's evaluated values, tab-separated, one row per line.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for row in &self.rows[..self.printable.rows.max(0) as usize] {
            print_row(out, &row[..self.printable.cols.max(0) as usize], |cell| {
                match cell.value(self) {
                    CellValue::Number(n) => n.to_string(),
                    CellValue::Error(e) => e.to_string(),
                    CellValue::Text(s) => s,
                }
            })?;
        }
        Ok(())
    }

    /// Writes each row's raw text, tab-separated, one row per line.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for row in &self.rows[..self.printable.rows.max(0) as usize] {
            print_row(out, &row[..self.printable.cols.max(0) as usize], Cell::text)?;
        }
        Ok(())
    }

    /// Numeric coercion used by formula evaluation (`CellBody::value`'s
    /// lookup closure): an invalid position is `#REF!`; an absent cell is
    /// `0`; a present cell's value is read and, if text, coerced to a
    /// number only when it consists entirely of digits and periods.
    pub(crate) fn lookup_number(&self, pos: Position) -> Result<f64, FormulaError> {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        match self.cell_at(pos) {
            None => Ok(0.0),
            Some(cell) => match cell.value(self) {
                CellValue::Number(n) => Ok(n),
                CellValue::Error(e) => Err(e),
                CellValue::Text(s) => coerce_text_to_number(&s),
            },
        }
    }

    pub(crate) fn cell_at(&self, pos: Position) -> Option<&Cell> {
        self.rows.get(pos.row as usize)?.get(pos.col as usize)?.as_ref()
    }

    fn cell_at_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.rows.get_mut(pos.row as usize)?.get_mut(pos.col as usize)?.as_mut()
    }

    fn slot_mut(&mut self, pos: Position) -> &mut Option<Cell> {
        &mut self.rows[pos.row as usize][pos.col as usize]
    }

    /// Grows the grid so that `pos` is addressable. New rows and new
    /// columns within the touched row start absent.
    fn expand(&mut self, pos: Position) {
        let row = pos.row as usize;
        let col = pos.col as usize;
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let target_row = &mut self.rows[row];
        if target_row.len() <= col {
            target_row.resize_with(col + 1, || None);
        }
    }

    fn trim_rows(&mut self) {
        while matches!(self.rows.last(), Some(row) if row.iter().all(Option::is_none)) {
            self.rows.pop();
        }
        self.printable.rows = self.rows.len() as i32;
    }

    /// Finds the rightmost column holding a non-absent cell in any row,
    /// resizes every row to that width, and records it as the printable
    /// column count. Must run after `trim_rows`.
    fn trim_cols(&mut self) {
        let max_col = self
            .rows
            .iter()
            .filter_map(|row| row.iter().rposition(Option::is_some))
            .max();
        match max_col {
            Some(c) => {
                for row in &mut self.rows {
                    row.resize_with(c + 1, || None);
                }
                self.printable.cols = (c + 1) as i32;
            }
            None => {
                for row in &mut self.rows {
                    row.clear();
                }
                self.printable.cols = 0;
            }
        }
    }

    fn invalidate_cache_of(&self, pos: Position) {
        let Some(dependents) = self.reverse_deps.get(&pos) else {
            return;
        };
        for &dependent in dependents {
            #[cfg(feature = "tracing")]
            tracing::trace!(?pos, ?dependent, "invalidating dependent cache");
            if let Some(cell) = self.cell_at(dependent) {
                cell.invalidate();
            }
            self.invalidate_cache_of(dependent);
        }
    }

    fn add_reverse_edge(&mut self, referenced: Position, dependent: Position) {
        self.reverse_deps.entry(referenced).or_default().insert(dependent);
    }

    fn remove_reverse_edge(&mut self, referenced: Position, dependent: Position) {
        if let Some(set) = self.reverse_deps.get_mut(&referenced) {
            set.remove(&dependent);
            if set.is_empty() {
                self.reverse_deps.remove(&referenced);
            }
        }
    }
}

fn print_row<W: Write>(
    out: &mut W,
    row: &[Option<Cell>],
    mut render: impl FnMut(&Cell) -> String,
) -> io::Result<()> {
    for (i, slot) in row.iter().enumerate() {
        if i > 0 {
            write!(out, "\t")?;
        }
        if let Some(cell) = slot {
            write!(out, "{}", render(cell))?;
        }
    }
    writeln!(out)
}

fn coerce_text_to_number(s: &str) -> Result<f64, FormulaError> {
    if s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        s.parse::<f64>().map_err(|_| FormulaError::Value)
    } else {
        Err(FormulaError::Value)
    }
}
