use std::fmt;

use crate::ast::Expr;
use crate::error::{FormulaError, ParseError};
use crate::parser::Parser;
use crate::position::Position;

/// A parsed, evaluable formula expression.
///
/// This is the engine's formula collaborator: it is constructed from raw
/// text (without the leading `=`), evaluated against a caller-supplied
/// position lookup, printed back to a canonical textual form, and can list
/// the positions it references, in parser-determined (not deduplicated)
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    root: Expr,
}

impl Formula {
    pub fn parse(raw: &str) -> Result<Formula, ParseError> {
        let root = Parser::parse(raw)?;
        Ok(Formula { root })
    }

    /// Evaluates the expression tree, calling `lookup` for every cell
    /// reference encountered. The result may be a non-finite `f64`
    /// (division by zero, overflow) or `NaN`. Classifying that into
    /// [`FormulaError::Div0`] is the caller's job, not this method's;
    /// division is never specially checked here.
    pub fn evaluate(
        &self,
        lookup: &mut dyn FnMut(Position) -> Result<f64, FormulaError>,
    ) -> Result<f64, FormulaError> {
        Self::eval_node(&self.root, lookup)
    }

    fn eval_node(
        expr: &Expr,
        lookup: &mut dyn FnMut(Position) -> Result<f64, FormulaError>,
    ) -> Result<f64, FormulaError> {
        match expr {
            Expr::Number(n) => Ok(*n),
            Expr::Ref(pos) => lookup(*pos),
            Expr::Neg(inner) => Ok(-Self::eval_node(inner, lookup)?),
            Expr::Add(l, r) => Ok(Self::eval_node(l, lookup)? + Self::eval_node(r, lookup)?),
            Expr::Sub(l, r) => Ok(Self::eval_node(l, lookup)? - Self::eval_node(r, lookup)?),
            Expr::Mul(l, r) => Ok(Self::eval_node(l, lookup)? * Self::eval_node(r, lookup)?),
            Expr::Div(l, r) => Ok(Self::eval_node(l, lookup)? / Self::eval_node(r, lookup)?),
        }
    }

    /// Canonical printed form, reparseable to an equivalent tree.
    pub fn print(&self) -> String {
        self.to_string()
    }

    /// Positions referenced by this formula, in the order the parser
    /// encountered them. Deduplication and sorting is the engine's job
    /// (`CellBody::referenced`), not this method's.
    pub fn referenced(&self) -> Vec<Position> {
        let mut out = Vec::new();
        collect_refs(&self.root, &mut out);
        out
    }
}

fn collect_refs(expr: &Expr, out: &mut Vec<Position>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Ref(pos) => out.push(*pos),
        Expr::Neg(inner) => collect_refs(inner, out),
        Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
            collect_refs(l, out);
            collect_refs(r, out);
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render(&self.root))
    }
}

/// Precedence level: higher binds tighter. Used to decide whether a child
/// node needs parenthesizing when rendered.
fn prec(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(_) | Expr::Ref(_) => 4,
        Expr::Neg(_) => 3,
        Expr::Mul(_, _) | Expr::Div(_, _) => 2,
        Expr::Add(_, _) | Expr::Sub(_, _) => 1,
    }
}

fn render(expr: &Expr) -> String {
    match expr {
        Expr::Number(n) => format!("{n}"),
        Expr::Ref(pos) => pos.to_string(),
        Expr::Neg(inner) => format!("-{}", wrap(inner, 3)),
        Expr::Add(l, r) => format!("{}+{}", wrap(l, 1), wrap(r, 2)),
        Expr::Sub(l, r) => format!("{}-{}", wrap(l, 1), wrap(r, 2)),
        Expr::Mul(l, r) => format!("{}*{}", wrap(l, 2), wrap(r, 3)),
        Expr::Div(l, r) => format!("{}/{}", wrap(l, 2), wrap(r, 3)),
    }
}

/// Renders `expr`, wrapping it in parentheses if its own precedence is
/// lower than `min_prec`. The right operand's minimum precedence is
/// bumped by one so e.g. `A1-(B1+C1)` round-trips instead of losing its
/// parentheses.
fn wrap(expr: &Expr, min_prec: u8) -> String {
    let s = render(expr);
    if prec(expr) < min_prec { format!("({s})") } else { s }
}
