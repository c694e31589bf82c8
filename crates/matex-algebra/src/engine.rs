use matex_core::{AlgebraEngine, EngineError, Grid, GridOp, Value};

use crate::expr::Expr;
use crate::{eval, grid_ops, parser, render, simplify};

/// The exact symbolic engine: rational arithmetic, polynomial normal form,
/// Gaussian elimination.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolicEngine;

impl SymbolicEngine {
    pub fn new() -> Self {
        Self
    }
}

impl AlgebraEngine for SymbolicEngine {
    type Expr = Expr;

    fn parse_expr(&self, text: &str) -> Result<Expr, EngineError> {
        parser::parse(text)
    }

    fn simplify(&self, expr: Expr) -> Expr {
        simplify::simplify(expr)
    }

    fn render(&self, expr: &Expr) -> String {
        render::render(expr)
    }

    fn evaluate(
        &self,
        text: &str,
        bindings: &[(String, Value<Expr>)],
    ) -> Result<Value<Expr>, EngineError> {
        eval::evaluate(text, bindings)
    }

    fn determinant(&self, grid: &Grid<Expr>) -> Result<Expr, EngineError> {
        grid_ops::determinant(grid)
    }

    fn rank(&self, grid: &Grid<Expr>) -> usize {
        grid_ops::rank(grid)
    }

    fn inverse(&self, grid: &Grid<Expr>) -> Result<Grid<Expr>, EngineError> {
        grid_ops::inverse(grid)
    }

    fn transpose(&self, grid: &Grid<Expr>) -> Grid<Expr> {
        grid.transposed()
    }

    fn echelon_form(&self, grid: &Grid<Expr>, reduced: bool) -> Grid<Expr> {
        grid_ops::echelon(grid, reduced)
    }

    fn row_op(&self, grid: &mut Grid<Expr>, op: &GridOp<Expr>) -> Result<(), EngineError> {
        grid_ops::apply_row_op(grid, op)
    }

    fn col_op(&self, grid: &mut Grid<Expr>, op: &GridOp<Expr>) -> Result<(), EngineError> {
        grid_ops::apply_col_op(grid, op)
    }

    fn simplify_grid(&self, grid: &mut Grid<Expr>) {
        grid_ops::simplify_grid(grid);
    }
}
