//! The algebra engine contract.
//!
//! The core never inspects numeric content: every cell, coefficient and
//! computed matrix is an opaque handle passed back to the engine. The one
//! implementation shipped with the workspace lives in `matex-algebra`; tests
//! here use a string-based stub.

use std::fmt;

use thiserror::Error;

/// Failures inside the algebra engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("cannot parse {0}")]
    Parse(String),
    #[error("matrix is not square")]
    NotSquare,
    #[error("matrix is not invertible")]
    Singular,
    #[error("{0}")]
    Shape(String),
    #[error("row or column index {0} is out of range")]
    IndexOutOfRange(usize),
}

/// A rectangular grid of expression handles.
///
/// Invariant: at least one row, and every row has the same length. All
/// constructors preserve it, so consumers may index freely within
/// `rows() x cols()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<E> {
    rows: Vec<Vec<E>>,
}

impl<E> Grid<E> {
    pub fn from_rows(rows: Vec<Vec<E>>) -> Result<Self, EngineError> {
        let width = match rows.first() {
            Some(row) => row.len(),
            None => return Err(EngineError::Shape("matrix has no rows".into())),
        };
        if width == 0 {
            return Err(EngineError::Shape("matrix has no columns".into()));
        }
        if rows.iter().any(|row| row.len() != width) {
            return Err(EngineError::Shape("matrix rows have unequal lengths".into()));
        }
        Ok(Self { rows })
    }

    /// Builds a `rows x cols` grid from a cell constructor. Both dimensions
    /// must be non-zero.
    pub fn generate(rows: usize, cols: usize, mut cell: impl FnMut(usize, usize) -> E) -> Self {
        debug_assert!(rows > 0 && cols > 0);
        Self {
            rows: (0..rows)
                .map(|r| (0..cols).map(|c| cell(r, c)).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.rows[0].len()
    }

    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    /// Cell at `(row, col)`; both must be in range.
    pub fn cell(&self, row: usize, col: usize) -> &E {
        &self.rows[row][col]
    }

    pub fn as_rows(&self) -> &[Vec<E>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<E>> {
        self.rows
    }

    pub fn transposed(&self) -> Grid<E>
    where
        E: Clone,
    {
        Grid::generate(self.cols(), self.rows(), |r, c| self.rows[c][r].clone())
    }

    /// Stacks `other` to the right of `self`. Row counts must match.
    pub fn hstack(&self, other: &Grid<E>) -> Result<Grid<E>, EngineError>
    where
        E: Clone,
    {
        if self.rows() != other.rows() {
            return Err(EngineError::Shape(
                "cannot stack matrices with different row counts".into(),
            ));
        }
        Ok(Grid::generate(self.rows(), self.cols() + other.cols(), |r, c| {
            if c < self.cols() {
                self.rows[r][c].clone()
            } else {
                other.rows[r][c - self.cols()].clone()
            }
        }))
    }

    /// Splits vertically, the left part keeping `cols` columns.
    pub fn split_at_col(&self, cols: usize) -> Result<(Grid<E>, Grid<E>), EngineError>
    where
        E: Clone,
    {
        if cols == 0 || cols >= self.cols() {
            return Err(EngineError::Shape(format!(
                "cannot split a {} column matrix at column {cols}",
                self.cols()
            )));
        }
        let left = Grid::generate(self.rows(), cols, |r, c| self.rows[r][c].clone());
        let right = Grid::generate(self.rows(), self.cols() - cols, |r, c| {
            self.rows[r][cols + c].clone()
        });
        Ok((left, right))
    }
}

/// A value an expression slot can hold once matrices enter the picture.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<E> {
    Scalar(E),
    Matrix(Grid<E>),
}

/// An elementary transform with its coefficient already parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum GridOp<E> {
    Swap { a: usize, b: usize },
    Scale { index: usize, factor: E },
    AddMultiple { dest: usize, source: usize, factor: E },
}

/// The computation collaborator the core drives.
///
/// Implementations own expression parsing, simplification, rendering and the
/// numeric/symbolic matrix algorithms. The core calls these with opaque
/// handles and never looks inside.
pub trait AlgebraEngine {
    type Expr: Clone + PartialEq + fmt::Debug;

    fn parse_expr(&self, text: &str) -> Result<Self::Expr, EngineError>;
    fn simplify(&self, expr: Self::Expr) -> Self::Expr;
    fn render(&self, expr: &Self::Expr) -> String;

    /// Evaluates `text` with placeholder symbols bound to already-computed
    /// values, combining scalars and matrices.
    fn evaluate(
        &self,
        text: &str,
        bindings: &[(String, Value<Self::Expr>)],
    ) -> Result<Value<Self::Expr>, EngineError>;

    fn determinant(&self, grid: &Grid<Self::Expr>) -> Result<Self::Expr, EngineError>;
    fn rank(&self, grid: &Grid<Self::Expr>) -> usize;
    fn inverse(&self, grid: &Grid<Self::Expr>) -> Result<Grid<Self::Expr>, EngineError>;
    fn transpose(&self, grid: &Grid<Self::Expr>) -> Grid<Self::Expr>;
    fn echelon_form(&self, grid: &Grid<Self::Expr>, reduced: bool) -> Grid<Self::Expr>;
    fn row_op(
        &self,
        grid: &mut Grid<Self::Expr>,
        op: &GridOp<Self::Expr>,
    ) -> Result<(), EngineError>;
    fn col_op(
        &self,
        grid: &mut Grid<Self::Expr>,
        op: &GridOp<Self::Expr>,
    ) -> Result<(), EngineError>;
    fn simplify_grid(&self, grid: &mut Grid<Self::Expr>);
}
