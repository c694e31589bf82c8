//! Matrix command interpretation: building a [`Matrix`] from a command's
//! blocks, applying elementary operations, and serializing back to dialect
//! text.

use serde::{Deserialize, Serialize};

use crate::engine::{AlgebraEngine, EngineError, Grid, GridOp, Value};
use crate::error::Error;
use matex_ops::{Axis, ElementaryOp, OpKind};
use matex_syntax::{Command, SyntaxError};

/// Cell separator inside a row.
pub const COL_SEP: char = '&';
/// Separator between rows (and between operation lines).
pub const ROW_BREAK: &str = r"\\";

/// The four built-in matrix environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixKind {
    Plain,
    Parenthesized,
    Determinant,
    Augmented,
}

impl MatrixKind {
    pub fn from_command(name: &str) -> Option<Self> {
        match name {
            r"\matrix" => Some(Self::Plain),
            r"\pmatrix" => Some(Self::Parenthesized),
            r"\dmatrix" => Some(Self::Determinant),
            r"\ematrix" => Some(Self::Augmented),
            _ => None,
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            Self::Plain => r"\matrix",
            Self::Parenthesized => r"\pmatrix",
            Self::Determinant => r"\dmatrix",
            Self::Augmented => r"\ematrix",
        }
    }

    /// How many argument blocks the kind consumes.
    pub fn block_count(&self) -> usize {
        match self {
            Self::Augmented => 2,
            _ => 1,
        }
    }
}

/// A parsed matrix: its kind, the primary grid, and for augmented matrices a
/// secondary grid with the same row count.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<E> {
    kind: MatrixKind,
    primary: Grid<E>,
    secondary: Option<Grid<E>>,
}

/// Parses the matrix introduced by `command`, returning the number of blocks
/// consumed alongside the matrix.
pub fn parse_matrix<A: AlgebraEngine>(
    engine: &A,
    command: &Command,
) -> Result<(usize, Matrix<A::Expr>), Error> {
    let kind = MatrixKind::from_command(command.name())
        .ok_or_else(|| Error::NotMatrixCommand(command.name().to_string()))?;
    let blocks: Vec<&str> = command
        .blocks()
        .iter()
        .map(|b| b.inner.as_str())
        .collect();
    matrix_from_blocks(engine, kind, &blocks)
}

/// Same as [`parse_matrix`], but over already-extracted block texts. The
/// expander uses this after substituting macros inside the blocks.
pub fn matrix_from_blocks<A: AlgebraEngine>(
    engine: &A,
    kind: MatrixKind,
    blocks: &[&str],
) -> Result<(usize, Matrix<A::Expr>), Error> {
    let consumed = kind.block_count();
    let block = |index: usize| -> Result<&str, Error> {
        blocks.get(index).copied().ok_or_else(|| {
            Error::Syntax(SyntaxError::MissingBlock {
                command: kind.command().to_string(),
                index,
            })
        })
    };

    let primary = parse_grid(engine, block(0)?)?;
    let secondary = if kind == MatrixKind::Augmented {
        let secondary = parse_grid(engine, block(1)?)?;
        if secondary.rows() != primary.rows() {
            return Err(Error::ShapeMismatch(
                "augmented grids must have the same row count".into(),
            ));
        }
        Some(secondary)
    } else {
        None
    };

    Ok((
        consumed,
        Matrix {
            kind,
            primary,
            secondary,
        },
    ))
}

/// Splits block text into rows on `\\` and cells on `&`, parsing each cell
/// through the engine. Blank rows are skipped.
fn parse_grid<A: AlgebraEngine>(engine: &A, text: &str) -> Result<Grid<A::Expr>, Error> {
    let mut rows: Vec<Vec<A::Expr>> = Vec::new();
    for line in text.trim().split(ROW_BREAK) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cells = line
            .split(COL_SEP)
            .map(|cell| engine.parse_expr(cell).map(|e| engine.simplify(e)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| EngineError::Parse(format!("row {line}")))?;
        if let Some(first) = rows.first() {
            if cells.len() != first.len() {
                return Err(Error::ShapeMismatch(
                    "matrix rows have unequal lengths".into(),
                ));
            }
        }
        rows.push(cells);
    }
    if rows.is_empty() {
        return Err(Error::ShapeMismatch("matrix has no rows".into()));
    }
    Ok(Grid::from_rows(rows)?)
}

impl<E> Matrix<E> {
    /// Wraps an already-computed grid, for rendering evaluation results.
    pub fn from_grid(kind: MatrixKind, primary: Grid<E>) -> Self {
        Self {
            kind,
            primary,
            secondary: None,
        }
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    pub fn primary(&self) -> &Grid<E> {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&Grid<E>> {
        self.secondary.as_ref()
    }

    /// Applies one elementary operation. Augmented matrices receive the
    /// operation on both grids in lockstep, preserving the equal-row-count
    /// invariant.
    pub fn apply<A: AlgebraEngine<Expr = E>>(
        &mut self,
        engine: &A,
        op: &ElementaryOp,
    ) -> Result<(), Error> {
        let grid_op = to_grid_op(engine, op)?;
        let apply_one = |grid: &mut Grid<E>| match op.axis {
            Axis::Row => engine.row_op(grid, &grid_op),
            Axis::Col => engine.col_op(grid, &grid_op),
        };
        apply_one(&mut self.primary)?;
        if let Some(secondary) = &mut self.secondary {
            apply_one(secondary)?;
        }
        Ok(())
    }

    /// Collapses the matrix to the value it denotes inside an expression:
    /// its determinant for the determinant kind, the grid itself otherwise.
    /// Augmented matrices cannot appear inside an expression.
    pub fn calculate<A: AlgebraEngine<Expr = E>>(self, engine: &A) -> Result<Value<E>, Error> {
        match self.kind {
            MatrixKind::Determinant => Ok(Value::Scalar(engine.determinant(&self.primary)?)),
            MatrixKind::Augmented => Err(Error::RestrictedOperation(
                r"cannot use \ematrix in expressions".into(),
            )),
            _ => Ok(Value::Matrix(self.primary)),
        }
    }

    pub fn simplify<A: AlgebraEngine<Expr = E>>(&mut self, engine: &A) {
        engine.simplify_grid(&mut self.primary);
        if let Some(secondary) = &mut self.secondary {
            engine.simplify_grid(secondary);
        }
    }

    pub fn determinant<A: AlgebraEngine<Expr = E>>(&self, engine: &A) -> Result<E, Error> {
        Ok(engine.determinant(&self.primary)?)
    }

    pub fn rank<A: AlgebraEngine<Expr = E>>(&self, engine: &A) -> usize {
        engine.rank(&self.primary)
    }

    pub fn transpose<A: AlgebraEngine<Expr = E>>(&mut self, engine: &A) -> Result<(), Error> {
        if self.kind == MatrixKind::Augmented {
            return Err(Error::RestrictedOperation(
                r"cannot transpose \ematrix".into(),
            ));
        }
        self.primary = engine.transpose(&self.primary);
        Ok(())
    }

    pub fn inverse<A: AlgebraEngine<Expr = E>>(&mut self, engine: &A) -> Result<(), Error> {
        if self.kind == MatrixKind::Augmented {
            return Err(Error::RestrictedOperation(r"cannot inverse \ematrix".into()));
        }
        self.primary = engine.inverse(&self.primary)?;
        Ok(())
    }

    /// Reduces to echelon (or reduced echelon) form. An augmented matrix is
    /// stacked side by side first and split back at the original primary
    /// column count afterwards.
    pub fn echelon<A: AlgebraEngine<Expr = E>>(
        &mut self,
        engine: &A,
        reduced: bool,
    ) -> Result<(), Error>
    where
        E: Clone,
    {
        match &self.secondary {
            Some(secondary) => {
                let stacked = self.primary.hstack(secondary)?;
                let echelon = engine.echelon_form(&stacked, reduced);
                let (left, right) = echelon.split_at_col(self.primary.cols())?;
                self.primary = left;
                self.secondary = Some(right);
            }
            None => self.primary = engine.echelon_form(&self.primary, reduced),
        }
        Ok(())
    }

    /// Serializes back to dialect text: the kind tag, then one brace group
    /// per grid with one `\\`-terminated row per line.
    pub fn render<A: AlgebraEngine<Expr = E>>(&self, engine: &A) -> String {
        let mut out = String::from(self.kind.command());
        render_grid(engine, &self.primary, &mut out);
        if let Some(secondary) = &self.secondary {
            render_grid(engine, secondary, &mut out);
        }
        out
    }
}

fn render_grid<A: AlgebraEngine>(engine: &A, grid: &Grid<A::Expr>, out: &mut String) {
    out.push_str("{\n");
    for row in grid.as_rows() {
        for (i, cell) in row.iter().enumerate() {
            out.push_str(&engine.render(cell));
            if i + 1 < row.len() {
                out.push(COL_SEP);
            }
        }
        out.push_str(ROW_BREAK);
        out.push('\n');
    }
    out.push('}');
}

fn to_grid_op<A: AlgebraEngine>(engine: &A, op: &ElementaryOp) -> Result<GridOp<A::Expr>, Error> {
    Ok(match &op.kind {
        OpKind::Swap { with } => GridOp::Swap {
            a: op.target,
            b: *with,
        },
        OpKind::Scale { factor } => GridOp::Scale {
            index: op.target,
            factor: engine.parse_expr(factor)?,
        },
        OpKind::AddMultiple { source, factor } => GridOp::AddMultiple {
            dest: op.target,
            source: *source,
            factor: engine.parse_expr(factor)?,
        },
    })
}
