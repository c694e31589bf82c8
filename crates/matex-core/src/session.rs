//! Request entry points.
//!
//! A [`Session`] owns the immutable macro table and the algebra engine and
//! exposes one method per request selector. Methods take the raw request
//! text and return the response text; every failure propagates as
//! [`Error`](crate::Error) without touching session state.

use log::debug;

use crate::engine::{AlgebraEngine, Value};
use crate::error::Error;
use crate::expand::{expand_text, expand_with_matrices, resolve_value_markers};
use crate::matrix::{Matrix, MatrixKind, parse_matrix};
use matex_ops::parse_el_ops;
use matex_syntax::{Command, MacroTable, normalize, read_command, skip_spaces};

pub struct Session<A: AlgebraEngine> {
    table: MacroTable,
    engine: A,
}

impl<A: AlgebraEngine> Session<A> {
    pub fn new(table: MacroTable, engine: A) -> Self {
        Self { table, engine }
    }

    pub fn table(&self) -> &MacroTable {
        &self.table
    }

    pub fn engine(&self) -> &A {
        &self.engine
    }

    /// Applies the elementary operations following a matrix to that matrix
    /// and serializes the result.
    pub fn apply_elementary_operations(&self, text: &str) -> Result<String, Error> {
        let text = normalize(text);
        let text = expand_text(text.trim(), &self.table, &self.engine)?;

        let (command, consumed, mut matrix) = self.leading_matrix(&text)?;
        let pos = skip_spaces(&text, command.block(consumed - 1)?.end);
        let ops_command = read_command(&text, pos)?.ok_or(Error::MissingOperationCommand)?;
        let ops = parse_el_ops(&ops_command)?;
        debug!("applying {} elementary operations", ops.len());

        for op in &ops {
            matrix.apply(&self.engine, op)?;
        }
        matrix.simplify(&self.engine);
        Ok(matrix.render(&self.engine))
    }

    /// Expands the text, lifts matrices out, and evaluates what remains.
    pub fn simplify_expression(&self, text: &str) -> Result<String, Error> {
        let text = normalize(text);
        let (text, mut matrices) = expand_with_matrices(&text, &self.table, &self.engine)?;
        let text = resolve_value_markers(&text, &mut matrices, &self.engine)?;
        debug!("evaluating with {} extracted matrices", matrices.len());

        let bindings: Vec<(String, Value<A::Expr>)> = matrices
            .into_iter()
            .map(|entry| (entry.token, entry.value))
            .collect();
        match self.engine.evaluate(&text, &bindings)? {
            Value::Scalar(expr) => Ok(self.engine.render(&expr)),
            Value::Matrix(grid) => {
                Ok(Matrix::from_grid(MatrixKind::Plain, grid).render(&self.engine))
            }
        }
    }

    /// Reports the determinant and rank of the leading matrix. A non-square
    /// matrix reports determinant 0.
    pub fn matrix_info(&self, text: &str) -> Result<String, Error> {
        let matrix = self.parse_leading_matrix(text)?;
        let det = if matrix.primary().is_square() {
            self.engine.render(&matrix.determinant(&self.engine)?)
        } else {
            "0".to_string()
        };
        Ok(format!("det: {det}, rank: {}", matrix.rank(&self.engine)))
    }

    pub fn transpose(&self, text: &str) -> Result<String, Error> {
        let mut matrix = self.parse_leading_matrix(text)?;
        matrix.transpose(&self.engine)?;
        Ok(matrix.render(&self.engine))
    }

    pub fn inverse(&self, text: &str) -> Result<String, Error> {
        let mut matrix = self.parse_leading_matrix(text)?;
        matrix.inverse(&self.engine)?;
        Ok(matrix.render(&self.engine))
    }

    /// Echelon form, or reduced echelon form with `reduced` set.
    pub fn echelon_form(&self, text: &str, reduced: bool) -> Result<String, Error> {
        let mut matrix = self.parse_leading_matrix(text)?;
        matrix.echelon(&self.engine, reduced)?;
        Ok(matrix.render(&self.engine))
    }

    /// Normalizes, expands without extraction, and parses the matrix command
    /// the text must start with.
    fn parse_leading_matrix(&self, text: &str) -> Result<Matrix<A::Expr>, Error> {
        let text = normalize(text);
        let text = expand_text(text.trim(), &self.table, &self.engine)?;
        let (_, _, matrix) = self.leading_matrix(&text)?;
        Ok(matrix)
    }

    fn leading_matrix(&self, text: &str) -> Result<(Command, usize, Matrix<A::Expr>), Error> {
        let command = read_command(text, 0)?.ok_or(Error::MissingMatrixCommand)?;
        let (consumed, matrix) = parse_matrix(&self.engine, &command)?;
        Ok((command, consumed, matrix))
    }
}
