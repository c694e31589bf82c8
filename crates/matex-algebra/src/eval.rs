//! Evaluation of raw expression trees whose symbols may be bound to
//! already-computed values, scalar or matrix.
//!
//! Works on the parser's order-preserving tree: matrix multiplication does
//! not commute, so evaluation happens before any canonicalizing
//! simplification. Scalar subresults are built raw and simplified once at
//! the end.

use matex_core::{EngineError, Grid, Value};

use crate::expr::Expr;
use crate::grid_ops;
use crate::simplify::simplify;

pub fn evaluate(
    text: &str,
    bindings: &[(String, Value<Expr>)],
) -> Result<Value<Expr>, EngineError> {
    let raw = crate::parser::parse(text)?;
    let value = eval(&raw, bindings)?;
    Ok(match value {
        Value::Scalar(expr) => Value::Scalar(simplify(expr)),
        Value::Matrix(grid) => {
            let mut grid = grid;
            grid_ops::simplify_grid(&mut grid);
            Value::Matrix(grid)
        }
    })
}

fn eval(expr: &Expr, bindings: &[(String, Value<Expr>)]) -> Result<Value<Expr>, EngineError> {
    match expr {
        Expr::Number(_) => Ok(Value::Scalar(expr.clone())),
        Expr::Symbol(name) => Ok(bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| Value::Scalar(expr.clone()))),
        Expr::Add(terms) => {
            let mut values = terms.iter().map(|t| eval(t, bindings));
            let first = values
                .next()
                .ok_or_else(|| EngineError::Parse("empty sum".into()))??;
            values.try_fold(first, |acc, value| add_values(acc, value?))
        }
        Expr::Mul(factors) => {
            let mut values = factors.iter().map(|f| eval(f, bindings));
            let first = values
                .next()
                .ok_or_else(|| EngineError::Parse("empty product".into()))??;
            values.try_fold(first, |acc, value| mul_values(acc, value?))
        }
        Expr::Pow(base, exp) => {
            let base = eval(base, bindings)?;
            let exp = match eval(exp, bindings)? {
                Value::Scalar(e) => e,
                Value::Matrix(_) => {
                    return Err(EngineError::Shape(
                        "a matrix cannot be an exponent".into(),
                    ));
                }
            };
            pow_value(base, exp)
        }
    }
}

fn add_values(a: Value<Expr>, b: Value<Expr>) -> Result<Value<Expr>, EngineError> {
    match (a, b) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(Expr::Add(vec![a, b]))),
        (Value::Matrix(a), Value::Matrix(b)) => {
            if a.rows() != b.rows() || a.cols() != b.cols() {
                return Err(EngineError::Shape(format!(
                    "cannot add a {}x{} matrix and a {}x{} matrix",
                    a.rows(),
                    a.cols(),
                    b.rows(),
                    b.cols()
                )));
            }
            Ok(Value::Matrix(Grid::generate(a.rows(), a.cols(), |r, c| {
                Expr::Add(vec![a.cell(r, c).clone(), b.cell(r, c).clone()])
            })))
        }
        _ => Err(EngineError::Shape(
            "cannot add a scalar and a matrix".into(),
        )),
    }
}

fn mul_values(a: Value<Expr>, b: Value<Expr>) -> Result<Value<Expr>, EngineError> {
    match (a, b) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(Expr::Mul(vec![a, b]))),
        (Value::Scalar(s), Value::Matrix(m)) => Ok(Value::Matrix(scale(&m, &s))),
        (Value::Matrix(m), Value::Scalar(s)) => Ok(Value::Matrix(scale(&m, &s))),
        (Value::Matrix(a), Value::Matrix(b)) => {
            if a.cols() != b.rows() {
                return Err(EngineError::Shape(format!(
                    "cannot multiply a {}x{} matrix by a {}x{} matrix",
                    a.rows(),
                    a.cols(),
                    b.rows(),
                    b.cols()
                )));
            }
            Ok(Value::Matrix(Grid::generate(a.rows(), b.cols(), |r, c| {
                let products = (0..a.cols())
                    .map(|k| Expr::Mul(vec![a.cell(r, k).clone(), b.cell(k, c).clone()]))
                    .collect();
                Expr::Add(products)
            })))
        }
    }
}

fn scale(grid: &Grid<Expr>, scalar: &Expr) -> Grid<Expr> {
    Grid::generate(grid.rows(), grid.cols(), |r, c| {
        Expr::Mul(vec![scalar.clone(), grid.cell(r, c).clone()])
    })
}

fn pow_value(base: Value<Expr>, exp: Expr) -> Result<Value<Expr>, EngineError> {
    match base {
        Value::Scalar(base) => Ok(Value::Scalar(Expr::pow(base, exp))),
        Value::Matrix(grid) => {
            let Some(n) = simplify(exp).as_integer() else {
                return Err(EngineError::Shape(
                    "matrix powers must be integers".into(),
                ));
            };
            if !grid.is_square() {
                return Err(EngineError::NotSquare);
            }
            let (grid, n) = if n < 0 {
                (grid_ops::inverse(&grid)?, n.unsigned_abs())
            } else {
                (grid, n.unsigned_abs())
            };
            let mut result = Value::Matrix(grid_ops::identity(grid.rows()));
            for _ in 0..n {
                result = mul_values(result, Value::Matrix(grid.clone()))?;
            }
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::render::render;

    fn bind(name: &str, cells: &[&[i128]]) -> (String, Value<Expr>) {
        let grid = Grid::from_rows(
            cells
                .iter()
                .map(|row| row.iter().map(|n| Expr::integer(*n)).collect())
                .collect(),
        )
        .unwrap();
        (name.to_string(), Value::Matrix(grid))
    }

    fn scalar_result(text: &str, bindings: &[(String, Value<Expr>)]) -> String {
        match evaluate(text, bindings).unwrap() {
            Value::Scalar(e) => render(&e),
            Value::Matrix(_) => panic!("expected scalar"),
        }
    }

    fn matrix_result(text: &str, bindings: &[(String, Value<Expr>)]) -> Grid<Expr> {
        match evaluate(text, bindings).unwrap() {
            Value::Matrix(g) => g,
            Value::Scalar(e) => panic!("expected matrix, got {e:?}"),
        }
    }

    #[test]
    fn test_pure_scalar() {
        assert_eq!(scalar_result("1 + 2x + x", &[]), "1 + 3 x");
    }

    #[test]
    fn test_unbound_symbols_stay_symbolic() {
        assert_eq!(scalar_result("a + b", &[]), "a + b");
    }

    #[test]
    fn test_matrix_addition() {
        let a = bind("A", &[&[1, 2], &[3, 4]]);
        let b = bind("B", &[&[1, 0], &[0, 1]]);
        let result = matrix_result("A + B", &[a, b]);
        assert_eq!(*result.cell(0, 0), Expr::integer(2));
        assert_eq!(*result.cell(1, 1), Expr::integer(5));
    }

    #[test]
    fn test_scalar_times_matrix() {
        let a = bind("A", &[&[1], &[2]]);
        let result = matrix_result("2A", &[a]);
        assert_eq!(*result.cell(1, 0), Expr::integer(4));
    }

    #[test]
    fn test_matrix_product_order() {
        let a = bind("A", &[&[0, 1], &[0, 0]]);
        let b = bind("B", &[&[0, 0], &[1, 0]]);
        // AB = [[1,0],[0,0]] but BA = [[0,0],[0,1]]
        let ab = matrix_result("AB", &[a.clone(), b.clone()]);
        assert_eq!(*ab.cell(0, 0), Expr::ONE);
        assert_eq!(*ab.cell(1, 1), Expr::ZERO);
        let ba = matrix_result("BA", &[a, b]);
        assert_eq!(*ba.cell(0, 0), Expr::ZERO);
        assert_eq!(*ba.cell(1, 1), Expr::ONE);
    }

    #[test]
    fn test_matrix_power() {
        let a = bind("A", &[&[1, 1], &[0, 1]]);
        let result = matrix_result("A^3", &[a]);
        assert_eq!(*result.cell(0, 1), Expr::integer(3));
    }

    #[test]
    fn test_matrix_negative_power() {
        let a = bind("A", &[&[2, 0], &[0, 2]]);
        let result = matrix_result("A^{-1}", &[a]);
        assert_eq!(
            *result.cell(0, 0),
            Expr::Number(crate::rational::Rational::new(1, 2).unwrap())
        );
    }

    #[test]
    fn test_shape_mismatch_in_addition() {
        let a = bind("A", &[&[1, 2]]);
        let b = bind("B", &[&[1], &[2]]);
        assert!(matches!(
            evaluate("A + B", &[a, b]),
            Err(EngineError::Shape(_))
        ));
    }

    #[test]
    fn test_scalar_plus_matrix_rejected() {
        let a = bind("A", &[&[1]]);
        assert!(matches!(
            evaluate("1 + A", &[a]),
            Err(EngineError::Shape(_))
        ));
    }

    #[test]
    fn test_incompatible_product() {
        let a = bind("A", &[&[1, 2]]);
        let b = bind("B", &[&[1, 2]]);
        assert!(matches!(evaluate("AB", &[a, b]), Err(EngineError::Shape(_))));
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(matches!(evaluate("(", &[]), Err(EngineError::Parse(_))));
    }
}
