//! Exact matrix algorithms over expression grids.
//!
//! Zero-testing goes through [`simplify`]: a cell counts as zero exactly
//! when its simplified form is the zero rational. Symbolic entries that do
//! not cancel are treated as nonzero pivots.

use matex_core::{EngineError, Grid, GridOp};

use crate::expr::Expr;
use crate::simplify::simplify;

pub fn determinant(grid: &Grid<Expr>) -> Result<Expr, EngineError> {
    if !grid.is_square() {
        return Err(EngineError::NotSquare);
    }
    Ok(simplify(det_rows(grid.as_rows())))
}

/// Laplace expansion along the first column. Matrices in this dialect are
/// small, so the factorial blowup never matters in practice.
fn det_rows(rows: &[Vec<Expr>]) -> Expr {
    if rows.len() == 1 {
        return rows[0][0].clone();
    }
    let mut terms = Vec::with_capacity(rows.len());
    for (r, row) in rows.iter().enumerate() {
        let cell = row[0].clone();
        if cell.is_zero() {
            continue;
        }
        let minor: Vec<Vec<Expr>> = rows
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != r)
            .map(|(_, row)| row[1..].to_vec())
            .collect();
        let sign = if r % 2 == 0 { 1 } else { -1 };
        terms.push(Expr::Mul(vec![
            Expr::integer(sign),
            cell,
            det_rows(&minor),
        ]));
    }
    Expr::Add(terms)
}

/// Echelon form. Reduced form normalizes pivots to one and clears above
/// them; the non-reduced form eliminates below each pivot fraction-free, so
/// integer matrices stay integer.
pub fn echelon(grid: &Grid<Expr>, reduced: bool) -> Grid<Expr> {
    let mut rows = grid.clone().into_rows();
    let (nrows, ncols) = (grid.rows(), grid.cols());

    let mut pivot_row = 0;
    for col in 0..ncols {
        if pivot_row >= nrows {
            break;
        }
        let Some(found) = (pivot_row..nrows).find(|&r| !rows[r][col].is_zero()) else {
            continue;
        };
        rows.swap(pivot_row, found);

        if reduced {
            let inverse = simplify(Expr::pow(rows[pivot_row][col].clone(), Expr::integer(-1)));
            for cell in &mut rows[pivot_row] {
                *cell = simplify(Expr::Mul(vec![inverse.clone(), cell.clone()]));
            }
            for r in 0..nrows {
                if r == pivot_row || rows[r][col].is_zero() {
                    continue;
                }
                let factor = rows[r][col].clone();
                for c in 0..ncols {
                    rows[r][c] = simplify(Expr::Add(vec![
                        rows[r][c].clone(),
                        Expr::Mul(vec![
                            Expr::integer(-1),
                            factor.clone(),
                            rows[pivot_row][c].clone(),
                        ]),
                    ]));
                }
            }
        } else {
            let pivot = rows[pivot_row][col].clone();
            for r in pivot_row + 1..nrows {
                if rows[r][col].is_zero() {
                    continue;
                }
                let factor = rows[r][col].clone();
                for c in 0..ncols {
                    rows[r][c] = simplify(Expr::Add(vec![
                        Expr::Mul(vec![pivot.clone(), rows[r][c].clone()]),
                        Expr::Mul(vec![
                            Expr::integer(-1),
                            factor.clone(),
                            rows[pivot_row][c].clone(),
                        ]),
                    ]));
                }
            }
        }
        pivot_row += 1;
    }

    Grid::generate(nrows, ncols, |r, c| rows[r][c].clone())
}

pub fn rank(grid: &Grid<Expr>) -> usize {
    echelon(grid, true)
        .as_rows()
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.is_zero()))
        .count()
}

/// Gauss–Jordan inverse over `[A | I]`.
pub fn inverse(grid: &Grid<Expr>) -> Result<Grid<Expr>, EngineError> {
    if !grid.is_square() {
        return Err(EngineError::NotSquare);
    }
    let n = grid.rows();
    let reduced = echelon(&grid.hstack(&identity(n))?, true);
    let (left, right) = reduced.split_at_col(n)?;
    if left != identity(n) {
        return Err(EngineError::Singular);
    }
    Ok(right)
}

pub fn identity(n: usize) -> Grid<Expr> {
    Grid::generate(n, n, |r, c| {
        if r == c { Expr::ONE } else { Expr::ZERO }
    })
}

pub fn apply_row_op(grid: &mut Grid<Expr>, op: &GridOp<Expr>) -> Result<(), EngineError> {
    let mut rows = grid.clone().into_rows();
    let bound = rows.len();
    let check = |index: usize| {
        if index < bound {
            Ok(index)
        } else {
            Err(EngineError::IndexOutOfRange(index))
        }
    };
    match op {
        GridOp::Swap { a, b } => rows.swap(check(*a)?, check(*b)?),
        GridOp::Scale { index, factor } => {
            for cell in &mut rows[check(*index)?] {
                *cell = simplify(Expr::Mul(vec![factor.clone(), cell.clone()]));
            }
        }
        GridOp::AddMultiple {
            dest,
            source,
            factor,
        } => {
            let source_row = rows[check(*source)?].clone();
            for (cell, src) in rows[check(*dest)?].iter_mut().zip(source_row) {
                *cell = simplify(Expr::Add(vec![
                    cell.clone(),
                    Expr::Mul(vec![factor.clone(), src]),
                ]));
            }
        }
    }
    *grid = Grid::generate(grid.rows(), grid.cols(), |r, c| rows[r][c].clone());
    Ok(())
}

pub fn apply_col_op(grid: &mut Grid<Expr>, op: &GridOp<Expr>) -> Result<(), EngineError> {
    let mut transposed = grid.transposed();
    apply_row_op(&mut transposed, op)?;
    *grid = transposed.transposed();
    Ok(())
}

pub fn simplify_grid(grid: &mut Grid<Expr>) {
    *grid = Grid::generate(grid.rows(), grid.cols(), |r, c| {
        simplify(grid.cell(r, c).clone())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn grid(cells: &[&[&str]]) -> Grid<Expr> {
        Grid::from_rows(
            cells
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| simplify(parse(cell).unwrap()))
                        .collect()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_determinant_2x2() {
        let g = grid(&[&["1", "2"], &["3", "4"]]);
        assert_eq!(determinant(&g).unwrap(), Expr::integer(-2));
    }

    #[test]
    fn test_determinant_3x3() {
        let g = grid(&[&["2", "0", "1"], &["1", "1", "0"], &["0", "3", "1"]]);
        // 2(1*1 - 0*3) - 1(0*1 - 1*3) = 2 + 3
        assert_eq!(determinant(&g).unwrap(), Expr::integer(5));
    }

    #[test]
    fn test_determinant_symbolic() {
        let g = grid(&[&["a", "b"], &["c", "d"]]);
        let det = determinant(&g).unwrap();
        assert_eq!(det, simplify(parse("ad - bc").unwrap()));
    }

    #[test]
    fn test_determinant_rejects_non_square() {
        let g = grid(&[&["1", "2", "3"], &["4", "5", "6"]]);
        assert_eq!(determinant(&g), Err(EngineError::NotSquare));
    }

    #[test]
    fn test_echelon_fraction_free() {
        let g = grid(&[&["1", "2"], &["3", "4"]]);
        let e = echelon(&g, false);
        assert_eq!(e, grid(&[&["1", "2"], &["0", "-2"]]));
    }

    #[test]
    fn test_rref() {
        let g = grid(&[&["1", "2"], &["3", "4"]]);
        let e = echelon(&g, true);
        assert_eq!(e, identity(2));
    }

    #[test]
    fn test_rref_with_free_column() {
        let g = grid(&[&["1", "2", "3"], &["2", "4", "6"]]);
        let e = echelon(&g, true);
        assert_eq!(e, grid(&[&["1", "2", "3"], &["0", "0", "0"]]));
    }

    #[test]
    fn test_rank() {
        assert_eq!(rank(&grid(&[&["1", "2"], &["3", "4"]])), 2);
        assert_eq!(rank(&grid(&[&["1", "2"], &["2", "4"]])), 1);
        assert_eq!(rank(&grid(&[&["0", "0"], &["0", "0"]])), 0);
    }

    #[test]
    fn test_inverse_2x2() {
        let g = grid(&[&["1", "2"], &["3", "4"]]);
        let inv = inverse(&g).unwrap();
        assert_eq!(
            inv,
            grid(&[&["-2", "1"], &[r"\frac{3}{2}", r"-\frac{1}{2}"]])
        );
    }

    #[test]
    fn test_inverse_singular() {
        let g = grid(&[&["1", "2"], &["2", "4"]]);
        assert_eq!(inverse(&g), Err(EngineError::Singular));
    }

    #[test]
    fn test_row_swap_is_self_inverse() {
        let original = grid(&[&["1", "2"], &["3", "4"]]);
        let mut g = original.clone();
        let op = GridOp::Swap { a: 0, b: 1 };
        apply_row_op(&mut g, &op).unwrap();
        assert_eq!(g, grid(&[&["3", "4"], &["1", "2"]]));
        apply_row_op(&mut g, &op).unwrap();
        assert_eq!(g, original);
    }

    #[test]
    fn test_row_add_multiple() {
        // row1 += 3 * row2 over [[1,2],[0,1]]
        let mut g = grid(&[&["1", "2"], &["0", "1"]]);
        apply_row_op(
            &mut g,
            &GridOp::AddMultiple {
                dest: 0,
                source: 1,
                factor: Expr::integer(3),
            },
        )
        .unwrap();
        assert_eq!(g, grid(&[&["1", "5"], &["0", "1"]]));
    }

    #[test]
    fn test_col_scale() {
        let mut g = grid(&[&["1", "2"], &["3", "4"]]);
        apply_col_op(
            &mut g,
            &GridOp::Scale {
                index: 1,
                factor: Expr::integer(2),
            },
        )
        .unwrap();
        assert_eq!(g, grid(&[&["1", "4"], &["3", "8"]]));
    }

    #[test]
    fn test_row_op_out_of_range() {
        let mut g = grid(&[&["1"], &["2"]]);
        let err = apply_row_op(&mut g, &GridOp::Swap { a: 0, b: 7 }).unwrap_err();
        assert_eq!(err, EngineError::IndexOutOfRange(7));
    }

    #[test]
    fn test_symbolic_elimination() {
        // rref of [[x, x], [x, x]] has rank 1 whatever x stands for.
        let g = grid(&[&["x", "x"], &["x", "x"]]);
        assert_eq!(rank(&g), 1);
        let e = echelon(&g, true);
        assert_eq!(e, grid(&[&["1", "1"], &["0", "0"]]));
    }
}
