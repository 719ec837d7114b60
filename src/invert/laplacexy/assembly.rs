//! Two-phase assembly of the X-Y system.
//!
//! [`pattern`] fixes the nonzero structure once per index map; [`fill`]
//! rewrites the values in place for each new set of coefficients. The
//! right-hand side and initial guess are gathered from fields per solve.

use crate::config::DirichletBoundaries;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::mesh::Field2D;

use super::index::IndexMapper;
use super::stencil::{Discretizer, is_dirichlet, neighbours};

/// Symbolic phase: one row per local row, columns numbered as in
/// [`IndexMapper::column`] (owned first, then ghosts).
pub fn pattern(
    map: &IndexMapper,
    include_y: bool,
    dirichlet: DirichletBoundaries,
) -> Result<CsrMatrix<f64>, KError> {
    let mut rows = Vec::with_capacity(map.n_local());
    for (k, row) in map.rows().iter().enumerate() {
        let mut cols = vec![k];
        for (x, y) in neighbours(row, include_y, dirichlet) {
            let col = map.column(x, y).ok_or_else(|| {
                KError::config(format!(
                    "cell ({x}, {y}) next to row at ({}, {}) has no index",
                    row.x, row.y
                ))
            })?;
            cols.push(col);
        }
        rows.push(cols);
    }
    let matrix = CsrMatrix::from_pattern(map.n_local() + map.n_ghost(), rows);
    log::debug!(
        "laplacexy pattern: {} rows, {} columns, {} nonzeros",
        matrix.nrows(),
        matrix.ncols(),
        matrix.nnz()
    );
    Ok(matrix)
}

/// Numeric phase: zero `matrix` and add every row's stencil.
pub fn fill(matrix: &mut CsrMatrix<f64>, map: &IndexMapper, disc: &Discretizer<'_>) -> Result<(), KError> {
    matrix.zero_values();
    for (k, row) in map.rows().iter().enumerate() {
        let s = disc.row(row);
        matrix.add_value(k, k, s.centre)?;
        for ((x, y), c) in s.neighbours {
            let col = map
                .column(x, y)
                .ok_or_else(|| KError::config(format!("cell ({x}, {y}) has no index")))?;
            matrix.add_value(k, col, c)?;
        }
    }
    if matrix.values().iter().any(|v| !v.is_finite()) {
        return Err(KError::config("coefficients produce non-finite matrix entries"));
    }
    Ok(())
}

fn value_or_zero(f: Option<&Field2D>, x: usize, y: usize) -> f64 {
    f.and_then(|f| f.get(x, y)).unwrap_or(0.0)
}

/// Right-hand side vector: `rhs` on interior rows, the `x0` value on
/// Dirichlet rows (zero without `x0`), zero on Neumann rows.
pub fn rhs_vector(
    map: &IndexMapper,
    rhs: &Field2D,
    x0: Option<&Field2D>,
    dirichlet: DirichletBoundaries,
) -> Vec<f64> {
    map.rows()
        .iter()
        .map(|row| {
            if !row.kind.is_boundary() {
                value_or_zero(Some(rhs), row.x, row.y)
            } else if is_dirichlet(row, dirichlet) {
                value_or_zero(x0, row.x, row.y)
            } else {
                0.0
            }
        })
        .collect()
}

/// Starting vector: `x0` at every owned row, or zeros.
pub fn initial_guess(map: &IndexMapper, x0: Option<&Field2D>) -> Vec<f64> {
    map.rows().iter().map(|row| value_or_zero(x0, row.x, row.y)).collect()
}
