// SparseMatrix trait and the CSR storage used for the assembled system

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use num_traits::Float;

use crate::core::traits::MatVec;
use crate::error::KError;

/// A read‐only sparse matrix supporting y = A * x.
pub trait SparseMatrix<T> {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, x: &[T], y: &mut [T]);
}

/// Compressed sparse row matrix with sorted, unique column indices per row.
///
/// The nonzero structure (`row_ptr`, `col_idx`) is fixed once built; only
/// `values` change afterwards. This is what lets the assembled operator be
/// refilled for new coefficients without touching its pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix<T> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Float> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Columns within a row must be strictly increasing and in range.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, KError> {
        if row_ptr.len() != nrows + 1 || row_ptr[0] != 0 {
            return Err(KError::config(format!(
                "row_ptr must have {} entries starting at 0",
                nrows + 1
            )));
        }
        if col_idx.len() != values.len() || row_ptr[nrows] != col_idx.len() {
            return Err(KError::config("col_idx/values length does not match row_ptr"));
        }
        for i in 0..nrows {
            if row_ptr[i + 1] < row_ptr[i] {
                return Err(KError::config(format!("row_ptr decreases at row {i}")));
            }
            let cols = &col_idx[row_ptr[i]..row_ptr[i + 1]];
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(KError::config(format!("columns of row {i} are not strictly increasing")));
            }
            if cols.last().is_some_and(|&c| c >= ncols) {
                return Err(KError::config(format!("column index out of range in row {i}")));
            }
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values })
    }

    /// Symbolic build: one column list per row, sorted and deduplicated here.
    /// All values start at zero.
    pub fn from_pattern(ncols: usize, pattern: Vec<Vec<usize>>) -> Self {
        let nrows = pattern.len();
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for mut cols in pattern {
            cols.sort_unstable();
            cols.dedup();
            col_idx.extend(cols);
            row_ptr.push(col_idx.len());
        }
        let values = vec![T::zero(); col_idx.len()];
        Self { nrows, ncols, row_ptr, col_idx, values }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let r = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[r.clone()], &self.values[r])
    }

    /// Storage position of entry (i, j), if it is part of the pattern.
    pub fn position(&self, i: usize, j: usize) -> Option<usize> {
        if i >= self.nrows {
            return None;
        }
        let start = self.row_ptr[i];
        self.col_idx[start..self.row_ptr[i + 1]]
            .binary_search(&j)
            .ok()
            .map(|k| start + k)
    }

    /// Entry (i, j); zero outside the pattern.
    pub fn get(&self, i: usize, j: usize) -> T {
        self.position(i, j).map_or(T::zero(), |p| self.values[p])
    }

    /// ADD_VALUES semantics: `A[i, j] += v`. Entries outside the pattern are
    /// rejected rather than inserted.
    pub fn add_value(&mut self, i: usize, j: usize, v: T) -> Result<(), KError> {
        match self.position(i, j) {
            Some(p) => {
                self.values[p] = self.values[p] + v;
                Ok(())
            }
            None => Err(KError::config(format!(
                "entry ({i}, {j}) is outside the preallocated sparsity pattern"
            ))),
        }
    }

    /// Reset every stored value to zero, keeping the pattern.
    pub fn zero_values(&mut self) {
        self.values.iter_mut().for_each(|v| *v = T::zero());
    }

    /// Diagonal entries of the leading square part (zero where absent).
    pub fn diagonal(&self) -> Vec<T> {
        (0..self.nrows.min(self.ncols)).map(|i| self.get(i, i)).collect()
    }

    /// Leading `n × n` block: rows `0..n`, columns `< n` only.
    ///
    /// For the distributed operator these are the rows and columns owned by
    /// this process, i.e. the block-Jacobi diagonal block.
    pub fn local_block(&self, n: usize) -> CsrMatrix<T> {
        let n = n.min(self.nrows);
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for i in 0..n {
            let (cols, vals) = self.row(i);
            for (&c, &v) in cols.iter().zip(vals) {
                if c < n {
                    col_idx.push(c);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix { nrows: n, ncols: n, row_ptr, col_idx, values }
    }

    /// Principal submatrix on `indices` (rows and columns), renumbered
    /// `0..indices.len()` in the given order.
    pub fn submatrix(&self, indices: &[usize]) -> CsrMatrix<T> {
        let mut local = std::collections::HashMap::with_capacity(indices.len());
        for (k, &g) in indices.iter().enumerate() {
            local.insert(g, k);
        }
        let pattern_and_vals: Vec<Vec<(usize, T)>> = indices
            .iter()
            .map(|&g| {
                let (cols, vals) = self.row(g);
                let mut entries: Vec<(usize, T)> = cols
                    .iter()
                    .zip(vals)
                    .filter_map(|(c, &v)| local.get(c).map(|&k| (k, v)))
                    .collect();
                entries.sort_unstable_by_key(|e| e.0);
                entries
            })
            .collect();
        let n = indices.len();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for entries in pattern_and_vals {
            for (c, v) in entries {
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix { nrows: n, ncols: n, row_ptr, col_idx, values }
    }

    /// Hash of the nonzero structure. Two matrices with equal fingerprints have
    /// (with overwhelming probability) identical row pointers and columns.
    pub fn structure_fingerprint(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.nrows.hash(&mut h);
        self.ncols.hash(&mut h);
        self.row_ptr.hash(&mut h);
        self.col_idx.hash(&mut h);
        h.finish()
    }

    pub fn same_pattern(&self, other: &CsrMatrix<T>) -> bool {
        self.nrows == other.nrows
            && self.ncols == other.ncols
            && self.row_ptr == other.row_ptr
            && self.col_idx == other.col_idx
    }

    /// Largest |a_ij - a_ji| over the leading square block, for symmetry checks.
    pub fn asymmetry(&self) -> T {
        let n = self.nrows.min(self.ncols);
        let mut worst = T::zero();
        for i in 0..n {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                if j < n {
                    worst = worst.max((v - self.get(j, i)).abs());
                }
            }
        }
        worst
    }

    fn row_dot(&self, i: usize, x: &[T]) -> T {
        let (cols, vals) = self.row(i);
        cols.iter()
            .zip(vals)
            .fold(T::zero(), |acc, (&c, &v)| acc + v * x[c])
    }
}

#[cfg(feature = "krylov")]
impl CsrMatrix<f64> {
    /// Dense copy, for direct factorizations of small blocks.
    pub fn to_dense(&self) -> faer::Mat<f64> {
        faer::Mat::from_fn(self.nrows, self.ncols, |i, j| self.get(i, j))
    }
}

#[cfg(feature = "rayon")]
use rayon::prelude::*;

impl<T: Float + Send + Sync> SparseMatrix<T> for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }
    fn ncols(&self) -> usize {
        self.ncols
    }
    fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols);
        assert_eq!(y.len(), self.nrows);
        #[cfg(feature = "rayon")]
        y.par_iter_mut()
            .enumerate()
            .for_each(|(i, yi)| *yi = self.row_dot(i, x));
        #[cfg(not(feature = "rayon"))]
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row_dot(i, x);
        }
    }
}

impl<T: Float + Send + Sync> MatVec<Vec<T>> for CsrMatrix<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        self.spmv(x, y)
    }
}
