//! ILU(0) factorization with zero fill (Saad §10.3).
//!
//! The factors share the nonzero pattern of the matrix: `L` (unit diagonal,
//! implicit) and `U` are stored together in one CSR value array, IKJ order.

use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Preconditioner;
use num_traits::Float;

pub struct Ilu0<T> {
    lu: Option<CsrMatrix<T>>,
    /// Position of the diagonal entry in each row of `lu`.
    diag_pos: Vec<usize>,
}

impl<T: Float> Ilu0<T> {
    pub fn new() -> Self {
        Self { lu: None, diag_pos: Vec::new() }
    }
}

impl<T: Float> Default for Ilu0<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Preconditioner<CsrMatrix<T>, Vec<T>> for Ilu0<T> {
    fn setup(&mut self, a: &CsrMatrix<T>) -> Result<(), KError> {
        let n = a.nrows();
        let row_ptr = a.row_ptr().to_vec();
        let col_idx = a.col_idx().to_vec();
        let mut vals = a.values().to_vec();

        let mut diag_pos = Vec::with_capacity(n);
        for i in 0..n {
            match a.position(i, i) {
                Some(p) => diag_pos.push(p),
                None => return Err(KError::ZeroPivot(i)),
            }
        }

        // column -> position in the current row, usize::MAX when absent
        let mut marker = vec![usize::MAX; a.ncols()];
        for i in 0..n {
            let (start, end) = (row_ptr[i], row_ptr[i + 1]);
            for p in start..end {
                marker[col_idx[p]] = p;
            }
            for p in start..end {
                let k = col_idx[p];
                if k >= i {
                    break;
                }
                let pivot = vals[diag_pos[k]];
                if pivot == T::zero() {
                    return Err(KError::ZeroPivot(k));
                }
                let lik = vals[p] / pivot;
                vals[p] = lik;
                for q in (diag_pos[k] + 1)..row_ptr[k + 1] {
                    let target = marker[col_idx[q]];
                    if target != usize::MAX {
                        vals[target] = vals[target] - lik * vals[q];
                    }
                }
            }
            if vals[diag_pos[i]] == T::zero() || !vals[diag_pos[i]].is_finite() {
                return Err(KError::ZeroPivot(i));
            }
            for p in start..end {
                marker[col_idx[p]] = usize::MAX;
            }
        }

        self.lu = Some(CsrMatrix::from_csr(n, a.ncols(), row_ptr, col_idx, vals)?);
        self.diag_pos = diag_pos;
        Ok(())
    }

    fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        let Some(lu) = self.lu.as_ref() else {
            return Err(KError::SolveError("ILU(0) applied before setup".into()));
        };
        let n = lu.nrows();
        if x.len() != n {
            return Err(KError::SolveError(format!("ILU(0) set up for {n} rows, applied to {}", x.len())));
        }
        // solve L y1 = x
        let mut y1 = x.clone();
        for i in 0..n {
            let (cols, vals) = lu.row(i);
            let mut s = y1[i];
            for (&j, &v) in cols.iter().zip(vals) {
                if j >= i {
                    break;
                }
                s = s - v * y1[j];
            }
            y1[i] = s;
        }
        // solve U y = y1
        for i in (0..n).rev() {
            let (cols, vals) = lu.row(i);
            let mut s = y1[i];
            for (&j, &v) in cols.iter().zip(vals) {
                if j > i {
                    s = s - v * y1[j];
                }
            }
            y1[i] = s / lu.values()[self.diag_pos[i]];
        }
        *y = y1;
        Ok(())
    }
}
