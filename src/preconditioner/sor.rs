use std::fmt;

use bitflags::bitflags;
use num_traits::Float;

use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Preconditioner;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct MatSorType: u32 {
        const APPLY_LOWER     = 0b0001; // forward Gauss-Seidel
        const APPLY_UPPER     = 0b0010; // backward
        const SYMMETRIC_SWEEP = Self::APPLY_LOWER.bits() | Self::APPLY_UPPER.bits();
    }
}

/// Successive over-relaxation on the process-local block, starting from a
/// zero guess. The default sweep is symmetric (SSOR), which keeps the
/// preconditioner symmetric for CG.
pub struct Sor<T> {
    pub its: usize,
    pub sym: MatSorType,
    pub omega: T,
    inv_diag: Vec<T>,
    a: Option<CsrMatrix<T>>,
}

impl<T: Float> Sor<T> {
    pub fn new(omega: T, its: usize) -> Self {
        Self {
            its,
            sym: MatSorType::SYMMETRIC_SWEEP,
            omega,
            inv_diag: Vec::new(),
            a: None,
        }
    }
    pub fn with_sweep(mut self, sym: MatSorType) -> Self {
        self.sym = sym;
        self
    }
    pub fn omega(&self) -> T {
        self.omega
    }
    pub fn its(&self) -> usize {
        self.its
    }

    fn relax(&self, a: &CsrMatrix<T>, x: &[T], y: &mut [T], i: usize) {
        let (cols, vals) = a.row(i);
        let mut sigma = T::zero();
        for (&j, &v) in cols.iter().zip(vals) {
            if j != i {
                sigma = sigma + v * y[j];
            }
        }
        let gs = (x[i] - sigma) * self.inv_diag[i];
        y[i] = (T::one() - self.omega) * y[i] + self.omega * gs;
    }
}

impl<T> fmt::Display for Sor<T>
where
    T: Float + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SOR(omega={}, its={}, sym={:?})", self.omega, self.its, self.sym)
    }
}

impl<T> Preconditioner<CsrMatrix<T>, Vec<T>> for Sor<T>
where
    T: Float,
{
    fn setup(&mut self, a: &CsrMatrix<T>) -> Result<(), KError> {
        if self.omega <= T::zero() || self.omega >= T::from(2.0).unwrap_or_else(T::one) {
            return Err(KError::config("SOR relaxation factor must lie in (0, 2)"));
        }
        let mut inv = Vec::with_capacity(a.nrows());
        for (i, d) in a.diagonal().into_iter().enumerate() {
            if d == T::zero() || !d.is_finite() {
                return Err(KError::ZeroPivot(i));
            }
            inv.push(T::one() / d);
        }
        self.inv_diag = inv;
        self.a = Some(a.clone());
        Ok(())
    }

    fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        let Some(a) = self.a.as_ref() else {
            return Err(KError::SolveError("SOR applied before setup".into()));
        };
        let n = x.len();
        if n != a.nrows() {
            return Err(KError::SolveError(format!("SOR set up for {} rows, applied to {n}", a.nrows())));
        }
        y.clear();
        y.resize(n, T::zero());
        for _ in 0..self.its {
            if self.sym.contains(MatSorType::APPLY_LOWER) {
                for i in 0..n {
                    self.relax(a, x, y, i);
                }
            }
            if self.sym.contains(MatSorType::APPLY_UPPER) {
                for i in (0..n).rev() {
                    self.relax(a, x, y, i);
                }
            }
        }
        Ok(())
    }
}
