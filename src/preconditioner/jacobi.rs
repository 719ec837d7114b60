// Jacobi preconditioner implementation

use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Preconditioner;
use num_traits::Float;

/// Jacobi preconditioner: M⁻¹ = D⁻¹
pub struct Jacobi<T> {
    pub(crate) inv_diag: Vec<T>,
}

impl<T: Float> Jacobi<T> {
    /// new with empty state; user must call `setup`.
    pub fn new() -> Self {
        Self { inv_diag: Vec::new() }
    }
}

impl<T: Float> Default for Jacobi<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Preconditioner<CsrMatrix<T>, Vec<T>> for Jacobi<T>
where
    T: Float + Send + Sync,
{
    fn setup(&mut self, a: &CsrMatrix<T>) -> Result<(), KError> {
        let diag = a.diagonal();
        let mut inv = Vec::with_capacity(diag.len());
        for (i, d) in diag.into_iter().enumerate() {
            if d == T::zero() || !d.is_finite() {
                return Err(KError::ZeroPivot(i));
            }
            inv.push(T::one() / d);
        }
        self.inv_diag = inv;
        Ok(())
    }

    fn apply(&self, x: &Vec<T>, y: &mut Vec<T>) -> Result<(), KError> {
        if x.len() != self.inv_diag.len() {
            return Err(KError::SolveError(format!(
                "jacobi set up for {} rows, applied to {}",
                self.inv_diag.len(),
                x.len()
            )));
        }
        y.resize(x.len(), T::zero());
        for ((yi, &xi), &d) in y.iter_mut().zip(x).zip(&self.inv_diag) {
            *yi = d * xi;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn scales_by_inverse_diagonal() {
        let a = CsrMatrix::from_csr(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![-4.0, 1.0, 0.5]).unwrap();
        let mut pc = Jacobi::new();
        pc.setup(&a).unwrap();
        let mut z = vec![0.0; 2];
        pc.apply(&vec![2.0, 2.0], &mut z).unwrap();
        assert_abs_diff_eq!(z[0], -0.5);
        assert_abs_diff_eq!(z[1], 4.0);
    }

    #[test]
    fn zero_diagonal_is_a_pivot_error() {
        let a = CsrMatrix::from_csr(2, 2, vec![0, 1, 2], vec![0, 0], vec![1.0, 1.0]).unwrap();
        let mut pc = Jacobi::<f64>::new();
        assert!(matches!(pc.setup(&a), Err(KError::ZeroPivot(1))));
    }
}
