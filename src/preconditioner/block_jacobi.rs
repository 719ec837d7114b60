// Block-Jacobi preconditioner implementation

use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Preconditioner;
use crate::solver::direct_lu::LuSolver;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Block-Jacobi preconditioner with exact (dense LU) block solves.
///
/// Rows not covered by any block are passed through unchanged. With no
/// blocks the whole matrix is one block, i.e. an exact LU solve.
#[derive(Default)]
pub struct BlockJacobi {
    pub blocks: Vec<Vec<usize>>,
    block_factors: Vec<(Vec<usize>, LuSolver)>, // (indices, LU solver)
    n: usize,
}

impl BlockJacobi {
    pub fn new(blocks: Vec<Vec<usize>>) -> Self {
        Self { blocks, block_factors: Vec::new(), n: 0 }
    }

    /// One block spanning the whole matrix.
    pub fn whole() -> Self {
        Self::default()
    }

    pub fn num_blocks(&self) -> usize {
        self.block_factors.len()
    }
}

impl Preconditioner<CsrMatrix<f64>, Vec<f64>> for BlockJacobi {
    /// Setup: factor each block using LuSolver
    fn setup(&mut self, a: &CsrMatrix<f64>) -> Result<(), KError> {
        let n = a.nrows();
        let blocks = if self.blocks.is_empty() {
            vec![(0..n).collect::<Vec<_>>()]
        } else {
            self.blocks.clone()
        };
        let mut covered = vec![false; n];
        for (b, block) in blocks.iter().enumerate() {
            for &i in block {
                if i >= n || covered[i] {
                    return Err(KError::config(format!(
                        "block {b} has row {i} out of range or shared with another block"
                    )));
                }
                covered[i] = true;
            }
        }
        let factor = |indices: &Vec<usize>| -> Result<(Vec<usize>, LuSolver), KError> {
            let mut lu = LuSolver::new();
            lu.factor(&a.submatrix(indices).to_dense())?;
            Ok((indices.clone(), lu))
        };
        #[cfg(feature = "rayon")]
        let factors: Result<Vec<_>, KError> = blocks.par_iter().map(factor).collect();
        #[cfg(not(feature = "rayon"))]
        let factors: Result<Vec<_>, KError> = blocks.iter().map(factor).collect();
        self.block_factors = factors?;
        self.n = n;
        Ok(())
    }

    /// Apply: z = M⁻¹ r
    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), KError> {
        if r.len() != self.n {
            return Err(KError::SolveError(format!(
                "block jacobi set up for {} rows, applied to {}",
                self.n,
                r.len()
            )));
        }
        z.clear();
        z.extend_from_slice(r);
        let solve = |(indices, lusolver): &(Vec<usize>, LuSolver)| -> Result<Vec<f64>, KError> {
            let r_block: Vec<f64> = indices.iter().map(|&i| r[i]).collect();
            let mut x_block = vec![0.0; indices.len()];
            lusolver.solve_cached(&r_block, &mut x_block)?;
            Ok(x_block)
        };
        #[cfg(feature = "rayon")]
        let solved: Result<Vec<_>, KError> = self.block_factors.par_iter().map(solve).collect();
        #[cfg(not(feature = "rayon"))]
        let solved: Result<Vec<_>, KError> = self.block_factors.iter().map(solve).collect();
        for ((indices, _), x_block) in self.block_factors.iter().zip(solved?) {
            for (&i, xi) in indices.iter().zip(x_block) {
                z[i] = xi;
            }
        }
        Ok(())
    }
}
