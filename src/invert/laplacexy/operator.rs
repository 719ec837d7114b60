//! The assembled matrix as a distributed operator.

use crate::core::traits::MatVec;
use crate::error::KError;
use crate::matrix::{CsrMatrix, SparseMatrix};
use crate::mesh::{Field2D, Mesh};
use crate::preconditioner::Preconditioner;

use super::index::IndexMapper;

/// y = A x over the plane: owned entries of `x` are scattered onto a field,
/// guard cells are exchanged, and the ghost columns are read back before a
/// local sparse product. Collective over the mesh's plane communicator.
pub struct XyOperator<'a, G: Mesh> {
    mesh: &'a G,
    map: &'a IndexMapper,
    matrix: &'a CsrMatrix<f64>,
}

impl<'a, G: Mesh> XyOperator<'a, G> {
    pub fn new(mesh: &'a G, map: &'a IndexMapper, matrix: &'a CsrMatrix<f64>) -> Self {
        Self { mesh, map, matrix }
    }

    /// `x` extended with the current values of the ghost columns.
    fn with_ghosts(&self, x: &[f64]) -> Vec<f64> {
        let mut field = Field2D::zeros(self.mesh.local_nx(), self.mesh.local_ny());
        for (row, &v) in self.map.rows().iter().zip(x) {
            field[(row.x, row.y)] = v;
        }
        self.mesh.communicate(&mut field);
        let mut ext = Vec::with_capacity(self.matrix.ncols());
        ext.extend_from_slice(x);
        ext.extend(self.map.ghost_cells().iter().map(|&cell| field[cell]));
        ext
    }
}

impl<G: Mesh> MatVec<Vec<f64>> for XyOperator<'_, G> {
    fn matvec(&self, x: &Vec<f64>, y: &mut Vec<f64>) {
        let ext = self.with_ghosts(x);
        y.resize(self.matrix.nrows(), 0.0);
        self.matrix.spmv(&ext, y);
    }
}

/// Preconditioner applied by the Krylov driver: the configured
/// preconditioner of the process-local diagonal block, so block Jacobi
/// across processes. Purely local; holds only factorization data.
pub struct PcCallback {
    inner: Box<dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> + Send + Sync>,
}

impl PcCallback {
    pub fn new(inner: Box<dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> + Send + Sync>) -> Self {
        Self { inner }
    }
}

impl<G: Mesh> Preconditioner<XyOperator<'_, G>, Vec<f64>> for PcCallback {
    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), KError> {
        self.inner.apply(r, z)
    }
}
