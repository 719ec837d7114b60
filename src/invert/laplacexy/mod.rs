//! X-Y (poloidal plane) inversion of Div(A Grad_perp x) + B x = b.
//!
//! The solver is split the way the work is: [`index`] numbers the rows of
//! the distributed system, [`stencil`] evaluates the finite-volume
//! coefficients, [`assembly`] builds the pattern once and refills its values,
//! and the driver runs a Krylov solve over the assembled operator with a
//! block-Jacobi preconditioner. Builds without the `krylov` feature get
//! [`UnavailableLaplaceXY`] under the same name, which fails with a
//! capability error on every call.

use std::marker::PhantomData;

use crate::config::{LaplaceXyConfig, Options};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::mesh::{CellLoc, Field2D, Mesh};

pub mod assembly;
pub mod index;
pub mod stencil;

#[cfg(feature = "krylov")]
pub mod operator;
#[cfg(feature = "krylov")]
mod solver;

#[cfg(feature = "krylov")]
pub use solver::LaplaceXY;

#[cfg(not(feature = "krylov"))]
pub type LaplaceXY<'a, G> = UnavailableLaplaceXY<'a, G>;

/// Operations shared by the real solver and the capability stub.
pub trait LaplaceXYSolver {
    /// Set the coefficients `A` and `B`. Both must be allocated fields at
    /// the solver's location. Collective.
    fn set_coefs(&mut self, a: &Field2D, b: &Field2D) -> Result<(), KError>;

    /// Solve for `rhs`, starting from `x0` when it is given and allocated.
    /// Dirichlet boundary values are taken from `x0`. Collective.
    fn solve(&self, rhs: &Field2D, x0: Option<&Field2D>) -> Result<Field2D, KError>;

    /// Cell location of every field the solver accepts and returns.
    fn location(&self) -> CellLoc;
}

fn unavailable() -> KError {
    KError::Capability("LaplaceXY requires the `krylov` feature (linear-algebra backend not compiled in)".into())
}

/// Stand-in used when the linear-algebra backend is not compiled in.
///
/// Mirrors the constructors and accessors of the real solver so callers
/// build unchanged; the constructors always fail, so no value of this type
/// exists outside the crate.
pub struct UnavailableLaplaceXY<'a, G> {
    location: CellLoc,
    config: LaplaceXyConfig,
    map: index::IndexMapper,
    matrix: CsrMatrix<f64>,
    _mesh: PhantomData<&'a G>,
}

impl<'a, G: Mesh> UnavailableLaplaceXY<'a, G> {
    /// Always fails with [`KError::Capability`].
    pub fn new(_mesh: &'a G, _options: Option<&Options>, _location: CellLoc) -> Result<Self, KError> {
        Err(unavailable())
    }

    /// Always fails with [`KError::Capability`].
    pub fn with_config(_mesh: &'a G, _config: LaplaceXyConfig, _location: CellLoc) -> Result<Self, KError> {
        Err(unavailable())
    }

    pub fn config(&self) -> &LaplaceXyConfig {
        &self.config
    }

    pub fn matrix(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    pub fn index_map(&self) -> &index::IndexMapper {
        &self.map
    }

    pub fn structure_fingerprint(&self) -> u64 {
        self.matrix.structure_fingerprint()
    }
}

impl<G> LaplaceXYSolver for UnavailableLaplaceXY<'_, G> {
    fn set_coefs(&mut self, _a: &Field2D, _b: &Field2D) -> Result<(), KError> {
        Err(unavailable())
    }

    fn solve(&self, _rhs: &Field2D, _x0: Option<&Field2D>) -> Result<Field2D, KError> {
        Err(unavailable())
    }

    fn location(&self) -> CellLoc {
        self.location
    }
}
