//! Preconditioners for linear solvers.
//!
//! This module defines the Preconditioner trait and the implementations
//! selectable for the X-Y operator: Jacobi, SOR/SSOR, ILU(0) and block
//! Jacobi with exact (LU) block solves. All of them act on the process-local
//! diagonal block of the assembled matrix.

use crate::error::KError;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<M, V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError>;
    /// Optionally: setup/factorize from A
    fn setup(&mut self, _a: &M) -> Result<(), KError> {
        Ok(())
    }
}

// Submodules for various preconditioners
pub mod block_jacobi;
pub mod ilu;
pub mod jacobi;
pub mod sor;

// Re-exports for convenience
pub use self::sor::MatSorType;
pub use block_jacobi::BlockJacobi;
pub use ilu::Ilu0;
pub use jacobi::Jacobi;
pub use sor::Sor;

/// Strategy selector that builds one of the above for a local block.
pub use crate::context::pc_context::PC;
