//! laplace-xy: X-Y plane elliptic inversion with a PETSc-style PC/KSP interface over Faer
//!
//! This crate solves Div(A Grad_perp x) + B x = b on the X-Y plane of a
//! decomposed structured mesh. The operator is discretized into a sparse
//! system distributed over the plane's processes and inverted with Krylov
//! subspace solvers and block-Jacobi preconditioners, with support for
//! shared (Rayon) and distributed (MPI) memory parallelism.
//!
//! ```no_run
//! use laplace_xy::{CellLoc, Field2D, LaplaceXY, LaplaceXYSolver, MockMesh, Options};
//!
//! let mesh = MockMesh::new(5, 1);
//! let opts = Options::new()
//!     .with("include_y_derivs", false)
//!     .with("x_inner_dirichlet", true)
//!     .with("x_outer_dirichlet", true);
//! let mut solver = LaplaceXY::new(&mesh, Some(&opts), CellLoc::Centre)?;
//! solver.set_coefs(&Field2D::filled(5, 1, 1.0), &Field2D::zeros(5, 1))?;
//! let x0 = Field2D::from_fn(5, 1, |x, _| if x == 4 { 1.0 } else { 0.0 });
//! let x = solver.solve(&Field2D::zeros(5, 1), Some(&x0))?;
//! # Ok::<(), laplace_xy::KError>(())
//! ```

pub mod parallel;

pub mod config;
#[cfg(feature = "krylov")]
pub mod context;
pub mod core;
pub mod error;
pub mod invert;
pub mod matrix;
pub mod mesh;
#[cfg(feature = "krylov")]
pub mod preconditioner;
#[cfg(feature = "krylov")]
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
#[cfg(feature = "krylov")]
pub use context::*;
pub use self::core::*;
pub use error::*;
pub use invert::{LaplaceXY, LaplaceXYSolver, UnavailableLaplaceXY};
pub use matrix::*;
pub use mesh::*;
pub use parallel::{Comm, SerialComm, ThreadComm};
#[cfg(feature = "krylov")]
pub use preconditioner::*;
#[cfg(feature = "krylov")]
pub use solver::*;
pub use utils::*;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
